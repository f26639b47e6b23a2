//! Query and insert operations for the readings table.

use super::error::{EntityApiErrorKind, Error};
use entity::readings::{ActiveModel, Model, Reading};
use entity::RoomId;
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, DatabaseBackend, DatabaseConnection, FromQueryResult,
    Statement, TryIntoModel, Value,
};

// Row-partitioned top-N, newest-first within each room. The function itself is
// created by the migration crate.
const LATEST_PER_ROOM_SQL: &str = r#"
    SELECT room_id, room_type, temperature_c, humidity_pct, differential_pressure_pa
    FROM telemetry.get_latest_readings_per_room($1)
"#;

/// Input for inserting a reading
#[derive(Debug, Clone)]
pub struct ReadingInput {
    pub room_id: RoomId,
    pub room_type: String,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub differential_pressure_pa: Option<f64>,
}

/// Fetches the most recent `limit` readings for every room.
///
/// The limit is passed through untouched; callers are responsible for choosing
/// a sensible depth. A zero limit is rejected as an invalid query term.
pub async fn find_latest_per_room(
    db: &DatabaseConnection,
    limit: u32,
) -> Result<Vec<Reading>, Error> {
    let limit = match i32::try_from(limit) {
        Ok(limit) if limit > 0 => limit,
        _ => {
            return Err(Error {
                source: None,
                error_kind: EntityApiErrorKind::InvalidQueryTerm,
            })
        }
    };

    debug!("Fetching latest {limit} readings per room");

    let readings = Reading::find_by_statement(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        LATEST_PER_ROOM_SQL,
        [Value::from(limit)],
    ))
    .all(db)
    .await?;

    trace!("Fetched {} readings", readings.len());

    Ok(readings)
}

/// Inserts a new reading stamped with the current time
pub async fn create(db: &DatabaseConnection, input: ReadingInput) -> Result<Model, Error> {
    debug!("Creating reading for room {}", input.room_id);

    let active_model = ActiveModel {
        room_id: Set(input.room_id),
        room_type: Set(input.room_type),
        temperature_c: Set(input.temperature_c),
        humidity_pct: Set(input.humidity_pct),
        differential_pressure_pa: Set(input.differential_pressure_pa),
        recorded_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };

    Ok(active_model.save(db).await?.try_into_model()?)
}
