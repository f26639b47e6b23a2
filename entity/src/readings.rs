//! SeaORM Entity for the readings table.
//! One row per sensor observation, appended by the ingest side of the system.

use crate::RoomId;
use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// Postgres NOTIFY channel the readings trigger announces changes on.
pub const CHANGE_CHANNEL: &str = "readings_changed";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "telemetry", table_name = "readings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: i64,

    pub room_id: RoomId,

    /// Free-form classification of the room (e.g. "cleanroom", "office")
    pub room_type: String,

    pub temperature_c: Option<f64>,

    pub humidity_pct: Option<f64>,

    /// Differential pressure against the reference space, in pascals
    pub differential_pressure_pa: Option<f64>,

    #[serde(skip_deserializing)]
    pub recorded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A single observation as returned by `get_latest_readings_per_room`.
///
/// Rows arrive grouped by room and newest-first within each room. The
/// timestamp is not projected; recency is carried by row order alone.
#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize)]
pub struct Reading {
    pub room_id: RoomId,
    pub room_type: String,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub differential_pressure_pa: Option<f64>,
}
