//! The readings boundary consumed by the realtime layer.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::limit::MAX_LIMIT;
use crate::Reading;
use async_trait::async_trait;
use entity_api::reading as ReadingApi;
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// A source of the most recent readings per room.
///
/// Implementations return rows grouped by room and newest-first within each
/// room, at most `max_depth` per room. They do not retry; a failure is returned
/// to the caller as a data source error.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch_latest(&self, max_depth: u32) -> Result<Vec<Reading>, Error>;
}

/// `ReadingSource` backed by the `get_latest_readings_per_room` SQL function.
pub struct DatabaseReadingSource {
    db: Arc<DatabaseConnection>,
}

impl DatabaseReadingSource {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self { db: Arc::clone(db) }
    }
}

#[async_trait]
impl ReadingSource for DatabaseReadingSource {
    async fn fetch_latest(&self, max_depth: u32) -> Result<Vec<Reading>, Error> {
        if max_depth > MAX_LIMIT {
            warn!("Refusing to fetch {max_depth} readings per room (max {MAX_LIMIT})");
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::Invalid,
                )),
            });
        }

        Ok(ReadingApi::find_latest_per_room(self.db.as_ref(), max_depth).await?)
    }
}
