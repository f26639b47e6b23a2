//! Domain layer of the telemetry relay.
//!
//! Re-exports the reading types from `entity_api` so that consumers of the
//! `domain` crate do not need to depend on the entity crates directly, and
//! holds the pure transformations (grouping, slicing, limit clamping) that the
//! realtime layer fans out to subscribers.
pub use entity_api::{readings, readings::Reading, RoomId};

pub mod change_feed;
pub mod error;
pub mod limit;
pub mod reading;
pub mod room_series;
