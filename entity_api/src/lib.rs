pub use entity::{readings, RoomId};

pub mod error;
pub mod reading;
