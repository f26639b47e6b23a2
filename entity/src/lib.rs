pub mod readings;

/// A type alias for the identifier of a monitored room. Rooms are the partition
/// key for every per-room query and grouping in the system.
pub type RoomId = i64;
