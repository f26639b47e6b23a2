//! Live fan-out of room telemetry to connected subscribers.
//!
//! This crate turns "the readings changed" into a freshly fetched, grouped
//! and per-subscriber sliced `table:topN` payload on every live connection.
//! It is transport-agnostic: connections are represented by the sending half
//! of an unbounded channel, and the web layer owns the sockets.
//!
//! # Architecture
//!
//! - **Registry with clamped depths**: every connection is registered with a
//!   history depth of `MIN_LIMIT`, which only that connection may change.
//! - **Snapshot fan-out**: a broadcast copies `(connection, depth)` pairs out
//!   of the registry, then slices one shared fetch result per connection, so
//!   all subscribers see the same fetch instant at their own depth.
//! - **Debounced refreshes**: bursts of triggers collapse into one refresh
//!   fired after a quiet period with no new trigger.
//! - **Ephemeral messages**: if a connection is gone by the time its payload
//!   is ready, it is skipped.
//!
//! # Message Flow
//!
//! 1. A change notification or the trigger endpoint feeds the `Debouncer`
//! 2. After the quiet period, the `Dispatcher` fetches `MAX_LIMIT` readings per room
//! 3. Readings are grouped into `RoomSeries` once
//! 4. The `Manager` snapshots the registry and delivers a slice to each connection
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry and the type-safe ConnectionId
//! - `manager`: Per-connection delivery and snapshot broadcasting
//! - `message`: Outbound events and inbound client messages
//! - `debounce`: The Idle/Pending debounce state machine and its actor task
//! - `dispatcher`: The fetch → group → slice → deliver pipeline
//! - `domain_event_handler`: Bridges domain events into debouncer triggers

pub mod connection;
pub mod debounce;
pub mod dispatcher;
pub mod domain_event_handler;
pub mod manager;
pub mod message;

pub use debounce::{Debouncer, DebouncerHandle, RefreshOutcome};
pub use dispatcher::Dispatcher;
pub use manager::Manager;
