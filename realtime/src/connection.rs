use crate::message::Event;
use dashmap::DashMap;
use domain::limit::{clamp_limit, MIN_LIMIT};
use log::*;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-connection state: the requested depth and the outbound channel
#[derive(Debug, Clone)]
struct ConnectionState {
    limit: u32,
    sender: UnboundedSender<Event>,
}

/// Result of a single per-connection delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The connection was not registered, or its receiving half has closed.
    Gone,
}

/// Concurrency-safe map of live connections to their requested depths.
///
/// Every operation touches a single entry, so there is no cross-entry locking.
/// Entries are only created, changed or removed on behalf of the connection
/// they belong to.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection at `MIN_LIMIT`. Registering an id that is already
    /// present leaves its depth and channel untouched and returns `false`.
    pub fn register(&self, connection_id: ConnectionId, sender: UnboundedSender<Event>) -> bool {
        let mut inserted = false;
        self.connections.entry(connection_id).or_insert_with(|| {
            inserted = true;
            ConnectionState {
                limit: MIN_LIMIT,
                sender,
            }
        });
        inserted
    }

    /// Clamp `requested` and store it for the connection. Returns the stored
    /// depth, or `None` without inserting anything if the id is unknown.
    pub fn set_limit(&self, connection_id: &ConnectionId, requested: i64) -> Option<u32> {
        let mut state = self.connections.get_mut(connection_id)?;
        state.limit = clamp_limit(requested);
        Some(state.limit)
    }

    pub fn limit(&self, connection_id: &ConnectionId) -> Option<u32> {
        self.connections.get(connection_id).map(|state| state.limit)
    }

    /// Unregister a connection; returns whether it was present
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        self.connections.remove(connection_id).is_some()
    }

    /// Point-in-time copy of every `(connection, depth)` pair.
    ///
    /// Shard locks are held only while copying, so callers can iterate the
    /// result for as long as they like without blocking connection lifecycle
    /// changes, and never observe changes made after the copy.
    pub fn snapshot(&self) -> Vec<(ConnectionId, u32)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().limit))
            .collect()
    }

    /// Deliver an event to one connection.
    pub fn deliver(&self, connection_id: &ConnectionId, event: Event) -> Delivery {
        // Clone the sender out so no shard lock is held across the send.
        let sender = match self.connections.get(connection_id) {
            Some(state) => state.sender.clone(),
            None => {
                debug!("Connection {connection_id} is no longer registered, skipping delivery");
                return Delivery::Gone;
            }
        };

        match sender.send(event) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                warn!(
                    "Failed to send event to connection {}: {}. Connection will be cleaned up.",
                    connection_id, e
                );
                Delivery::Gone
            }
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
