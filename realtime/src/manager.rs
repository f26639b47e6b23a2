use crate::connection::{ConnectionId, ConnectionRegistry, Delivery};
use crate::message::Event;
use domain::room_series::{slice, RoomSeries};
use log::*;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Counts from one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
}

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Register a new connection at the default depth and return its unique ID
    pub fn register_connection(&self, sender: UnboundedSender<Event>) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.registry.register(connection_id.clone(), sender);
        info!("Registered connection {connection_id}");
        connection_id
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        if self.registry.unregister(connection_id) {
            info!("Unregistered connection {connection_id}");
        }
    }

    /// Clamp and store a connection's requested depth
    pub fn set_limit(&self, connection_id: &ConnectionId, requested: i64) -> Option<u32> {
        let limit = self.registry.set_limit(connection_id, requested);
        match limit {
            Some(limit) => debug!("Connection {connection_id} requested {requested}, stored {limit}"),
            None => debug!("Ignoring limit change for unknown connection {connection_id}"),
        }
        limit
    }

    pub fn limit(&self, connection_id: &ConnectionId) -> Option<u32> {
        self.registry.limit(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Slice `grouped` to `limit` and deliver it, with that limit, to one connection
    pub fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        grouped: &[RoomSeries],
        limit: u32,
    ) -> Delivery {
        let rows = slice(grouped, limit as usize);
        trace!(
            "Delivering {} room(s) at depth {limit} to connection {connection_id}",
            rows.len()
        );
        self.registry
            .deliver(connection_id, Event::TableTopN { rows, limit })
    }

    /// Deliver `grouped` to every connection in a fresh registry snapshot
    pub fn broadcast(&self, grouped: &[RoomSeries]) -> BroadcastReport {
        let snapshot = self.registry.snapshot();
        self.broadcast_snapshot(grouped, &snapshot)
    }

    /// Deliver `grouped` to each `(connection, depth)` in `snapshot`.
    ///
    /// Each connection gets its own slice of the same grouped data. Connections
    /// that disappeared after the snapshot are counted as skipped and never
    /// stop delivery to the rest.
    pub fn broadcast_snapshot(
        &self,
        grouped: &[RoomSeries],
        snapshot: &[(ConnectionId, u32)],
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (connection_id, limit) in snapshot {
            match self.send_to_connection(connection_id, grouped, *limit) {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Gone => report.skipped += 1,
            }
        }

        debug!(
            "Broadcast {} room(s) to {} connection(s), skipped {}",
            grouped.len(),
            report.delivered,
            report.skipped
        );
        report
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
