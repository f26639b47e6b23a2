use crate::connection::{ConnectionId, Delivery};
use crate::debounce::{RefreshAction, RefreshOutcome};
use crate::manager::{BroadcastReport, Manager};
use crate::message::Event;
use async_trait::async_trait;
use domain::error::Error;
use domain::limit::MAX_LIMIT;
use domain::reading::ReadingSource;
use domain::room_series::{group, RoomSeries};
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Runs the fetch → group → slice → deliver pipeline.
///
/// Every fetch asks the source for `MAX_LIMIT` readings per room and groups
/// them once; each connection then receives its own slice of that result.
pub struct Dispatcher {
    source: Arc<dyn ReadingSource>,
    manager: Arc<Manager>,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn ReadingSource>, manager: Arc<Manager>) -> Self {
        Self { source, manager }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    async fn fetch_grouped(&self) -> Result<Vec<RoomSeries>, Error> {
        let readings = self.source.fetch_latest(MAX_LIMIT).await?;
        let grouped = group(&readings);
        trace!(
            "Fetched {} reading(s) across {} room(s)",
            readings.len(),
            grouped.len()
        );
        Ok(grouped)
    }

    /// Fetch once and deliver to every live connection.
    ///
    /// On a failed fetch no connection receives anything and the error is
    /// returned after being logged.
    pub async fn refresh_all(&self) -> Result<BroadcastReport, Error> {
        // Snapshot after the fetch so connections that registered meanwhile
        // are included.
        let grouped = self.fetch_grouped().await.map_err(|e| {
            error!("Failed to fetch readings for broadcast: {e}");
            e
        })?;
        Ok(self.manager.broadcast(&grouped))
    }

    /// Register a connection at the default depth.
    pub fn connect(&self, sender: UnboundedSender<Event>) -> ConnectionId {
        self.manager.register_connection(sender)
    }

    /// Fetch and deliver to a single connection at its stored depth.
    ///
    /// The depth is read after the fetch completes, so a limit change that
    /// raced the fetch is honoured.
    pub async fn send_current(&self, connection_id: &ConnectionId) -> Result<Delivery, Error> {
        let grouped = self.fetch_grouped().await.map_err(|e| {
            warn!("Failed to fetch readings for connection {connection_id}: {e}");
            e
        })?;

        match self.manager.limit(connection_id) {
            Some(limit) => Ok(self
                .manager
                .send_to_connection(connection_id, &grouped, limit)),
            None => {
                debug!("Connection {connection_id} closed before its payload was ready");
                Ok(Delivery::Gone)
            }
        }
    }

    /// Clamp and store a connection's requested depth, then send it a fresh
    /// payload at that depth.
    ///
    /// The stored depth survives a failed fetch.
    pub async fn update_limit(
        &self,
        connection_id: &ConnectionId,
        requested: i64,
    ) -> Result<Delivery, Error> {
        if self.manager.set_limit(connection_id, requested).is_none() {
            return Ok(Delivery::Gone);
        }
        self.send_current(connection_id).await
    }

    pub fn disconnect(&self, connection_id: &ConnectionId) {
        self.manager.unregister_connection(connection_id);
    }
}

#[async_trait]
impl RefreshAction for Dispatcher {
    async fn refresh(&self) -> RefreshOutcome {
        match self.refresh_all().await {
            Ok(report) => RefreshOutcome::Broadcast(report),
            Err(e) => RefreshOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}
