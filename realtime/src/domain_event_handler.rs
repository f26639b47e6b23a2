use crate::debounce::DebouncerHandle;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;

/// Turns domain events into debouncer triggers.
///
/// Every `ReadingsChanged`, whatever its source, is one trigger; the
/// debouncer decides when the resulting refresh actually runs.
pub struct RefreshTriggerHandler {
    debouncer: DebouncerHandle,
}

impl RefreshTriggerHandler {
    pub fn new(debouncer: DebouncerHandle) -> Self {
        Self { debouncer }
    }
}

#[async_trait]
impl EventHandler for RefreshTriggerHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ReadingsChanged { source } => {
                trace!("Readings changed ({source}), triggering refresh");
                self.debouncer.notify();
            }
        }
    }
}
