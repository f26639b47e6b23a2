//! Event system infrastructure for the telemetry relay.
//!
//! This crate decouples the producers of "the readings changed" signals (the
//! Postgres change listener, administrative hooks) from the consumers that act
//! on them (the realtime dispatcher's debouncer).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between the data layer and the realtime layer.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Where a refresh trigger originated. Carried for logging only; consumers
/// treat every source identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The store announced a change on its notification channel.
    ChangeNotification,
    /// An operator or external system called the trigger endpoint.
    Webhook,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TriggerSource::ChangeNotification => write!(f, "change_notification"),
            TriggerSource::Webhook => write!(f, "webhook"),
        }
    }
}

/// Domain events that represent business-level changes in the system.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// The readings table changed. The notification payload is not inspected;
    /// subscribers refetch to learn what changed.
    ReadingsChanged { source: TriggerSource },
}

/// Trait for handling domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: DomainEvent) {
        log::trace!(
            "Publishing {:?} to {} handler(s)",
            event,
            self.handlers.len()
        );
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, DomainEvent)>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &DomainEvent) {
            self.seen.lock().unwrap().push((self.name, event.clone()));
        }
    }

    #[tokio::test]
    async fn publish_calls_handlers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new()
            .with_handler(Arc::new(Recorder {
                name: "first",
                seen: seen.clone(),
            }))
            .with_handler(Arc::new(Recorder {
                name: "second",
                seen: seen.clone(),
            }));

        let event = DomainEvent::ReadingsChanged {
            source: TriggerSource::ChangeNotification,
        };
        publisher.publish(event.clone()).await;

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![("first", event.clone()), ("second", event)]);
    }

    #[tokio::test]
    async fn publish_without_handlers_is_a_no_op() {
        EventPublisher::default()
            .publish(DomainEvent::ReadingsChanged {
                source: TriggerSource::Webhook,
            })
            .await;
    }

    #[test]
    fn trigger_source_display_is_snake_case() {
        assert_eq!(
            TriggerSource::ChangeNotification.to_string(),
            "change_notification"
        );
        assert_eq!(TriggerSource::Webhook.to_string(), "webhook");
    }
}
