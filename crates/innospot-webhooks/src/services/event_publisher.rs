//! Fire-and-forget publishing of domain events over a tokio broadcast channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One occurrence of a catalog event, raised by domain code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    #[must_use]
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event: event.into(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Publisher that sends domain events to a broadcast channel.
#[derive(Clone)]
pub struct EventPublisher {
    sender: tokio::sync::broadcast::Sender<DomainEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the given channel capacity.
    pub fn new(capacity: usize) -> (Self, tokio::sync::broadcast::Receiver<DomainEvent>) {
        let (sender, receiver) = tokio::sync::broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Publish an event. Errors are logged, never returned.
    pub fn publish(&self, event: DomainEvent) {
        let event_name = event.event.clone();
        if let Err(e) = self.sender.send(event) {
            tracing::warn!(
                target: "webhook_delivery",
                event = %event_name,
                error = %e,
                "No webhook worker listening for domain events"
            );
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}
