//! Webhook Worker
//!
//! Background task that turns published domain events into dispatches and
//! periodically prunes delivery log rows past retention.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::WebhookSettings;
use crate::services::{DeliveryLog, DomainEvent, EventDispatcher};

pub struct WebhookWorker {
    dispatcher: EventDispatcher,
    log: DeliveryLog,
    receiver: Receiver<DomainEvent>,
    retention: chrono::Duration,
    retention_interval: Duration,
}

impl WebhookWorker {
    pub fn new(
        dispatcher: EventDispatcher,
        log: DeliveryLog,
        receiver: Receiver<DomainEvent>,
        settings: &WebhookSettings,
    ) -> Self {
        Self {
            dispatcher,
            log,
            receiver,
            retention: chrono::Duration::days(i64::from(settings.log_retention_days)),
            retention_interval: settings.retention_interval,
        }
    }

    /// Run until every [`EventPublisher`](crate::services::EventPublisher)
    /// is dropped.
    pub async fn run(mut self) {
        info!(
            target: "webhook_delivery",
            retention_days = self.retention.num_days(),
            "Starting webhook worker"
        );

        let mut retention_tick = interval(self.retention_interval);
        retention_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            target: "webhook_delivery",
                            skipped,
                            "Webhook worker lagged, domain events dropped"
                        );
                    }
                    Err(RecvError::Closed) => {
                        info!(target: "webhook_delivery", "Event channel closed, worker stopping");
                        break;
                    }
                },
                _ = retention_tick.tick() => self.prune().await,
            }
        }
    }

    async fn handle_event(&self, event: DomainEvent) {
        match self.dispatcher.dispatch(&event.event, event.payload).await {
            Ok(deliveries) => {
                debug!(
                    target: "webhook_delivery",
                    event_id = %event.event_id,
                    event = %event.event,
                    deliveries = deliveries.len(),
                    "Domain event dispatched"
                );
            }
            Err(e) => {
                error!(
                    target: "webhook_delivery",
                    event_id = %event.event_id,
                    event = %event.event,
                    error = %e,
                    "Failed to dispatch domain event"
                );
            }
        }
    }

    async fn prune(&self) {
        let Some(cutoff) = retention_cutoff(Utc::now(), self.retention) else {
            warn!(
                target: "webhook_delivery",
                retention_days = self.retention.num_days(),
                "Retention window out of range, skipping prune"
            );
            return;
        };
        if let Err(e) = self.log.prune_before(cutoff).await {
            error!(target: "webhook_delivery", error = %e, "Failed to prune webhook logs");
        }
    }
}

/// Oldest timestamp kept, or `None` if the window reaches past the
/// representable range.
fn retention_cutoff(now: DateTime<Utc>, retention: chrono::Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(retention)
}
