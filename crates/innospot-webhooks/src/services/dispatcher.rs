//! Event dispatcher: fans one event occurrence out to subscribed webhooks.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::WebhookError;
use crate::models::DispatchResult;
use crate::services::retry_service::{DeliveryJob, RetryScheduler};
use crate::store::WebhookStore;

#[derive(Clone)]
pub struct EventDispatcher {
    store: Arc<dyn WebhookStore>,
    scheduler: RetryScheduler,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn WebhookStore>, scheduler: RetryScheduler) -> Self {
        Self { store, scheduler }
    }

    /// Start one independent delivery per active webhook subscribed to
    /// `event`. Returns as soon as the deliveries are spawned; the handles
    /// resolve to each delivery's final outcome. Results are sorted by
    /// webhook id.
    ///
    /// Only a failed webhook lookup is an error. Delivery failures stay
    /// inside the spawned tasks.
    pub async fn dispatch(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<DispatchResult>, WebhookError> {
        let webhooks = self.store.list_active_for_event(event).await?;

        if webhooks.is_empty() {
            tracing::debug!(
                target: "webhook_delivery",
                event,
                "No active webhooks subscribed to event"
            );
            return Ok(Vec::new());
        }

        tracing::info!(
            target: "webhook_delivery",
            event,
            webhook_count = webhooks.len(),
            "Dispatching event to subscribed webhooks"
        );

        let mut results: Vec<DispatchResult> = webhooks
            .into_iter()
            .map(|webhook| {
                let delivery_id = Uuid::new_v4();
                let handle = self.scheduler.spawn(DeliveryJob {
                    webhook_id: webhook.id,
                    delivery_id,
                    event: event.to_string(),
                    payload: payload.clone(),
                });
                DispatchResult {
                    webhook_id: webhook.id,
                    delivery_id,
                    handle,
                }
            })
            .collect();
        results.sort_by_key(|r| r.webhook_id);

        Ok(results)
    }
}
