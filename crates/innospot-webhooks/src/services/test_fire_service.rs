//! Manual test-fire: one synchronous attempt chosen by an operator.
//!
//! Bypasses the dispatcher. The webhook need not be active and need not
//! subscribe to the event, but the event must be in the catalog.

use std::sync::Arc;

use uuid::Uuid;

use crate::catalog;
use crate::clock::Clock;
use crate::error::WebhookError;
use crate::models::{DeliveryTestResult, DeliveryTrigger, TestFireRequest};
use crate::services::delivery_service::{AttemptContext, DeliveryAttempter};
use crate::store::WebhookStore;

#[derive(Clone)]
pub struct TestFireService {
    store: Arc<dyn WebhookStore>,
    attempter: DeliveryAttempter,
    clock: Arc<dyn Clock>,
}

impl TestFireService {
    pub fn new(
        store: Arc<dyn WebhookStore>,
        attempter: DeliveryAttempter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            attempter,
            clock,
        }
    }

    /// Send exactly one attempt (attempt 1, no retries) and report it.
    ///
    /// Without a custom payload the event's catalog example is sent.
    pub async fn test_fire(
        &self,
        request: TestFireRequest,
    ) -> Result<DeliveryTestResult, WebhookError> {
        let webhook = self
            .store
            .get(request.webhook_id)
            .await?
            .ok_or(WebhookError::WebhookNotFound)?;

        let event = catalog::find(&request.event)
            .ok_or_else(|| WebhookError::UnknownEvent(request.event.clone()))?;

        let payload = request.payload.unwrap_or(event.example);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| WebhookError::Internal(format!("Failed to serialize payload: {e}")))?;

        tracing::info!(
            target: "webhook_delivery",
            webhook_id = %webhook.id,
            event = %event.name,
            "Test-firing webhook"
        );

        let attempt = self
            .attempter
            .attempt(AttemptContext {
                webhook: &webhook,
                delivery_id: Uuid::new_v4(),
                event: &event.name,
                payload: &payload,
                body: &body,
                attempt: 1,
                final_attempt: true,
                trigger: DeliveryTrigger::TestFire,
                sent_at: request.timestamp.unwrap_or_else(|| self.clock.now()),
            })
            .await?;

        Ok(DeliveryTestResult::from(&attempt))
    }
}
