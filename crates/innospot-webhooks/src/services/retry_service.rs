//! Retry scheduler: drives one logical delivery to a terminal state.
//!
//! ```text
//! pending(1) -> attempting -> succeeded
//!                          -> retry_scheduled(n+1) -> (backoff) -> attempting
//!                          -> exhausted            (attempt > max_retries)
//! ```
//!
//! The webhook is re-read from the store immediately before every attempt,
//! so deactivating or deleting it stops any retry that has not started yet.
//! The payload is serialized once and the same bytes are signed and sent
//! on every attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{DeliveryOutcome, DeliveryState, DeliveryTrigger, RetryPolicy};
use crate::services::delivery_service::{AttemptContext, DeliveryAttempter};
use crate::store::WebhookStore;

/// One event occurrence bound for one webhook.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Delay after failed attempt `n` (1-based), before attempt `n + 1`:
/// `min(retry_delay_ms * backoff_multiplier^(n-1), max_delay_ms)`.
#[must_use]
pub fn backoff_delay(policy: &RetryPolicy, failed_attempt: u32) -> Duration {
    let exponent = i32::try_from(failed_attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let cap = policy.max_delay_ms as f64;
    let raw = policy.retry_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let ms = if raw.is_finite() { raw.min(cap) } else { cap };
    Duration::from_millis(ms.round() as u64)
}

#[derive(Clone)]
pub struct RetryScheduler {
    store: Arc<dyn WebhookStore>,
    attempter: DeliveryAttempter,
    clock: Arc<dyn Clock>,
}

impl RetryScheduler {
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

    /// Run the job on its own task.
    pub fn spawn(&self, job: DeliveryJob) -> JoinHandle<DeliveryOutcome> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(job).await })
    }

    /// Run the retry chain to completion.
    pub async fn run(&self, job: DeliveryJob) -> DeliveryOutcome {
        let outcome = |state, attempts, error: Option<String>| DeliveryOutcome {
            webhook_id: job.webhook_id,
            delivery_id: job.delivery_id,
            state,
            attempts,
            error,
        };

        let body = match serde_json::to_vec(&job.payload) {
            Ok(body) => body,
            Err(e) => {
                return outcome(
                    DeliveryState::Misconfigured,
                    0,
                    Some(format!("Failed to serialize payload: {e}")),
                )
            }
        };

        let mut attempt: u32 = 1;
        loop {
            let webhook = match self.store.get(job.webhook_id).await {
                Ok(Some(webhook)) if webhook.is_active => webhook,
                Ok(found) => {
                    tracing::info!(
                        target: "webhook_delivery",
                        webhook_id = %job.webhook_id,
                        delivery_id = %job.delivery_id,
                        event = %job.event,
                        attempt,
                        deleted = found.is_none(),
                        "Webhook no longer active, delivery cancelled"
                    );
                    return outcome(DeliveryState::Cancelled, attempt - 1, None);
                }
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        webhook_id = %job.webhook_id,
                        delivery_id = %job.delivery_id,
                        attempt,
                        error = %e,
                        "Failed to load webhook, delivery abandoned"
                    );
                    return outcome(DeliveryState::Cancelled, attempt - 1, Some(e.to_string()));
                }
            };

            let policy = webhook.retry_policy.clone();
            let final_attempt = attempt > policy.max_retries;
            let ctx = AttemptContext {
                webhook: &webhook,
                delivery_id: job.delivery_id,
                event: &job.event,
                payload: &job.payload,
                body: &body,
                attempt,
                final_attempt,
                trigger: DeliveryTrigger::Dispatch,
                sent_at: self.clock.now(),
            };

            let result = match self.attempter.attempt(ctx).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        webhook_id = %job.webhook_id,
                        delivery_id = %job.delivery_id,
                        error = %e,
                        "Webhook authentication config unusable, nothing sent"
                    );
                    return outcome(DeliveryState::Misconfigured, attempt - 1, Some(e.to_string()));
                }
            };

            if result.success {
                return outcome(DeliveryState::Succeeded, attempt, None);
            }

            if final_attempt {
                tracing::warn!(
                    target: "webhook_delivery",
                    webhook_id = %job.webhook_id,
                    delivery_id = %job.delivery_id,
                    event = %job.event,
                    attempts = attempt,
                    "Webhook delivery exhausted all retries"
                );
                return outcome(DeliveryState::Exhausted, attempt, result.error);
            }

            let delay = backoff_delay(&policy, attempt);
            tracing::debug!(
                target: "webhook_delivery",
                webhook_id = %job.webhook_id,
                delivery_id = %job.delivery_id,
                next_attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retry scheduled"
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}
