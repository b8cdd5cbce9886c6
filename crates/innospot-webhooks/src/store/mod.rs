//! Storage seams for webhook configs and the delivery log.
//!
//! Services hold these as `Arc<dyn ...>` so the same code runs against
//! Postgres in production and in-memory maps in tests.

mod memory;
mod postgres;

pub use memory::{MemoryDeliveryLogStore, MemoryWebhookStore};
pub use postgres::{PgDeliveryLogStore, PgWebhookStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WebhookError;
use crate::models::{DeliveryAttempt, WebhookConfig};

/// Persistence for [`WebhookConfig`]s.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Insert unless the owner already has `limit` webhooks. The check and
    /// the insert are atomic. Returns `false` when the limit is reached.
    async fn insert_within_limit(
        &self,
        webhook: &WebhookConfig,
        limit: usize,
    ) -> Result<bool, WebhookError>;

    async fn get(&self, id: Uuid) -> Result<Option<WebhookConfig>, WebhookError>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<WebhookConfig>, WebhookError>;

    /// Active webhooks whose event set contains `event`, ordered by id.
    async fn list_active_for_event(&self, event: &str)
        -> Result<Vec<WebhookConfig>, WebhookError>;

    /// Replace a stored webhook. Returns `false` if it no longer exists.
    async fn update(&self, webhook: &WebhookConfig) -> Result<bool, WebhookError>;

    /// Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, WebhookError>;
}

/// Success/failure counters over one webhook's attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogAggregate {
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_processing_time_ms: f64,
}

/// Append-only persistence for [`DeliveryAttempt`]s.
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    async fn append(&self, attempt: &DeliveryAttempt) -> Result<(), WebhookError>;

    /// Newest first (by timestamp, then insertion order), at most `limit`.
    async fn list_by_webhook(
        &self,
        webhook_id: Uuid,
        success: Option<bool>,
        limit: usize,
    ) -> Result<Vec<DeliveryAttempt>, WebhookError>;

    async fn aggregate(&self, webhook_id: Uuid) -> Result<LogAggregate, WebhookError>;

    /// Retention pruning: drop rows whose timestamp is before `cutoff`.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, WebhookError>;
}
