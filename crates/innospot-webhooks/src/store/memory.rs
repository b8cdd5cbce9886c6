use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeliveryLogStore, LogAggregate, WebhookStore};
use crate::error::WebhookError;
use crate::models::{DeliveryAttempt, WebhookConfig};

/// In-process webhook store.
#[derive(Debug, Default)]
pub struct MemoryWebhookStore {
    webhooks: RwLock<HashMap<Uuid, WebhookConfig>>,
}

impl MemoryWebhookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn insert_within_limit(
        &self,
        webhook: &WebhookConfig,
        limit: usize,
    ) -> Result<bool, WebhookError> {
        let mut webhooks = self.webhooks.write().await;
        if webhooks.contains_key(&webhook.id) {
            return Err(WebhookError::Internal(format!(
                "webhook {} already exists",
                webhook.id
            )));
        }
        let owned = webhooks
            .values()
            .filter(|w| w.owner_id == webhook.owner_id)
            .count();
        if owned >= limit {
            return Ok(false);
        }
        webhooks.insert(webhook.id, webhook.clone());
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WebhookConfig>, WebhookError> {
        Ok(self.webhooks.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<WebhookConfig>, WebhookError> {
        let mut owned: Vec<_> = self
            .webhooks
            .read()
            .await
            .values()
            .filter(|w| w.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn list_active_for_event(
        &self,
        event: &str,
    ) -> Result<Vec<WebhookConfig>, WebhookError> {
        let mut matching: Vec<_> = self
            .webhooks
            .read()
            .await
            .values()
            .filter(|w| w.is_active && w.subscribes_to(event))
            .cloned()
            .collect();
        matching.sort_by_key(|w| w.id);
        Ok(matching)
    }

    async fn update(&self, webhook: &WebhookConfig) -> Result<bool, WebhookError> {
        let mut webhooks = self.webhooks.write().await;
        match webhooks.get_mut(&webhook.id) {
            Some(existing) => {
                *existing = webhook.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, WebhookError> {
        Ok(self.webhooks.write().await.remove(&id).is_some())
    }
}

/// In-process delivery log. Rows are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDeliveryLogStore {
    rows: RwLock<Vec<DeliveryAttempt>>,
}

impl MemoryDeliveryLogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryDeliveryLogStore {
    async fn append(&self, attempt: &DeliveryAttempt) -> Result<(), WebhookError> {
        self.rows.write().await.push(attempt.clone());
        Ok(())
    }

    async fn list_by_webhook(
        &self,
        webhook_id: Uuid,
        success: Option<bool>,
        limit: usize,
    ) -> Result<Vec<DeliveryAttempt>, WebhookError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<(usize, &DeliveryAttempt)> = rows
            .iter()
            .enumerate()
            .filter(|(_, a)| a.webhook_id == webhook_id)
            .filter(|(_, a)| success.map_or(true, |s| a.success == s))
            .collect();
        // newest first; later insertion wins a timestamp tie
        matching.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, a)| a.clone())
            .collect())
    }

    async fn aggregate(&self, webhook_id: Uuid) -> Result<LogAggregate, WebhookError> {
        let rows = self.rows.read().await;
        let mut agg = LogAggregate::default();
        let mut total_ms: u128 = 0;
        for attempt in rows.iter().filter(|a| a.webhook_id == webhook_id) {
            if attempt.success {
                agg.success_count += 1;
            } else {
                agg.failure_count += 1;
            }
            total_ms += u128::from(attempt.processing_time_ms);
        }
        let total = agg.success_count + agg.failure_count;
        if total > 0 {
            agg.avg_processing_time_ms = total_ms as f64 / total as f64;
        }
        Ok(agg)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, WebhookError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|a| a.timestamp >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
