//! Delivery log: append-only record of attempts, queried per webhook.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WebhookError;
use crate::models::{DeliveryAttempt, DeliveryStats, LogFilter};
use crate::store::DeliveryLogStore;

#[derive(Clone)]
pub struct DeliveryLog {
    store: Arc<dyn DeliveryLogStore>,
}

impl DeliveryLog {
    pub fn new(store: Arc<dyn DeliveryLogStore>) -> Self {
        Self { store }
    }

    /// Record one attempt. Existing rows are never touched.
    pub async fn append(&self, attempt: &DeliveryAttempt) -> Result<(), WebhookError> {
        self.store.append(attempt).await
    }

    /// Attempts for a webhook, newest first.
    pub async fn list_by_webhook(
        &self,
        webhook_id: Uuid,
        filter: &LogFilter,
    ) -> Result<Vec<DeliveryAttempt>, WebhookError> {
        self.store
            .list_by_webhook(webhook_id, filter.success, filter.effective_limit())
            .await
    }

    pub async fn aggregate(&self, webhook_id: Uuid) -> Result<DeliveryStats, WebhookError> {
        let agg = self.store.aggregate(webhook_id).await?;
        Ok(DeliveryStats::new(
            webhook_id,
            agg.success_count,
            agg.failure_count,
            agg.avg_processing_time_ms,
        ))
    }

    /// Retention pruning. Returns the number of rows removed.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, WebhookError> {
        let removed = self.store.prune_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(
                target: "webhook_delivery",
                removed,
                cutoff = %cutoff,
                "Pruned webhook log rows past retention"
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptStatus, DeliveryTrigger};
    use crate::store::MemoryDeliveryLogStore;

    fn attempt(webhook_id: Uuid, success: bool, attempt: u32) -> DeliveryAttempt {
        DeliveryAttempt {
            id: Uuid::new_v4(),
            webhook_id,
            delivery_id: Uuid::new_v4(),
            event: "patent.status.changed".to_string(),
            payload: serde_json::json!({"patentId": "US1"}),
            timestamp: Utc::now(),
            attempt,
            success,
            status: if success {
                AttemptStatus::Succeeded
            } else {
                AttemptStatus::RetryScheduled
            },
            trigger: DeliveryTrigger::Dispatch,
            response: None,
            error: (!success).then(|| "Connection failed".to_string()),
            processing_time_ms: 8,
        }
    }

    #[tokio::test]
    async fn test_reads_are_repeatable() {
        let log = DeliveryLog::new(Arc::new(MemoryDeliveryLogStore::new()));
        let id = Uuid::new_v4();
        for n in 1..=3 {
            log.append(&attempt(id, n == 3, n)).await.unwrap();
        }

        let filter = LogFilter::default();
        let first = log.list_by_webhook(id, &filter).await.unwrap();
        let second = log.list_by_webhook(id, &filter).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_aggregate_and_success_filter() {
        let log = DeliveryLog::new(Arc::new(MemoryDeliveryLogStore::new()));
        let id = Uuid::new_v4();
        log.append(&attempt(id, false, 1)).await.unwrap();
        log.append(&attempt(id, true, 2)).await.unwrap();

        let stats = log.aggregate(id).await.unwrap();
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.total_count, 2);
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);

        let ok = log
            .list_by_webhook(
                id,
                &LogFilter {
                    success: Some(true),
                    limit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(ok.len(), 1);
        assert!(ok[0].success);

        let empty = log.aggregate(Uuid::new_v4()).await.unwrap();
        assert_eq!(empty.total_count, 0);
        assert_eq!(empty.success_rate, 0.0);
    }
}
