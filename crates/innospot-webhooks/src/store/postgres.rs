//! Postgres-backed stores over `innospot-db`.
//!
//! The authentication config is serialized to JSON and encrypted with
//! AES-256-GCM before it reaches the database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innospot_db::models::{CreateWebhookLog, UpsertWebhook, WebhookLogRow, WebhookRow};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DeliveryLogStore, LogAggregate, WebhookStore};
use crate::crypto::{decrypt_secret, encrypt_secret};
use crate::error::WebhookError;
use crate::models::{
    AttemptStatus, AuthConfig, DeliveryAttempt, DeliveryResponse, DeliveryTrigger, RetryPolicy,
    WebhookConfig,
};

/// Webhook store over the `webhooks` table.
#[derive(Clone)]
pub struct PgWebhookStore {
    pool: PgPool,
    encryption_key: [u8; 32],
}

impl PgWebhookStore {
    #[must_use]
    pub fn new(pool: PgPool, encryption_key: [u8; 32]) -> Self {
        Self {
            pool,
            encryption_key,
        }
    }

    fn to_row(&self, webhook: &WebhookConfig) -> Result<UpsertWebhook, WebhookError> {
        let auth_json = serde_json::to_string(&webhook.authentication)
            .map_err(|e| WebhookError::Internal(format!("serialize auth config: {e}")))?;
        let retry_policy = serde_json::to_value(&webhook.retry_policy)
            .map_err(|e| WebhookError::Internal(format!("serialize retry policy: {e}")))?;
        let headers = serde_json::to_value(&webhook.headers)
            .map_err(|e| WebhookError::Internal(format!("serialize headers: {e}")))?;

        Ok(UpsertWebhook {
            id: webhook.id,
            owner_id: webhook.owner_id,
            name: webhook.name.clone(),
            description: webhook.description.clone(),
            url: webhook.url.clone(),
            events: webhook.events.iter().cloned().collect(),
            auth_type: webhook.authentication.kind().to_string(),
            auth_config_encrypted: encrypt_secret(&auth_json, &self.encryption_key)?,
            retry_policy,
            headers,
            is_active: webhook.is_active,
            created_at: webhook.created_at,
            updated_at: webhook.updated_at,
        })
    }

    fn from_row(&self, row: WebhookRow) -> Result<WebhookConfig, WebhookError> {
        let auth_json = decrypt_secret(&row.auth_config_encrypted, &self.encryption_key)?;
        let authentication: AuthConfig = serde_json::from_str(&auth_json)
            .map_err(|e| WebhookError::Internal(format!("corrupt auth config: {e}")))?;
        let retry_policy: RetryPolicy = serde_json::from_value(row.retry_policy)
            .map_err(|e| WebhookError::Internal(format!("corrupt retry policy: {e}")))?;
        let headers: BTreeMap<String, String> = serde_json::from_value(row.headers)
            .map_err(|e| WebhookError::Internal(format!("corrupt headers: {e}")))?;

        Ok(WebhookConfig {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            url: row.url,
            events: row.events.into_iter().collect(),
            authentication,
            retry_policy,
            headers,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn from_rows(&self, rows: Vec<WebhookRow>) -> Result<Vec<WebhookConfig>, WebhookError> {
        rows.into_iter().map(|r| self.from_row(r)).collect()
    }
}

#[async_trait]
impl WebhookStore for PgWebhookStore {
    async fn insert_within_limit(
        &self,
        webhook: &WebhookConfig,
        limit: usize,
    ) -> Result<bool, WebhookError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let row = WebhookRow::create_within_limit(&self.pool, self.to_row(webhook)?, limit).await?;
        Ok(row.is_some())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WebhookConfig>, WebhookError> {
        WebhookRow::find_by_id(&self.pool, id)
            .await?
            .map(|row| self.from_row(row))
            .transpose()
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<WebhookConfig>, WebhookError> {
        let rows = WebhookRow::list_by_owner(&self.pool, owner_id).await?;
        self.from_rows(rows)
    }

    async fn list_active_for_event(
        &self,
        event: &str,
    ) -> Result<Vec<WebhookConfig>, WebhookError> {
        let rows = WebhookRow::find_active_by_event(&self.pool, event).await?;
        self.from_rows(rows)
    }

    async fn update(&self, webhook: &WebhookConfig) -> Result<bool, WebhookError> {
        Ok(WebhookRow::update(&self.pool, self.to_row(webhook)?).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, WebhookError> {
        Ok(WebhookRow::delete(&self.pool, id).await?)
    }
}

/// Delivery log over the `webhook_logs` table.
#[derive(Clone)]
pub struct PgDeliveryLogStore {
    pool: PgPool,
}

impl PgDeliveryLogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_log_row(attempt: &DeliveryAttempt) -> Result<CreateWebhookLog, WebhookError> {
    let response_headers = attempt
        .response
        .as_ref()
        .map(|r| serde_json::to_value(&r.headers))
        .transpose()
        .map_err(|e| WebhookError::Internal(format!("serialize response headers: {e}")))?;

    Ok(CreateWebhookLog {
        id: attempt.id,
        webhook_id: attempt.webhook_id,
        delivery_id: attempt.delivery_id,
        event: attempt.event.clone(),
        payload: attempt.payload.clone(),
        timestamp: attempt.timestamp,
        attempt: i32::try_from(attempt.attempt).unwrap_or(i32::MAX),
        success: attempt.success,
        status: attempt.status.as_str().to_string(),
        trigger: attempt.trigger.as_str().to_string(),
        response_status: attempt.response.as_ref().map(|r| i32::from(r.status)),
        response_body: attempt.response.as_ref().map(|r| r.body.clone()),
        response_headers,
        error: attempt.error.clone(),
        processing_time_ms: i64::try_from(attempt.processing_time_ms).unwrap_or(i64::MAX),
    })
}

fn from_log_row(row: WebhookLogRow) -> Result<DeliveryAttempt, WebhookError> {
    let status = AttemptStatus::parse(&row.status)
        .ok_or_else(|| WebhookError::Internal(format!("unknown attempt status {}", row.status)))?;
    let trigger = DeliveryTrigger::parse(&row.trigger)
        .ok_or_else(|| WebhookError::Internal(format!("unknown trigger {}", row.trigger)))?;

    let response = match row.response_status {
        Some(code) => Some(DeliveryResponse {
            status: u16::try_from(code).unwrap_or(0),
            body: row.response_body.unwrap_or(serde_json::Value::Null),
            headers: row
                .response_headers
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| WebhookError::Internal(format!("corrupt response headers: {e}")))?
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(DeliveryAttempt {
        id: row.id,
        webhook_id: row.webhook_id,
        delivery_id: row.delivery_id,
        event: row.event,
        payload: row.payload,
        timestamp: row.timestamp,
        attempt: u32::try_from(row.attempt).unwrap_or(0),
        success: row.success,
        status,
        trigger,
        response,
        error: row.error,
        processing_time_ms: u64::try_from(row.processing_time_ms).unwrap_or(0),
    })
}

#[async_trait]
impl DeliveryLogStore for PgDeliveryLogStore {
    async fn append(&self, attempt: &DeliveryAttempt) -> Result<(), WebhookError> {
        WebhookLogRow::append(&self.pool, to_log_row(attempt)?).await?;
        Ok(())
    }

    async fn list_by_webhook(
        &self,
        webhook_id: Uuid,
        success: Option<bool>,
        limit: usize,
    ) -> Result<Vec<DeliveryAttempt>, WebhookError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = WebhookLogRow::list_by_webhook(&self.pool, webhook_id, success, limit).await?;
        rows.into_iter().map(from_log_row).collect()
    }

    async fn aggregate(&self, webhook_id: Uuid) -> Result<LogAggregate, WebhookError> {
        let agg = WebhookLogRow::aggregate(&self.pool, webhook_id).await?;
        Ok(LogAggregate {
            success_count: u64::try_from(agg.success_count).unwrap_or(0),
            failure_count: u64::try_from(agg.failure_count).unwrap_or(0),
            avg_processing_time_ms: agg.avg_processing_time_ms,
        })
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, WebhookError> {
        Ok(WebhookLogRow::delete_before(&self.pool, cutoff).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_log_row_conversion_keeps_response() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let attempt = DeliveryAttempt {
            id: Uuid::new_v4(),
            webhook_id: Uuid::new_v4(),
            delivery_id: Uuid::new_v4(),
            event: "analysis.ready".to_string(),
            payload: serde_json::json!({"analysisId": "a1"}),
            timestamp: Utc::now(),
            attempt: 2,
            success: false,
            status: AttemptStatus::RetryScheduled,
            trigger: DeliveryTrigger::Dispatch,
            response: Some(DeliveryResponse {
                status: 502,
                body: serde_json::json!({"error": "bad gateway"}),
                headers,
            }),
            error: None,
            processing_time_ms: 42,
        };

        let row = to_log_row(&attempt).unwrap();
        assert_eq!(row.status, "retry_scheduled");
        assert_eq!(row.trigger, "dispatch");
        assert_eq!(row.response_status, Some(502));

        let back = from_log_row(WebhookLogRow {
            seq: 1,
            id: row.id,
            webhook_id: row.webhook_id,
            delivery_id: row.delivery_id,
            event: row.event,
            payload: row.payload,
            timestamp: row.timestamp,
            attempt: row.attempt,
            success: row.success,
            status: row.status,
            trigger: row.trigger,
            response_status: row.response_status,
            response_body: row.response_body,
            response_headers: row.response_headers,
            error: row.error,
            processing_time_ms: row.processing_time_ms,
        })
        .unwrap();
        assert_eq!(back, attempt);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let row = WebhookLogRow {
            seq: 1,
            id: Uuid::new_v4(),
            webhook_id: Uuid::new_v4(),
            delivery_id: Uuid::new_v4(),
            event: "analysis.ready".to_string(),
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
            attempt: 1,
            success: true,
            status: "pending".to_string(),
            trigger: "dispatch".to_string(),
            response_status: None,
            response_body: None,
            response_headers: None,
            error: None,
            processing_time_ms: 0,
        };
        assert!(from_log_row(row).is_err());
    }
}
