//! Delivery attempt rows.
//!
//! The table is append-only: there is no update statement, and rows only
//! leave through [`WebhookLogRow::delete_before`] retention pruning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A row of the `webhook_logs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookLogRow {
    pub seq: i64,
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub attempt: i32,
    pub success: bool,
    pub status: String,
    pub trigger: String,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub response_headers: Option<serde_json::Value>,
    pub error: Option<String>,
    pub processing_time_ms: i64,
}

/// Input for appending one attempt.
#[derive(Debug, Clone)]
pub struct CreateWebhookLog {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub attempt: i32,
    pub success: bool,
    pub status: String,
    pub trigger: String,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub response_headers: Option<serde_json::Value>,
    pub error: Option<String>,
    pub processing_time_ms: i64,
}

/// Derived success/failure counters for one webhook.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookLogAggregate {
    pub success_count: i64,
    pub failure_count: i64,
    pub avg_processing_time_ms: f64,
}

impl WebhookLogRow {
    /// Append an attempt.
    pub async fn append(pool: &PgPool, input: CreateWebhookLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO webhook_logs (
                id, webhook_id, delivery_id, event, payload, timestamp, attempt,
                success, status, trigger, response_status, response_body,
                response_headers, error, processing_time_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(input.id)
        .bind(input.webhook_id)
        .bind(input.delivery_id)
        .bind(input.event)
        .bind(input.payload)
        .bind(input.timestamp)
        .bind(input.attempt)
        .bind(input.success)
        .bind(input.status)
        .bind(input.trigger)
        .bind(input.response_status)
        .bind(input.response_body)
        .bind(input.response_headers)
        .bind(input.error)
        .bind(input.processing_time_ms)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// List a webhook's attempts, newest first, optionally filtered by outcome.
    pub async fn list_by_webhook(
        pool: &PgPool,
        webhook_id: Uuid,
        success: Option<bool>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhook_logs
            WHERE webhook_id = $1
              AND ($2::boolean IS NULL OR success = $2)
            ORDER BY timestamp DESC, seq DESC
            LIMIT $3
            "#,
        )
        .bind(webhook_id)
        .bind(success)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Compute success/failure counts and mean latency for a webhook.
    pub async fn aggregate(
        pool: &PgPool,
        webhook_id: Uuid,
    ) -> Result<WebhookLogAggregate, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE success) AS success_count,
                COUNT(*) FILTER (WHERE NOT success) AS failure_count,
                COALESCE(AVG(processing_time_ms)::float8, 0) AS avg_processing_time_ms
            FROM webhook_logs
            WHERE webhook_id = $1
            "#,
        )
        .bind(webhook_id)
        .fetch_one(pool)
        .await
    }

    /// Remove rows older than the cutoff. Returns the number removed.
    pub async fn delete_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webhook_logs WHERE timestamp < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
