//! Webhook configuration rows.
//!
//! The authentication config is stored encrypted; callers are responsible
//! for encrypting before writing and decrypting after reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A row of the `webhooks` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
    pub events: Vec<String>,
    /// Plaintext discriminant (`none`, `secret`, `signature`, `bearer_token`).
    pub auth_type: String,
    /// base64(nonce || ciphertext) of the serialized auth config.
    pub auth_config_encrypted: String,
    pub retry_policy: serde_json::Value,
    pub headers: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full column set written on insert and update.
#[derive(Debug, Clone)]
pub struct UpsertWebhook {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
    pub events: Vec<String>,
    pub auth_type: String,
    pub auth_config_encrypted: String,
    pub retry_policy: serde_json::Value,
    pub headers: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookRow {
    /// Insert a new webhook unless its owner already has `limit` of them.
    ///
    /// Count and insert run in one transaction holding an advisory lock on
    /// the owner, so concurrent creates for the same owner are serialized.
    /// Returns `None` when the limit is reached.
    pub async fn create_within_limit(
        pool: &PgPool,
        input: UpsertWebhook,
        limit: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(input.owner_id)
            .execute(&mut *tx)
            .await?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM webhooks WHERE owner_id = $1")
            .bind(input.owner_id)
            .fetch_one(&mut *tx)
            .await?;
        if count >= limit {
            tx.rollback().await?;
            return Ok(None);
        }

        let row: Self = sqlx::query_as(
            r#"
            INSERT INTO webhooks (
                id, owner_id, name, description, url, events, auth_type,
                auth_config_encrypted, retry_policy, headers, is_active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(input.id)
        .bind(input.owner_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.url)
        .bind(input.events)
        .bind(input.auth_type)
        .bind(input.auth_config_encrypted)
        .bind(input.retry_policy)
        .bind(input.headers)
        .bind(input.is_active)
        .bind(input.created_at)
        .bind(input.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    /// Find a webhook by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM webhooks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's webhooks, newest first.
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhooks
            WHERE owner_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Find all active webhooks subscribed to an event name.
    pub async fn find_active_by_event(
        pool: &PgPool,
        event: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhooks
            WHERE is_active AND $1 = ANY(events)
            ORDER BY id
            "#,
        )
        .bind(event)
        .fetch_all(pool)
        .await
    }

    /// Overwrite every mutable column. Returns `false` if the row is gone.
    pub async fn update(pool: &PgPool, input: UpsertWebhook) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhooks SET
                name = $2,
                description = $3,
                url = $4,
                events = $5,
                auth_type = $6,
                auth_config_encrypted = $7,
                retry_policy = $8,
                headers = $9,
                is_active = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(input.id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.url)
        .bind(input.events)
        .bind(input.auth_type)
        .bind(input.auth_config_encrypted)
        .bind(input.retry_policy)
        .bind(input.headers)
        .bind(input.is_active)
        .bind(input.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a webhook. Its log rows are retained.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
