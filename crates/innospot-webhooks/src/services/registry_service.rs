//! Webhook registry: CRUD over webhook configurations.
//!
//! Every write re-validates the whole config (URL safety, catalog events,
//! retry policy bounds, static headers, authentication shape) and enforces
//! the per-owner limit on create. The registry never makes network calls.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::WebhookError;
use crate::models::{CreateWebhookRequest, UpdateWebhookRequest, WebhookConfig, WebhookSummary};
use crate::store::WebhookStore;
use crate::validation::{self, UrlPolicy};

/// Default maximum webhooks per owner.
pub const DEFAULT_MAX_WEBHOOKS: usize = 25;

#[derive(Clone)]
pub struct WebhookRegistry {
    store: Arc<dyn WebhookStore>,
    clock: Arc<dyn Clock>,
    url_policy: UrlPolicy,
    max_webhooks: usize,
}

impl WebhookRegistry {
    pub fn new(store: Arc<dyn WebhookStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            url_policy: UrlPolicy {
                allow_http: true,
                block_private_hosts: true,
            },
            max_webhooks: DEFAULT_MAX_WEBHOOKS,
        }
    }

    #[must_use]
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Set the maximum webhooks per owner.
    #[must_use]
    pub fn with_max_webhooks(mut self, max: usize) -> Self {
        self.max_webhooks = max;
        self
    }

    /// Register a webhook. `is_active` defaults to `true`.
    pub async fn create(&self, request: CreateWebhookRequest) -> Result<WebhookConfig, WebhookError> {
        let now = self.clock.now();
        let webhook = WebhookConfig {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            name: request.name.trim().to_string(),
            description: request.description,
            url: request.url.trim().to_string(),
            events: request.events.into_iter().collect(),
            authentication: request.authentication,
            retry_policy: request.retry_policy,
            headers: request.headers.into_iter().collect(),
            is_active: request.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        validation::validate_webhook(&webhook, self.url_policy)?;

        if !self
            .store
            .insert_within_limit(&webhook, self.max_webhooks)
            .await?
        {
            return Err(WebhookError::WebhookLimitExceeded {
                limit: self.max_webhooks,
            });
        }

        tracing::info!(
            target: "webhook_registry",
            webhook_id = %webhook.id,
            owner_id = %webhook.owner_id,
            events = ?webhook.events,
            auth = webhook.authentication.kind(),
            "Webhook registered"
        );

        Ok(webhook)
    }

    pub async fn get(&self, id: Uuid) -> Result<WebhookConfig, WebhookError> {
        self.store
            .get(id)
            .await?
            .ok_or(WebhookError::WebhookNotFound)
    }

    /// All webhooks owned by `owner_id`, newest first.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<WebhookConfig>, WebhookError> {
        self.store.list_by_owner(owner_id).await
    }

    /// Apply a partial update and re-validate the result.
    pub async fn update(
        &self,
        id: Uuid,
        patch: UpdateWebhookRequest,
    ) -> Result<WebhookConfig, WebhookError> {
        let mut webhook = self.get(id).await?;

        if let Some(name) = patch.name {
            webhook.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            webhook.description = description;
        }
        if let Some(url) = patch.url {
            webhook.url = url.trim().to_string();
        }
        if let Some(events) = patch.events {
            webhook.events = events.into_iter().collect();
        }
        if let Some(authentication) = patch.authentication {
            webhook.authentication = authentication;
        }
        if let Some(retry_policy) = patch.retry_policy {
            webhook.retry_policy = retry_policy;
        }
        if let Some(headers) = patch.headers {
            webhook.headers = headers.into_iter().collect();
        }
        if let Some(is_active) = patch.is_active {
            webhook.is_active = is_active;
        }

        validation::validate_webhook(&webhook, self.url_policy)?;
        self.touch_and_save(&mut webhook).await?;

        tracing::info!(
            target: "webhook_registry",
            webhook_id = %webhook.id,
            is_active = webhook.is_active,
            "Webhook updated"
        );

        Ok(webhook)
    }

    /// Toggle dispatch eligibility. Delivery history is untouched.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<WebhookConfig, WebhookError> {
        let mut webhook = self.get(id).await?;
        webhook.is_active = is_active;
        self.touch_and_save(&mut webhook).await?;

        tracing::info!(
            target: "webhook_registry",
            webhook_id = %id,
            is_active,
            "Webhook activation changed"
        );

        Ok(webhook)
    }

    /// Remove a webhook. Its log rows are retained.
    pub async fn delete(&self, id: Uuid) -> Result<(), WebhookError> {
        if !self.store.delete(id).await? {
            return Err(WebhookError::WebhookNotFound);
        }

        tracing::info!(
            target: "webhook_registry",
            webhook_id = %id,
            "Webhook deleted"
        );

        Ok(())
    }

    pub async fn summary(&self, owner_id: Uuid) -> Result<WebhookSummary, WebhookError> {
        let webhooks = self.store.list_by_owner(owner_id).await?;
        Ok(WebhookSummary {
            owner_id,
            total_webhooks: webhooks.len(),
            active_webhooks: webhooks.iter().filter(|w| w.is_active).count(),
        })
    }

    async fn touch_and_save(&self, webhook: &mut WebhookConfig) -> Result<(), WebhookError> {
        webhook.updated_at = self.clock.now().max(webhook.created_at);
        if !self.store.update(webhook).await? {
            return Err(WebhookError::WebhookNotFound);
        }
        Ok(())
    }
}
