//! Domain types and API request/response shapes for the webhook system.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Header used for HMAC signatures unless the config names another.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Header used for the shared-secret scheme unless the config names another.
pub const DEFAULT_SECRET_HEADER: &str = "X-Webhook-Secret";

fn default_signature_header() -> String {
    DEFAULT_SIGNATURE_HEADER.to_string()
}

fn default_secret_header() -> String {
    DEFAULT_SECRET_HEADER.to_string()
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Digest used for HMAC payload signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha256,
    Sha1,
    Md5,
}

impl SignatureAlgorithm {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha1" => Some(Self::Sha1),
            "md5" => Some(Self::Md5),
            _ => None,
        }
    }
}

/// How an outbound request proves it came from us.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication header.
    #[default]
    None,
    /// Send the shared secret verbatim under `header_name`.
    Secret {
        secret: String,
        #[serde(default = "default_secret_header")]
        header_name: String,
    },
    /// Send a hex HMAC of the exact request body under `header_name`.
    Signature {
        secret: String,
        #[serde(default)]
        algorithm: SignatureAlgorithm,
        #[serde(default = "default_signature_header")]
        header_name: String,
    },
    /// Send `Authorization: Bearer <token>`.
    BearerToken { token: String },
}

impl AuthConfig {
    /// Discriminant as persisted and reported in API responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Secret { .. } => "secret",
            Self::Signature { .. } => "signature",
            Self::BearerToken { .. } => "bearer_token",
        }
    }

    /// Redacted view safe to return from the API.
    #[must_use]
    pub fn summary(&self) -> AuthSummary {
        match self {
            Self::None => AuthSummary {
                auth_type: "none".to_string(),
                header_name: None,
                algorithm: None,
            },
            Self::Secret { header_name, .. } => AuthSummary {
                auth_type: "secret".to_string(),
                header_name: Some(header_name.clone()),
                algorithm: None,
            },
            Self::Signature {
                algorithm,
                header_name,
                ..
            } => AuthSummary {
                auth_type: "signature".to_string(),
                header_name: Some(header_name.clone()),
                algorithm: Some(*algorithm),
            },
            Self::BearerToken { .. } => AuthSummary {
                auth_type: "bearer_token".to_string(),
                header_name: Some("Authorization".to_string()),
                algorithm: None,
            },
        }
    }
}

/// Authentication config with secrets removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthSummary {
    #[serde(rename = "type")]
    pub auth_type: String,
    pub header_name: Option<String>,
    pub algorithm: Option<SignatureAlgorithm>,
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Exponential backoff bounds for one webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 means a single attempt.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Webhook configuration
// ---------------------------------------------------------------------------

/// A registered outbound endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
    pub events: BTreeSet<String>,
    pub authentication: AuthConfig,
    pub retry_policy: RetryPolicy,
    pub headers: BTreeMap<String, String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookConfig {
    #[must_use]
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.contains(event)
    }
}

/// Request to register a webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWebhookRequest {
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    pub events: Vec<String>,
    #[serde(default)]
    pub authentication: AuthConfig,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateWebhookRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub authentication: Option<AuthConfig>,
    pub retry_policy: Option<RetryPolicy>,
    pub headers: Option<HashMap<String, String>>,
    pub is_active: Option<bool>,
}

/// Body of `PUT /webhooks/{id}/active`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Webhook as returned by the API (secrets redacted).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
    pub events: Vec<String>,
    pub authentication: AuthSummary,
    pub retry_policy: RetryPolicy,
    pub headers: BTreeMap<String, String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookConfig> for WebhookResponse {
    fn from(w: WebhookConfig) -> Self {
        Self {
            id: w.id,
            owner_id: w.owner_id,
            authentication: w.authentication.summary(),
            name: w.name,
            description: w.description,
            url: w.url,
            events: w.events.into_iter().collect(),
            retry_policy: w.retry_policy,
            headers: w.headers,
            is_active: w.is_active,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Query for listing an owner's webhooks.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListWebhooksQuery {
    pub owner_id: Uuid,
}

/// Webhook counts for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookSummary {
    pub owner_id: Uuid,
    pub total_webhooks: usize,
    pub active_webhooks: usize,
}

// ---------------------------------------------------------------------------
// Delivery log
// ---------------------------------------------------------------------------

/// Where an attempt sits in its retry chain once its outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Succeeded,
    RetryScheduled,
    Exhausted,
}

impl AttemptStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::RetryScheduled => "retry_scheduled",
            Self::Exhausted => "exhausted",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "retry_scheduled" => Some(Self::RetryScheduled),
            "exhausted" => Some(Self::Exhausted),
            _ => None,
        }
    }
}

/// What started a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTrigger {
    Dispatch,
    TestFire,
}

impl DeliveryTrigger {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::TestFire => "test_fire",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dispatch" => Some(Self::Dispatch),
            "test_fire" => Some(Self::TestFire),
            _ => None,
        }
    }
}

/// HTTP response captured for an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub status: u16,
    /// Parsed as JSON when possible, otherwise the raw (truncated) text.
    #[schema(value_type = Object)]
    pub body: serde_json::Value,
    pub headers: BTreeMap<String, String>,
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// No response: timeout, DNS, refused connection.
    Transport(String),
    /// A response arrived with a status outside 200..300.
    Http { status: u16 },
}

/// One HTTP call within a delivery's retry chain. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAttempt {
    pub id: Uuid,
    pub webhook_id: Uuid,
    /// Shared by every attempt of one logical delivery.
    pub delivery_id: Uuid,
    pub event: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// 1-based position in the retry chain.
    pub attempt: u32,
    pub success: bool,
    pub status: AttemptStatus,
    pub trigger: DeliveryTrigger,
    pub response: Option<DeliveryResponse>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

impl DeliveryAttempt {
    #[must_use]
    pub fn failure(&self) -> Option<DeliveryFailure> {
        if self.success {
            return None;
        }
        match (&self.response, &self.error) {
            (Some(response), _) => Some(DeliveryFailure::Http {
                status: response.status,
            }),
            (None, Some(error)) => Some(DeliveryFailure::Transport(error.clone())),
            (None, None) => Some(DeliveryFailure::Transport("unknown error".to_string())),
        }
    }
}

/// Default number of log rows returned.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Upper bound on log rows returned in one call.
pub const MAX_LOG_LIMIT: usize = 1000;

/// Filter for reading a webhook's delivery log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogFilter {
    /// Only successful (`true`) or failed (`false`) attempts.
    pub success: Option<bool>,
    /// Maximum rows, default 100.
    pub limit: Option<usize>,
}

impl LogFilter {
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }
}

/// Aggregate counters derived from a webhook's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryStats {
    pub webhook_id: Uuid,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_count: u64,
    /// Fraction in 0.0..=1.0; 0.0 when there are no attempts.
    pub success_rate: f64,
    pub avg_processing_time_ms: f64,
}

impl DeliveryStats {
    #[must_use]
    pub fn new(
        webhook_id: Uuid,
        success_count: u64,
        failure_count: u64,
        avg_processing_time_ms: f64,
    ) -> Self {
        let total_count = success_count + failure_count;
        let success_rate = if total_count == 0 {
            0.0
        } else {
            success_count as f64 / total_count as f64
        };
        Self {
            webhook_id,
            success_count,
            failure_count,
            total_count,
            success_rate,
            avg_processing_time_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Test-fire
// ---------------------------------------------------------------------------

/// Operator request to fire one attempt at a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFireRequest {
    pub webhook_id: Uuid,
    pub event: String,
    /// Falls back to the event's documented example.
    pub payload: Option<serde_json::Value>,
    /// Sent as `X-Webhook-Timestamp`; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Body of `POST /webhooks/{id}/test`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestWebhookBody {
    pub event: String,
    #[schema(value_type = Option<Object>)]
    pub payload: Option<serde_json::Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Synchronous result of a test-fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryTestResult {
    pub success: bool,
    /// HTTP status, absent when no response was received.
    pub status: Option<u16>,
    #[schema(value_type = Option<Object>)]
    pub response: Option<serde_json::Value>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
    pub delivery_id: Uuid,
    pub log_id: Uuid,
}

impl From<&DeliveryAttempt> for DeliveryTestResult {
    fn from(a: &DeliveryAttempt) -> Self {
        Self {
            success: a.success,
            status: a.response.as_ref().map(|r| r.status),
            response: a.response.as_ref().map(|r| r.body.clone()),
            error: a.error.clone(),
            processing_time_ms: a.processing_time_ms,
            delivery_id: a.delivery_id,
            log_id: a.id,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Terminal state of a logical delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Succeeded,
    Exhausted,
    /// The webhook was deactivated or deleted before an attempt was due.
    Cancelled,
    /// The authentication config could not be applied; nothing was sent.
    Misconfigured,
}

/// Final result of one logical delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub state: DeliveryState,
    /// Attempts actually sent.
    pub attempts: u32,
    pub error: Option<String>,
}

/// Handle for one webhook targeted by a dispatch.
#[derive(Debug)]
pub struct DispatchResult {
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub handle: JoinHandle<DeliveryOutcome>,
}

impl DispatchResult {
    #[must_use]
    pub fn receipt(&self) -> DispatchReceipt {
        DispatchReceipt {
            webhook_id: self.webhook_id,
            delivery_id: self.delivery_id,
        }
    }
}

/// Serializable part of a [`DispatchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DispatchReceipt {
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
}

/// Response of `POST /events/{event}/dispatch`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub event: String,
    pub deliveries: Vec<DispatchReceipt>,
}
