//! Delivery attempter: one signed HTTP POST, classified and logged.
//!
//! The attempter never retries. It builds the request headers (static
//! headers, content type, delivery metadata, authentication), sends the
//! exact body bytes once with a bounded timeout, and appends exactly one
//! row to the delivery log. An authentication config that cannot be applied
//! fails before anything is sent and leaves no row behind.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::WebhookSettings;
use crate::crypto;
use crate::error::WebhookError;
use crate::models::{
    AttemptStatus, DeliveryAttempt, DeliveryResponse, DeliveryTrigger, WebhookConfig,
};
use crate::services::log_service::DeliveryLog;

/// Response bodies are cut to this many characters before logging.
pub const MAX_RESPONSE_BODY_CHARS: usize = 4096;

/// At most this many bytes of a response body are read off the wire.
pub const MAX_RESPONSE_BODY_BYTES: usize = 16 * 1024;

pub const EVENT_HEADER: &str = "x-webhook-event";
pub const DELIVERY_HEADER: &str = "x-webhook-delivery";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

/// Everything one attempt needs.
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    pub webhook: &'a WebhookConfig,
    pub delivery_id: Uuid,
    pub event: &'a str,
    pub payload: &'a serde_json::Value,
    /// Serialized `payload`; sent and signed byte for byte.
    pub body: &'a [u8],
    /// 1-based position in the retry chain.
    pub attempt: u32,
    /// No further attempt follows a failure of this one.
    pub final_attempt: bool,
    pub trigger: DeliveryTrigger,
    /// Sent as `X-Webhook-Timestamp`.
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DeliveryAttempter {
    http_client: Client,
    log: DeliveryLog,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl DeliveryAttempter {
    /// Create an attempter with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Internal` if the HTTP client cannot be built.
    pub fn new(
        settings: &WebhookSettings,
        log: DeliveryLog,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WebhookError> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| WebhookError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            log,
            clock,
            timeout: settings.request_timeout,
        })
    }

    /// Perform one attempt and append it to the log.
    ///
    /// Transport and HTTP failures come back as an unsuccessful
    /// [`DeliveryAttempt`], not as an error. `Err` means nothing was sent.
    pub async fn attempt(&self, ctx: AttemptContext<'_>) -> Result<DeliveryAttempt, WebhookError> {
        let headers = build_headers(&ctx)?;

        let timestamp = self.clock.now();
        let start = Instant::now();
        let result = self
            .http_client
            .post(&ctx.webhook.url)
            .headers(headers)
            .body(ctx.body.to_vec())
            .send()
            .await;

        let (response, error) = match result {
            Ok(response) => (Some(capture_response(response).await), None),
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timeout ({}s)", self.timeout.as_secs())
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request error: {e}")
                };
                (None, Some(message))
            }
        };
        let processing_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let success = response
            .as_ref()
            .is_some_and(|r| (200..300).contains(&r.status));
        let status = if success {
            AttemptStatus::Succeeded
        } else if ctx.final_attempt {
            AttemptStatus::Exhausted
        } else {
            AttemptStatus::RetryScheduled
        };

        let attempt = DeliveryAttempt {
            id: Uuid::new_v4(),
            webhook_id: ctx.webhook.id,
            delivery_id: ctx.delivery_id,
            event: ctx.event.to_string(),
            payload: ctx.payload.clone(),
            timestamp,
            attempt: ctx.attempt,
            success,
            status,
            trigger: ctx.trigger,
            response,
            error,
            processing_time_ms,
        };

        if success {
            tracing::info!(
                target: "webhook_delivery",
                webhook_id = %attempt.webhook_id,
                delivery_id = %attempt.delivery_id,
                event = %attempt.event,
                attempt = attempt.attempt,
                success,
                response_code = attempt.response.as_ref().map(|r| r.status),
                processing_time_ms,
                "Webhook delivery succeeded"
            );
        } else {
            tracing::warn!(
                target: "webhook_delivery",
                webhook_id = %attempt.webhook_id,
                delivery_id = %attempt.delivery_id,
                event = %attempt.event,
                attempt = attempt.attempt,
                success,
                response_code = attempt.response.as_ref().map(|r| r.status),
                error = attempt.error.as_deref().unwrap_or(""),
                status = attempt.status.as_str(),
                processing_time_ms,
                "Webhook delivery failed"
            );
        }

        if let Err(e) = self.log.append(&attempt).await {
            tracing::error!(
                target: "webhook_delivery",
                webhook_id = %attempt.webhook_id,
                delivery_id = %attempt.delivery_id,
                attempt = attempt.attempt,
                error = %e,
                "Failed to append delivery attempt to log"
            );
        }

        Ok(attempt)
    }
}

/// Static headers, then delivery metadata, then authentication.
fn build_headers(ctx: &AttemptContext<'_>) -> Result<HeaderMap, WebhookError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &ctx.webhook.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WebhookError::Configuration(format!("Invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            WebhookError::Configuration(format!("Invalid value for header {name}"))
        })?;
        headers.insert(name, value);
    }

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(EVENT_HEADER),
        HeaderValue::from_str(ctx.event)
            .map_err(|_| WebhookError::Validation(format!("Invalid event name: {}", ctx.event)))?,
    );
    headers.insert(
        HeaderName::from_static(DELIVERY_HEADER),
        HeaderValue::from_str(&ctx.delivery_id.to_string())
            .map_err(|e| WebhookError::Internal(format!("delivery id header: {e}")))?,
    );
    headers.insert(
        HeaderName::from_static(TIMESTAMP_HEADER),
        HeaderValue::from(ctx.sent_at.timestamp()),
    );

    if let Some((name, value)) = crypto::auth_header(&ctx.webhook.authentication, ctx.body)? {
        headers.insert(name, value);
    }

    Ok(headers)
}

async fn capture_response(mut response: reqwest::Response) -> DeliveryResponse {
    let status = response.status().as_u16();

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let Ok(value) = value.to_str() else { continue };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let bytes = read_capped_body(&mut response).await;
    let text = String::from_utf8_lossy(&bytes);
    DeliveryResponse {
        status,
        body: parse_body(&text),
        headers,
    }
}

/// Read the body chunk by chunk, stopping once the cap is reached. The rest
/// of the body is never buffered. A read error keeps what arrived so far.
async fn read_capped_body(response: &mut reqwest::Response) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = MAX_RESPONSE_BODY_BYTES - body.len();
                if chunk.len() >= room {
                    body.extend_from_slice(&chunk[..room]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(
                    target: "webhook_delivery",
                    error = %e,
                    "Failed to read webhook response body"
                );
                break;
            }
        }
    }
    body
}

/// JSON when the (truncated) body parses, otherwise the text itself.
fn parse_body(text: &str) -> serde_json::Value {
    if text.is_empty() {
        return serde_json::Value::Null;
    }
    let truncated: String = text.chars().take(MAX_RESPONSE_BODY_CHARS).collect();
    serde_json::from_str(&truncated).unwrap_or(serde_json::Value::String(truncated))
}
