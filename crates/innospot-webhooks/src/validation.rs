//! Write-time validation of webhook configurations.
//!
//! Covers:
//! - URL format, scheme and SSRF protection
//! - Name, event subscriptions (against the catalog) and retry policy bounds
//! - Static headers (must not collide with headers the delivery path owns)
//! - Authentication config shape

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use reqwest::header::{HeaderName, HeaderValue};

use crate::catalog;
use crate::error::WebhookError;
use crate::models::{
    AuthConfig, RetryPolicy, WebhookConfig, DEFAULT_SECRET_HEADER, DEFAULT_SIGNATURE_HEADER,
};

/// Upper bound on retries after the first attempt.
pub const MAX_RETRIES: u32 = 10;

/// Smallest accepted base retry delay.
pub const MIN_RETRY_DELAY_MS: u64 = 100;

/// Headers a webhook's static header map may not set.
const RESERVED_HEADERS: &[&str] = &[
    "host",
    "content-type",
    "content-length",
    "authorization",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Prefix of headers set on every delivery.
const RESERVED_PREFIX: &str = "x-webhook-";

/// Policy knobs for URL checks.
#[derive(Debug, Clone, Copy)]
pub struct UrlPolicy {
    pub allow_http: bool,
    pub block_private_hosts: bool,
}

// ---------------------------------------------------------------------------
// Whole-config validation
// ---------------------------------------------------------------------------

/// Validate every persisted invariant of a webhook config.
pub fn validate_webhook(config: &WebhookConfig, policy: UrlPolicy) -> Result<(), WebhookError> {
    if config.name.trim().is_empty() {
        return Err(WebhookError::Validation("name is required".to_string()));
    }
    validate_webhook_url(&config.url, policy)?;
    validate_events(&config.events)?;
    validate_retry_policy(&config.retry_policy)?;
    validate_static_headers(&config.headers, &config.authentication)?;
    validate_auth_config(&config.authentication)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

/// Validate a webhook delivery URL.
pub fn validate_webhook_url(url: &str, policy: UrlPolicy) -> Result<(), WebhookError> {
    if url.trim().is_empty() {
        return Err(WebhookError::InvalidUrl("url is required".to_string()));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if policy.allow_http => {}
        "http" => {
            return Err(WebhookError::InvalidUrl(
                "Webhook URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(WebhookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::InvalidUrl("URL must have a host".to_string()))?;

    if policy.block_private_hosts {
        validate_host_not_internal(host)?;
    }

    Ok(())
}

/// Validate that a host is not a private/internal address.
///
/// Blocks loopback, RFC 1918, link-local (cloud metadata), CGNAT,
/// broadcast/unspecified, and `localhost`/`*.internal`/`*.local` names.
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    // IPv6 hosts come back from the url crate in brackets
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = bare.to_ascii_lowercase();
    if lower == "localhost"
        || lower.ends_with(".localhost")
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
                || v6.to_ipv4_mapped().is_some_and(|v4| is_internal_ip(&IpAddr::V4(v4)))
        }
    }
}

// ---------------------------------------------------------------------------
// Events and retry policy
// ---------------------------------------------------------------------------

/// At least one event, all from the catalog.
pub fn validate_events(events: &BTreeSet<String>) -> Result<(), WebhookError> {
    if events.is_empty() {
        return Err(WebhookError::Validation(
            "at least one event is required".to_string(),
        ));
    }
    for event in events {
        if !catalog::is_known(event) {
            return Err(WebhookError::Validation(format!(
                "Unknown event type: {event}"
            )));
        }
    }
    Ok(())
}

pub fn validate_retry_policy(policy: &RetryPolicy) -> Result<(), WebhookError> {
    if policy.max_retries > MAX_RETRIES {
        return Err(WebhookError::Validation(format!(
            "max_retries must be at most {MAX_RETRIES}"
        )));
    }
    if policy.retry_delay_ms < MIN_RETRY_DELAY_MS {
        return Err(WebhookError::Validation(format!(
            "retry_delay_ms must be at least {MIN_RETRY_DELAY_MS}"
        )));
    }
    if !policy.backoff_multiplier.is_finite() || policy.backoff_multiplier < 1.0 {
        return Err(WebhookError::Validation(
            "backoff_multiplier must be a finite number >= 1".to_string(),
        ));
    }
    if policy.max_delay_ms < policy.retry_delay_ms {
        return Err(WebhookError::Validation(format!(
            "max_delay_ms ({}) must be >= retry_delay_ms ({})",
            policy.max_delay_ms, policy.retry_delay_ms
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Headers and authentication
// ---------------------------------------------------------------------------

/// Static headers must be valid HTTP and must not shadow reserved headers
/// or the configured authentication header.
pub fn validate_static_headers(
    headers: &BTreeMap<String, String>,
    auth: &AuthConfig,
) -> Result<(), WebhookError> {
    let auth_header = auth_header_name(auth).map(str::to_ascii_lowercase);

    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WebhookError::Validation(format!("Invalid header name: {name}")))?;
        HeaderValue::from_str(value)
            .map_err(|_| WebhookError::Validation(format!("Invalid value for header {name}")))?;

        let lower = name.to_ascii_lowercase();
        if RESERVED_HEADERS.contains(&lower.as_str())
            || lower.starts_with(RESERVED_PREFIX)
            || auth_header.as_deref() == Some(lower.as_str())
        {
            return Err(WebhookError::Validation(format!(
                "Header {name} is reserved and cannot be overridden"
            )));
        }
    }
    Ok(())
}

/// Whether a secret or signature scheme may send its credential under `name`.
///
/// Reserved headers and the delivery metadata headers are refused. The two
/// default credential headers are the only `X-Webhook-*` names allowed.
pub fn is_allowed_auth_header(name: &str) -> bool {
    if name.eq_ignore_ascii_case(DEFAULT_SIGNATURE_HEADER)
        || name.eq_ignore_ascii_case(DEFAULT_SECRET_HEADER)
    {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    !RESERVED_HEADERS.contains(&lower.as_str()) && !lower.starts_with(RESERVED_PREFIX)
}

fn auth_header_name(auth: &AuthConfig) -> Option<&str> {
    match auth {
        AuthConfig::None => None,
        AuthConfig::Secret { header_name, .. } | AuthConfig::Signature { header_name, .. } => {
            Some(header_name)
        }
        AuthConfig::BearerToken { .. } => Some("authorization"),
    }
}

/// Authentication config must be usable by the signer.
pub fn validate_auth_config(auth: &AuthConfig) -> Result<(), WebhookError> {
    match auth {
        AuthConfig::None => Ok(()),
        AuthConfig::Secret {
            secret,
            header_name,
        }
        | AuthConfig::Signature {
            secret,
            header_name,
            ..
        } => {
            if secret.is_empty() {
                return Err(WebhookError::Configuration(
                    "secret must not be empty".to_string(),
                ));
            }
            HeaderName::from_bytes(header_name.as_bytes()).map_err(|_| {
                WebhookError::Configuration(format!("Invalid header name: {header_name:?}"))
            })?;
            if !is_allowed_auth_header(header_name) {
                return Err(WebhookError::Configuration(format!(
                    "Header {header_name} is reserved and cannot carry credentials"
                )));
            }
            Ok(())
        }
        AuthConfig::BearerToken { token } => {
            if token.is_empty() {
                return Err(WebhookError::Configuration(
                    "bearer token must not be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}
