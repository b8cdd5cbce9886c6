//! Common test utilities for innospot-webhooks integration tests.
//!
//! Provides wiremock responders, injectable clocks, and a fully wired
//! in-memory webhook system. No database is required.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innospot_webhooks::models::{AuthConfig, CreateWebhookRequest, RetryPolicy};
use innospot_webhooks::store::{MemoryDeliveryLogStore, MemoryWebhookStore};
use innospot_webhooks::{Clock, WebhookSettings, WebhookSystem};
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

pub const OWNER_A: Uuid = Uuid::from_bytes([
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
]);

pub const OWNER_B: Uuid = Uuid::from_bytes([
    0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22,
]);

pub const SECRET_1: &str = "whsec_test_secret_key_12345";

pub const PATENT_STATUS_CHANGED: &str = "patent.status.changed";
pub const SEARCH_COMPLETED: &str = "search.completed";
pub const ANALYSIS_READY: &str = "analysis.ready";

/// Settings for tests: wiremock listens on 127.0.0.1, so the private-host
/// guard is off.
pub fn test_settings() -> WebhookSettings {
    WebhookSettings {
        request_timeout: Duration::from_secs(5),
        block_private_hosts: false,
        ..WebhookSettings::default()
    }
}

/// A wired system over fresh in-memory stores.
pub struct TestSystem {
    pub system: WebhookSystem,
    pub webhooks: Arc<MemoryWebhookStore>,
    pub logs: Arc<MemoryDeliveryLogStore>,
}

pub fn test_system_with(clock: Arc<dyn Clock>, settings: WebhookSettings) -> TestSystem {
    let webhooks = Arc::new(MemoryWebhookStore::new());
    let logs = Arc::new(MemoryDeliveryLogStore::new());
    let system = WebhookSystem::new(webhooks.clone(), logs.clone(), clock, settings)
        .expect("failed to build webhook system");
    TestSystem {
        system,
        webhooks,
        logs,
    }
}

pub fn test_system(clock: Arc<dyn Clock>) -> TestSystem {
    test_system_with(clock, test_settings())
}

/// A create request with no auth and the given retry policy.
pub fn webhook_request(url: &str, events: &[&str], retry_policy: RetryPolicy) -> CreateWebhookRequest {
    CreateWebhookRequest {
        owner_id: OWNER_A,
        name: "Test webhook".to_string(),
        description: "integration test".to_string(),
        url: url.to_string(),
        events: events.iter().map(|e| e.to_string()).collect(),
        authentication: AuthConfig::None,
        retry_policy,
        headers: HashMap::new(),
        is_active: None,
    }
}

pub fn policy(max_retries: u32, retry_delay_ms: u64, multiplier: f64, max_delay_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay_ms,
        backoff_multiplier: multiplier,
        max_delay_ms,
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Real `now`, instant `sleep`; records every requested delay.
#[derive(Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// `sleep` blocks until the test calls [`GatedClock::release`].
///
/// Lets a test act between a failed attempt and the retry that would follow.
pub struct GatedClock {
    sleeps: Mutex<Vec<Duration>>,
    sleeping: Notify,
    gate: Semaphore,
}

impl GatedClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sleeps: Mutex::new(Vec::new()),
            sleeping: Notify::new(),
            gate: Semaphore::new(0),
        })
    }

    /// Resolves once some delivery has entered a backoff wait.
    pub async fn wait_for_sleep(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.sleeping.notified())
            .await
            .expect("no delivery entered backoff");
    }

    /// Let one pending backoff wait finish.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for GatedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.sleeping.notify_one();
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

// ---------------------------------------------------------------------------
// CapturedRequest - for inspecting webhook requests
// ---------------------------------------------------------------------------

/// A captured HTTP request with body and headers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("body is not JSON")
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Responders
// ---------------------------------------------------------------------------

/// Captures incoming requests and answers with a fixed status and body.
#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    response_code: u16,
    response_body: Option<serde_json::Value>,
}

impl CaptureResponder {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_code: status,
            response_body: None,
        }
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.response_body = Some(body);
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for CaptureResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let captured = CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        };
        self.requests.lock().unwrap().push(captured);
        let template = ResponseTemplate::new(self.response_code);
        match &self.response_body {
            Some(body) => template.set_body_json(body.clone()),
            None => template,
        }
    }
}

/// Fails a specified number of times with 500, then returns 200.
#[derive(Clone)]
pub struct FailingResponder {
    attempt_count: Arc<AtomicU32>,
    failures_before_success: u32,
}

impl FailingResponder {
    pub fn fail_times(n: u32) -> Self {
        Self {
            attempt_count: Arc::new(AtomicU32::new(0)),
            failures_before_success: n,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count.load(Ordering::SeqCst)
    }
}

impl Respond for FailingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.attempt_count.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

/// Adds a delay before responding.
#[derive(Clone)]
pub struct DelayedResponder {
    delay_ms: u64,
}

impl DelayedResponder {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Respond for DelayedResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_delay(Duration::from_millis(self.delay_ms))
    }
}
