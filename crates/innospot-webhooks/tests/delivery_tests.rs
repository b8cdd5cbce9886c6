//! Integration tests for a single delivery attempt: headers, response
//! capture and failure classification.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::*;
use innospot_webhooks::models::{
    AttemptStatus, DeliveryFailure, DeliveryState, DeliveryTrigger, LogFilter,
};
use innospot_webhooks::services::delivery_service::{
    MAX_RESPONSE_BODY_BYTES, MAX_RESPONSE_BODY_CHARS,
};
use innospot_webhooks::services::DeliveryJob;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job(webhook_id: Uuid, payload: serde_json::Value) -> DeliveryJob {
    DeliveryJob {
        webhook_id,
        delivery_id: Uuid::new_v4(),
        event: PATENT_STATUS_CHANGED.to_string(),
        payload,
    }
}

#[tokio::test]
async fn test_success_writes_one_row_and_never_sleeps() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::new();
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let clock = RecordingClock::new();
    let t = test_system(clock.clone());
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            policy(3, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let payload = serde_json::json!({"patentId": "US123", "newStatus": "granted"});
    let job = job(webhook.id, payload.clone());
    let delivery_id = job.delivery_id;
    let outcome = t.system.scheduler.run(job).await;

    assert_eq!(outcome.state, DeliveryState::Succeeded);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.delivery_id, delivery_id);
    assert!(clock.sleeps().is_empty());
    assert_eq!(capture.request_count(), 1);

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row.success);
    assert_eq!(row.attempt, 1);
    assert_eq!(row.status, AttemptStatus::Succeeded);
    assert_eq!(row.trigger, DeliveryTrigger::Dispatch);
    assert_eq!(row.delivery_id, delivery_id);
    assert_eq!(row.payload, payload);
    assert_eq!(row.response.as_ref().map(|r| r.status), Some(200));
    assert!(row.error.is_none());
    assert!(row.failure().is_none());
}

#[tokio::test]
async fn test_delivery_headers_on_the_wire() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::new();
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let t = test_system(RecordingClock::new());
    let mut request = webhook_request(
        &format!("{}/hook", mock_server.uri()),
        &[PATENT_STATUS_CHANGED],
        policy(0, 1000, 2.0, 30_000),
    );
    request.headers = HashMap::from([("X-Tenant".to_string(), "acme".to_string())]);
    let webhook = t.system.registry.create(request).await.unwrap();

    let job = job(webhook.id, serde_json::json!({"patentId": "US123"}));
    let delivery_id = job.delivery_id;
    let before = chrono::Utc::now().timestamp();
    t.system.scheduler.run(job).await;
    let after = chrono::Utc::now().timestamp();

    let captured = &capture.requests()[0];
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert_eq!(captured.header("x-webhook-event"), Some(PATENT_STATUS_CHANGED));
    assert_eq!(
        captured.header("x-webhook-delivery"),
        Some(delivery_id.to_string().as_str())
    );
    assert_eq!(captured.header("x-tenant"), Some("acme"));

    let sent: i64 = captured
        .header("x-webhook-timestamp")
        .unwrap()
        .parse()
        .unwrap();
    assert!(sent >= before && sent <= after);
    assert_eq!(captured.body_json(), serde_json::json!({"patentId": "US123"}));
}

#[tokio::test]
async fn test_http_error_response_is_captured() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "boom"})),
        )
        .mount(&mock_server)
        .await;

    let t = test_system(RecordingClock::new());
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            policy(0, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let outcome = t.system.scheduler.run(job(webhook.id, serde_json::json!({}))).await;
    assert_eq!(outcome.state, DeliveryState::Exhausted);
    assert_eq!(outcome.attempts, 1);

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    let row = &rows[0];
    assert!(!row.success);
    assert_eq!(row.status, AttemptStatus::Exhausted);
    assert!(row.error.is_none());
    let response = row.response.as_ref().unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.body, serde_json::json!({"error": "boom"}));
    assert_eq!(row.failure(), Some(DeliveryFailure::Http { status: 500 }));
}

#[tokio::test]
async fn test_non_json_response_body_kept_as_text() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .mount(&mock_server)
        .await;

    let t = test_system(RecordingClock::new());
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            policy(0, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let outcome = t.system.scheduler.run(job(webhook.id, serde_json::json!({}))).await;
    assert_eq!(outcome.state, DeliveryState::Succeeded);

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    let response = rows[0].response.as_ref().unwrap();
    assert_eq!(response.status, 202);
    assert_eq!(response.body, serde_json::json!("queued"));
}

#[tokio::test]
async fn test_timeout_is_a_transport_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(DelayedResponder::new(3000))
        .mount(&mock_server)
        .await;

    let settings = innospot_webhooks::WebhookSettings {
        request_timeout: Duration::from_secs(1),
        ..test_settings()
    };
    let t = test_system_with(RecordingClock::new(), settings);
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            policy(0, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let outcome = t.system.scheduler.run(job(webhook.id, serde_json::json!({}))).await;
    assert_eq!(outcome.state, DeliveryState::Exhausted);
    assert_eq!(outcome.error.as_deref(), Some("Request timeout (1s)"));

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    let row = &rows[0];
    assert!(row.response.is_none());
    assert_eq!(
        row.failure(),
        Some(DeliveryFailure::Transport("Request timeout (1s)".to_string()))
    );
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_failure() {
    let t = test_system(RecordingClock::new());
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            "http://127.0.0.1:1/hook",
            &[PATENT_STATUS_CHANGED],
            policy(0, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let outcome = t.system.scheduler.run(job(webhook.id, serde_json::json!({}))).await;
    assert_eq!(outcome.state, DeliveryState::Exhausted);

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].response.is_none());
    assert!(rows[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("Connection failed"));
}

#[tokio::test]
async fn test_oversized_response_body_is_capped() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a".repeat(4 * 1024 * 1024)))
        .mount(&mock_server)
        .await;

    let t = test_system(RecordingClock::new());
    let webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            policy(0, 1000, 2.0, 30_000),
        ))
        .await
        .unwrap();

    let outcome = t.system.scheduler.run(job(webhook.id, serde_json::json!({}))).await;
    assert_eq!(outcome.state, DeliveryState::Succeeded);

    let rows = t
        .system
        .log
        .list_by_webhook(webhook.id, &LogFilter::default())
        .await
        .unwrap();
    let response = rows[0].response.as_ref().unwrap();
    assert_eq!(response.status, 200);
    match &response.body {
        serde_json::Value::String(body) => {
            assert_eq!(body.len(), MAX_RESPONSE_BODY_CHARS);
            assert!(body.len() < MAX_RESPONSE_BODY_BYTES);
        }
        other => panic!("unexpected body {other:?}"),
    }
}
