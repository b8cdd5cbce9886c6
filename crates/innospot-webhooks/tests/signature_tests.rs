//! Integration tests for request authentication on the wire.
//!
//! A receiver must be able to reproduce the signature from the exact body
//! bytes it received.

mod common;

use common::*;
use hmac::{Hmac, Mac};
use innospot_webhooks::crypto::verify_signature;
use innospot_webhooks::error::WebhookError;
use innospot_webhooks::models::{AuthConfig, SignatureAlgorithm, TestFireRequest};
use innospot_webhooks::store::WebhookStore;
use sha2::Sha256;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn fire_with_auth(auth: AuthConfig) -> CapturedRequest {
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
        Default::default(),
    );
    request.authentication = auth;
    let webhook = t.system.registry.create(request).await.unwrap();

    let result = t
        .system
        .test_fire
        .test_fire(TestFireRequest {
            webhook_id: webhook.id,
            event: PATENT_STATUS_CHANGED.to_string(),
            payload: Some(serde_json::json!({
                "patentId": "EP1234567",
                "oldStatus": "pending",
                "newStatus": "granted",
                "note": "ünïcödé & spaces"
            })),
            timestamp: None,
        })
        .await
        .unwrap();
    assert!(result.success);

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);
    requests.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_sha256_signature_matches_independent_hmac() {
    let captured = fire_with_auth(AuthConfig::Signature {
        secret: SECRET_1.to_string(),
        algorithm: SignatureAlgorithm::Sha256,
        header_name: "X-Webhook-Signature".to_string(),
    })
    .await;

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(SECRET_1.as_bytes()).unwrap();
    mac.update(&captured.body);
    let expected = hex::encode(mac.finalize().into_bytes());

    assert_eq!(captured.header("x-webhook-signature"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_sha1_and_md5_signatures_verify() {
    for algorithm in [SignatureAlgorithm::Sha1, SignatureAlgorithm::Md5] {
        let captured = fire_with_auth(AuthConfig::Signature {
            secret: SECRET_1.to_string(),
            algorithm,
            header_name: "X-Hub-Signature".to_string(),
        })
        .await;

        let signature = captured.header("x-hub-signature").unwrap();
        assert!(verify_signature(algorithm, SECRET_1, &captured.body, signature));
        assert!(captured.header("x-webhook-signature").is_none());
    }
}

#[tokio::test]
async fn test_signature_fails_on_tampered_body() {
    let captured = fire_with_auth(AuthConfig::Signature {
        secret: SECRET_1.to_string(),
        algorithm: SignatureAlgorithm::Sha256,
        header_name: "X-Webhook-Signature".to_string(),
    })
    .await;

    let signature = captured.header("x-webhook-signature").unwrap();
    let mut tampered = captured.body.clone();
    tampered.push(b' ');
    assert!(!verify_signature(
        SignatureAlgorithm::Sha256,
        SECRET_1,
        &tampered,
        signature
    ));
    assert!(!verify_signature(
        SignatureAlgorithm::Sha256,
        "wrong-secret",
        &captured.body,
        signature
    ));
}

#[tokio::test]
async fn test_shared_secret_sent_verbatim() {
    let captured = fire_with_auth(AuthConfig::Secret {
        secret: SECRET_1.to_string(),
        header_name: "X-Webhook-Secret".to_string(),
    })
    .await;

    assert_eq!(captured.header("x-webhook-secret"), Some(SECRET_1));
    assert!(captured.header("authorization").is_none());
}

#[tokio::test]
async fn test_bearer_token_header() {
    let captured = fire_with_auth(AuthConfig::BearerToken {
        token: "tok_live_abc".to_string(),
    })
    .await;

    assert_eq!(captured.header("authorization"), Some("Bearer tok_live_abc"));
}

#[tokio::test]
async fn test_no_auth_sends_no_credentials() {
    let captured = fire_with_auth(AuthConfig::None).await;

    assert!(captured.header("authorization").is_none());
    assert!(captured.header("x-webhook-signature").is_none());
    assert!(captured.header("x-webhook-secret").is_none());
}

#[tokio::test]
async fn test_credential_header_cannot_replace_content_type() {
    let t = test_system(RecordingClock::new());

    for auth in [
        AuthConfig::Secret {
            secret: "s3cr3t".to_string(),
            header_name: "Content-Type".to_string(),
        },
        AuthConfig::Signature {
            secret: SECRET_1.to_string(),
            algorithm: SignatureAlgorithm::Sha256,
            header_name: "X-Webhook-Event".to_string(),
        },
    ] {
        let mut request = webhook_request(
            "https://hooks.example.com/innospot",
            &[PATENT_STATUS_CHANGED],
            Default::default(),
        );
        request.authentication = auth;
        let result = t.system.registry.create(request).await;
        assert!(matches!(result, Err(WebhookError::Configuration(_))));
    }
}

#[tokio::test]
async fn test_stored_credential_on_reserved_header_is_not_sent() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::new();
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let t = test_system(RecordingClock::new());
    let mut webhook = t
        .system
        .registry
        .create(webhook_request(
            &format!("{}/hook", mock_server.uri()),
            &[PATENT_STATUS_CHANGED],
            Default::default(),
        ))
        .await
        .unwrap();

    webhook.authentication = AuthConfig::Secret {
        secret: "s3cr3t".to_string(),
        header_name: "Content-Type".to_string(),
    };
    assert!(t.webhooks.update(&webhook).await.unwrap());

    let result = t
        .system
        .test_fire
        .test_fire(TestFireRequest {
            webhook_id: webhook.id,
            event: PATENT_STATUS_CHANGED.to_string(),
            payload: None,
            timestamp: None,
        })
        .await;

    assert!(matches!(result, Err(WebhookError::Configuration(_))));
    assert_eq!(capture.request_count(), 0);
    assert!(t.logs.is_empty().await);
}
