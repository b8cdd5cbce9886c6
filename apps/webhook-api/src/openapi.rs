//! `OpenAPI` documentation for the webhook API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use innospot_webhooks::catalog::WebhookEvent;
use innospot_webhooks::error::ErrorResponse;
use innospot_webhooks::handlers::webhooks::EventTypeListResponse;
use innospot_webhooks::models::{
    AttemptStatus, AuthConfig, AuthSummary, CreateWebhookRequest, DeliveryAttempt,
    DeliveryResponse, DeliveryStats, DeliveryTestResult, DeliveryTrigger, DispatchReceipt,
    DispatchResponse, RetryPolicy, SetActiveRequest, SignatureAlgorithm, TestWebhookBody,
    UpdateWebhookRequest, WebhookResponse, WebhookSummary,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "InnoSpot Webhooks API",
        version = "0.1.0",
        description = "Register webhooks, inspect delivery logs and fire events",
        license(name = "BSL-1.1")
    ),
    paths(
        innospot_webhooks::handlers::webhooks::create_webhook_handler,
        innospot_webhooks::handlers::webhooks::list_webhooks_handler,
        innospot_webhooks::handlers::webhooks::get_webhook_handler,
        innospot_webhooks::handlers::webhooks::update_webhook_handler,
        innospot_webhooks::handlers::webhooks::set_active_handler,
        innospot_webhooks::handlers::webhooks::delete_webhook_handler,
        innospot_webhooks::handlers::webhooks::summary_handler,
        innospot_webhooks::handlers::webhooks::list_event_types_handler,
        innospot_webhooks::handlers::logs::list_logs_handler,
        innospot_webhooks::handlers::logs::stats_handler,
        innospot_webhooks::handlers::events::test_webhook_handler,
        innospot_webhooks::handlers::events::dispatch_event_handler,
    ),
    components(schemas(
        WebhookEvent,
        EventTypeListResponse,
        ErrorResponse,
        SignatureAlgorithm,
        AuthConfig,
        AuthSummary,
        RetryPolicy,
        CreateWebhookRequest,
        UpdateWebhookRequest,
        SetActiveRequest,
        WebhookResponse,
        WebhookSummary,
        AttemptStatus,
        DeliveryTrigger,
        DeliveryResponse,
        DeliveryAttempt,
        DeliveryStats,
        TestWebhookBody,
        DeliveryTestResult,
        DispatchReceipt,
        DispatchResponse,
    )),
    tags(
        (name = "Webhooks", description = "Webhook registration and lifecycle"),
        (name = "Webhook Logs", description = "Delivery history and statistics"),
        (name = "Webhook Events", description = "Test-fire and event dispatch"),
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/openapi.json`.
pub fn openapi_router() -> Router {
    let doc = ApiDoc::openapi();
    Router::new().route(
        "/openapi.json",
        get(move || {
            let doc = doc.clone();
            async move { Json(doc) }
        }),
    )
}
