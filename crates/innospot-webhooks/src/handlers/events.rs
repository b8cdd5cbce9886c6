//! Test-fire and dispatch handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::catalog;
use crate::error::{ApiResult, WebhookError};
use crate::models::{DeliveryTestResult, DispatchResponse, TestFireRequest, TestWebhookBody};
use crate::router::WebhooksState;

/// Fire one attempt at a webhook and return its result.
///
/// Delivery failures are reported in the body with status 200; only an
/// unknown webhook/event or an unusable authentication config is an error.
#[utoipa::path(
    post,
    path = "/webhooks/{id}/test",
    tag = "Webhook Events",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    request_body = TestWebhookBody,
    responses(
        (status = 200, description = "Attempt result", body = DeliveryTestResult),
        (status = 400, description = "Authentication config unusable"),
        (status = 404, description = "Webhook or event not found"),
    )
)]
pub async fn test_webhook_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TestWebhookBody>,
) -> ApiResult<Json<DeliveryTestResult>> {
    let result = state
        .system
        .test_fire
        .test_fire(TestFireRequest {
            webhook_id: id,
            event: body.event,
            payload: body.payload,
            timestamp: body.timestamp,
        })
        .await?;
    Ok(Json(result))
}

/// Dispatch an event occurrence to every subscribed, active webhook.
///
/// Returns once deliveries are started; outcomes land in the log.
#[utoipa::path(
    post,
    path = "/events/{event}/dispatch",
    tag = "Webhook Events",
    params(("event" = String, Path, description = "Catalog event name")),
    request_body(content = Object, description = "Event payload"),
    responses(
        (status = 202, description = "Deliveries started", body = DispatchResponse),
        (status = 404, description = "Unknown event"),
    )
)]
pub async fn dispatch_event_handler(
    State(state): State<WebhooksState>,
    Path(event): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<DispatchResponse>)> {
    if !catalog::is_known(&event) {
        return Err(WebhookError::UnknownEvent(event));
    }

    let deliveries = state
        .system
        .dispatcher
        .dispatch(&event, payload)
        .await?
        .iter()
        .map(|d| d.receipt())
        .collect();

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse { event, deliveries }),
    ))
}
