//! CRUD handlers for webhook configurations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::{self, WebhookEvent};
use crate::error::ApiResult;
use crate::models::{
    CreateWebhookRequest, ListWebhooksQuery, SetActiveRequest, UpdateWebhookRequest,
    WebhookResponse, WebhookSummary,
};
use crate::router::WebhooksState;

/// Response body for the event catalog.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventTypeListResponse {
    pub event_types: Vec<WebhookEvent>,
}

/// Register a webhook.
#[utoipa::path(
    post,
    path = "/webhooks",
    tag = "Webhooks",
    request_body = CreateWebhookRequest,
    responses(
        (status = 201, description = "Webhook created", body = WebhookResponse),
        (status = 400, description = "Validation or configuration error"),
        (status = 409, description = "Webhook limit exceeded"),
    )
)]
pub async fn create_webhook_handler(
    State(state): State<WebhooksState>,
    Json(request): Json<CreateWebhookRequest>,
) -> ApiResult<(StatusCode, Json<WebhookResponse>)> {
    let webhook = state.system.registry.create(request).await?;
    Ok((StatusCode::CREATED, Json(webhook.into())))
}

/// List an owner's webhooks.
#[utoipa::path(
    get,
    path = "/webhooks",
    tag = "Webhooks",
    params(ListWebhooksQuery),
    responses(
        (status = 200, description = "Webhooks, newest first", body = Vec<WebhookResponse>),
    )
)]
pub async fn list_webhooks_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<ListWebhooksQuery>,
) -> ApiResult<Json<Vec<WebhookResponse>>> {
    let webhooks = state.system.registry.list(query.owner_id).await?;
    Ok(Json(webhooks.into_iter().map(Into::into).collect()))
}

/// Get a single webhook.
#[utoipa::path(
    get,
    path = "/webhooks/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    responses(
        (status = 200, description = "Webhook details", body = WebhookResponse),
        (status = 404, description = "Webhook not found"),
    )
)]
pub async fn get_webhook_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WebhookResponse>> {
    let webhook = state.system.registry.get(id).await?;
    Ok(Json(webhook.into()))
}

/// Partially update a webhook.
#[utoipa::path(
    patch,
    path = "/webhooks/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    request_body = UpdateWebhookRequest,
    responses(
        (status = 200, description = "Webhook updated", body = WebhookResponse),
        (status = 400, description = "Validation or configuration error"),
        (status = 404, description = "Webhook not found"),
    )
)]
pub async fn update_webhook_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWebhookRequest>,
) -> ApiResult<Json<WebhookResponse>> {
    let webhook = state.system.registry.update(id, request).await?;
    Ok(Json(webhook.into()))
}

/// Activate or deactivate a webhook.
#[utoipa::path(
    put,
    path = "/webhooks/{id}/active",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Activation changed", body = WebhookResponse),
        (status = 404, description = "Webhook not found"),
    )
)]
pub async fn set_active_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetActiveRequest>,
) -> ApiResult<Json<WebhookResponse>> {
    let webhook = state
        .system
        .registry
        .set_active(id, request.is_active)
        .await?;
    Ok(Json(webhook.into()))
}

/// Delete a webhook. Its delivery log is kept.
#[utoipa::path(
    delete,
    path = "/webhooks/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    responses(
        (status = 204, description = "Webhook deleted"),
        (status = 404, description = "Webhook not found"),
    )
)]
pub async fn delete_webhook_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.system.registry.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Webhook counts for an owner.
#[utoipa::path(
    get,
    path = "/webhooks/summary",
    tag = "Webhooks",
    params(ListWebhooksQuery),
    responses(
        (status = 200, description = "Total and active webhook counts", body = WebhookSummary),
    )
)]
pub async fn summary_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<ListWebhooksQuery>,
) -> ApiResult<Json<WebhookSummary>> {
    let summary = state.system.registry.summary(query.owner_id).await?;
    Ok(Json(summary))
}

/// List the event types webhooks can subscribe to.
#[utoipa::path(
    get,
    path = "/webhooks/event-types",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Event catalog", body = EventTypeListResponse),
    )
)]
pub async fn list_event_types_handler() -> Json<EventTypeListResponse> {
    Json(EventTypeListResponse {
        event_types: catalog::catalog(),
    })
}
