//! Delivery log and stats handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{DeliveryAttempt, DeliveryStats, LogFilter};
use crate::router::WebhooksState;

/// List a webhook's delivery attempts, newest first.
///
/// Works for deleted webhooks too; their log is retained.
#[utoipa::path(
    get,
    path = "/webhooks/{id}/logs",
    tag = "Webhook Logs",
    params(
        ("id" = Uuid, Path, description = "Webhook ID"),
        LogFilter,
    ),
    responses(
        (status = 200, description = "Delivery attempts", body = Vec<DeliveryAttempt>),
    )
)]
pub async fn list_logs_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<LogFilter>,
) -> ApiResult<Json<Vec<DeliveryAttempt>>> {
    let attempts = state.system.log.list_by_webhook(id, &filter).await?;
    Ok(Json(attempts))
}

/// Success/failure counts and mean latency for a webhook.
#[utoipa::path(
    get,
    path = "/webhooks/{id}/stats",
    tag = "Webhook Logs",
    params(("id" = Uuid, Path, description = "Webhook ID")),
    responses(
        (status = 200, description = "Delivery statistics", body = DeliveryStats),
    )
)]
pub async fn stats_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeliveryStats>> {
    let stats = state.system.log.aggregate(id).await?;
    Ok(Json(stats))
}
