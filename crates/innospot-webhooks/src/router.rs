//! Axum router setup for webhook endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{events, logs, webhooks};
use crate::system::WebhookSystem;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhooksState {
    pub system: WebhookSystem,
}

impl WebhooksState {
    #[must_use]
    pub fn new(system: WebhookSystem) -> Self {
        Self { system }
    }
}

/// Creates the webhook router with all routes.
pub fn webhooks_router(state: WebhooksState) -> Router {
    Router::new()
        // Registry
        .route(
            "/webhooks",
            post(webhooks::create_webhook_handler).get(webhooks::list_webhooks_handler),
        )
        .route("/webhooks/summary", get(webhooks::summary_handler))
        .route(
            "/webhooks/event-types",
            get(webhooks::list_event_types_handler),
        )
        .route(
            "/webhooks/:id",
            get(webhooks::get_webhook_handler)
                .patch(webhooks::update_webhook_handler)
                .delete(webhooks::delete_webhook_handler),
        )
        .route("/webhooks/:id/active", put(webhooks::set_active_handler))
        // Delivery log
        .route("/webhooks/:id/logs", get(logs::list_logs_handler))
        .route("/webhooks/:id/stats", get(logs::stats_handler))
        // Delivery
        .route("/webhooks/:id/test", post(events::test_webhook_handler))
        .route(
            "/events/:event/dispatch",
            post(events::dispatch_event_handler),
        )
        .with_state(state)
}
