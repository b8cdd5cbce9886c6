//! Static catalog of event types the platform can emit.
//!
//! Webhooks subscribe to these by name. Each entry documents its payload
//! and carries an example used when an operator test-fires without a
//! custom payload.

use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

pub const PATENT_STATUS_CHANGED: &str = "patent.status.changed";
pub const SEARCH_COMPLETED: &str = "search.completed";
pub const ANALYSIS_READY: &str = "analysis.ready";

/// A named, documented domain event type.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WebhookEvent {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub payload_schema: Value,
    #[schema(value_type = Object)]
    pub example: Value,
}

/// All event types, in a stable order.
#[must_use]
pub fn catalog() -> Vec<WebhookEvent> {
    vec![
        WebhookEvent {
            name: PATENT_STATUS_CHANGED.to_string(),
            description: "Triggered when a patent status changes".to_string(),
            payload_schema: json!({
                "type": "object",
                "properties": {
                    "patentId": { "type": "string" },
                    "oldStatus": { "type": "string" },
                    "newStatus": { "type": "string" },
                    "timestamp": { "type": "string", "format": "date-time" }
                },
                "required": ["patentId", "oldStatus", "newStatus", "timestamp"]
            }),
            example: json!({
                "patentId": "US12345678",
                "oldStatus": "pending",
                "newStatus": "approved",
                "timestamp": "2024-01-15T10:30:00Z"
            }),
        },
        WebhookEvent {
            name: SEARCH_COMPLETED.to_string(),
            description: "Triggered when a patent search is completed".to_string(),
            payload_schema: json!({
                "type": "object",
                "properties": {
                    "searchId": { "type": "string" },
                    "query": { "type": "string" },
                    "resultCount": { "type": "integer" },
                    "timestamp": { "type": "string", "format": "date-time" }
                },
                "required": ["searchId", "query", "resultCount", "timestamp"]
            }),
            example: json!({
                "searchId": "search_123",
                "query": "artificial intelligence",
                "resultCount": 1250,
                "timestamp": "2024-01-15T10:30:00Z"
            }),
        },
        WebhookEvent {
            name: ANALYSIS_READY.to_string(),
            description: "Triggered when an AI analysis is ready".to_string(),
            payload_schema: json!({
                "type": "object",
                "properties": {
                    "analysisId": { "type": "string" },
                    "type": { "type": "string" },
                    "status": { "type": "string" },
                    "timestamp": { "type": "string", "format": "date-time" }
                },
                "required": ["analysisId", "type", "status", "timestamp"]
            }),
            example: json!({
                "analysisId": "analysis_456",
                "type": "prior_art",
                "status": "completed",
                "timestamp": "2024-01-15T10:30:00Z"
            }),
        },
    ]
}

/// Look up an event type by name.
#[must_use]
pub fn find(name: &str) -> Option<WebhookEvent> {
    catalog().into_iter().find(|e| e.name == name)
}

#[must_use]
pub fn is_known(name: &str) -> bool {
    matches!(name, PATENT_STATUS_CHANGED | SEARCH_COMPLETED | ANALYSIS_READY)
}
