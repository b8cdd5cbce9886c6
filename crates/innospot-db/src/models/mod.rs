//! Row models for the webhook tables.

pub mod webhook;
pub mod webhook_log;

pub use webhook::{UpsertWebhook, WebhookRow};
pub use webhook_log::{CreateWebhookLog, WebhookLogAggregate, WebhookLogRow};
