//! HTTP handlers for the webhook control surface.

pub mod events;
pub mod logs;
pub mod webhooks;
