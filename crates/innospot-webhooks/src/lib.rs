//! Outbound webhook delivery for Innospot domain events.
//!
//! Provides a webhook registry, a static event catalog, signed delivery
//! (shared secret, HMAC or bearer token), exponential backoff retries with
//! cancellation on deactivation, an append-only delivery log, manual
//! test-fire, and an axum control surface.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;
pub mod system;
pub mod validation;
pub mod worker;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, WebhookSettings};
pub use error::WebhookError;
pub use router::{webhooks_router, WebhooksState};
pub use services::{DomainEvent, EventPublisher};
pub use system::WebhookSystem;
pub use worker::WebhookWorker;
