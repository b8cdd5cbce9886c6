//! Postgres persistence for the webhook subsystem.
//!
//! Two tables back the delivery pipeline:
//! - `webhooks`: registered outbound endpoints
//! - `webhook_logs`: append-only record of every delivery attempt

pub mod error;
pub mod migrations;
pub mod models;

pub use error::DbError;
pub use migrations::run_migrations;
