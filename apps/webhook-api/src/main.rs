//! InnoSpot webhook API server.
//!
//! Serves the webhook control surface and runs the background worker that
//! turns published domain events into deliveries.

mod config;
mod openapi;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use innospot_webhooks::store::{
    DeliveryLogStore, MemoryDeliveryLogStore, MemoryWebhookStore, PgDeliveryLogStore,
    PgWebhookStore, WebhookStore,
};
use innospot_webhooks::{webhooks_router, SystemClock, WebhookSettings, WebhookSystem, WebhooksState};

use crate::config::ApiConfig;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,innospot_webhooks=debug")),
        )
        .init();

    let config = ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });
    let settings = WebhookSettings::from_env().unwrap_or_else(|e| {
        eprintln!("Webhook configuration error: {e}");
        std::process::exit(1);
    });

    info!(
        listen_addr = %config.listen_addr,
        persistent = config.database_url.is_some(),
        request_timeout_secs = settings.request_timeout.as_secs(),
        block_private_hosts = settings.block_private_hosts,
        "starting webhook api"
    );

    let (webhooks, logs) = build_stores(&config, &settings).await;

    let system = WebhookSystem::new(webhooks, logs, Arc::new(SystemClock), settings)
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialise webhook system: {e}");
            std::process::exit(1);
        });

    // Domain code publishes through this handle; the worker drains it.
    let (_publisher, worker) = system.event_pipeline();
    let worker_handle = tokio::spawn(worker.run());

    let app = webhooks_router(WebhooksState::new(system)).merge(openapi::openapi_router());

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {e}", config.listen_addr);
            std::process::exit(1);
        }
    };

    info!(listen_addr = %config.listen_addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    worker_handle.abort();
    info!("Server shutdown complete");
}

async fn build_stores(
    config: &ApiConfig,
    settings: &WebhookSettings,
) -> (Arc<dyn WebhookStore>, Arc<dyn DeliveryLogStore>) {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, webhooks and delivery logs are kept in memory");
        return (
            Arc::new(MemoryWebhookStore::new()),
            Arc::new(MemoryDeliveryLogStore::new()),
        );
    };

    let Some(encryption_key) = settings.encryption_key else {
        eprintln!("WEBHOOK_ENCRYPTION_KEY is required when DATABASE_URL is set");
        std::process::exit(1);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(database_url)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Database connection error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = innospot_db::run_migrations(&pool).await {
        eprintln!("Migration error: {e}");
        std::process::exit(1);
    }

    (
        Arc::new(PgWebhookStore::new(pool.clone(), encryption_key)),
        Arc::new(PgDeliveryLogStore::new(pool)),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
