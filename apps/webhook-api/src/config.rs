use std::net::SocketAddr;

/// Process-level configuration for the webhook API.
///
/// Delivery tuning lives in [`innospot_webhooks::WebhookSettings`]; this
/// only covers where to listen and where to persist.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address for the HTTP server.
    pub listen_addr: SocketAddr,

    /// Postgres connection URL. Without it webhooks and logs are kept in
    /// memory and lost on restart.
    pub database_url: Option<String>,

    /// Maximum pooled database connections.
    pub max_db_connections: u32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let listen_addr = reader("WEBHOOK_API_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| {
                ConfigError::InvalidValue("WEBHOOK_API_LISTEN_ADDR".into(), e.to_string())
            })?;

        let database_url = reader("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let max_db_connections = reader("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".into(), e.to_string())
            })?;

        Ok(Self {
            listen_addr,
            database_url,
            max_db_connections,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
