use std::time::Duration;

use crate::validation::UrlPolicy;

/// Longest accepted log retention (100 years).
pub const MAX_LOG_RETENTION_DAYS: u32 = 36_500;

/// Runtime settings for delivery, registry limits and log retention.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Upper bound on one delivery attempt.
    pub request_timeout: Duration,

    pub user_agent: String,

    /// Accept plain `http://` URLs. HTTPS is always accepted.
    pub allow_http: bool,

    /// Reject URLs that point at loopback/private/link-local hosts.
    pub block_private_hosts: bool,

    /// Maximum webhooks a single owner may register.
    pub max_webhooks_per_owner: usize,

    /// Log rows older than this are pruned by the worker.
    pub log_retention_days: u32,

    pub retention_interval: Duration,

    /// Buffer of the domain event broadcast channel.
    pub event_channel_capacity: usize,

    /// AES-256 key for authentication configs at rest. Only the Postgres
    /// store needs it.
    pub encryption_key: Option<[u8; 32]>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            user_agent: "innospot-webhooks/1.0".to_string(),
            allow_http: true,
            block_private_hosts: true,
            max_webhooks_per_owner: 25,
            log_retention_days: 30,
            retention_interval: Duration::from_secs(3600),
            event_channel_capacity: 1024,
            encryption_key: None,
        }
    }
}

impl WebhookSettings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load settings from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let defaults = Self::default();

        let request_timeout_secs: u64 = parse_or(&reader, "WEBHOOK_REQUEST_TIMEOUT_SECS", 10)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "WEBHOOK_REQUEST_TIMEOUT_SECS".into(),
                "must be greater than 0".into(),
            ));
        }

        let user_agent = reader("WEBHOOK_USER_AGENT").unwrap_or(defaults.user_agent);

        let allow_http = parse_or(&reader, "WEBHOOK_ALLOW_HTTP", defaults.allow_http)?;
        let block_private_hosts = parse_or(
            &reader,
            "WEBHOOK_BLOCK_PRIVATE_HOSTS",
            defaults.block_private_hosts,
        )?;
        let max_webhooks_per_owner = parse_or(
            &reader,
            "WEBHOOK_MAX_PER_OWNER",
            defaults.max_webhooks_per_owner,
        )?;
        let log_retention_days = parse_or(
            &reader,
            "WEBHOOK_LOG_RETENTION_DAYS",
            defaults.log_retention_days,
        )?;
        if log_retention_days > MAX_LOG_RETENTION_DAYS {
            return Err(ConfigError::InvalidValue(
                "WEBHOOK_LOG_RETENTION_DAYS".into(),
                format!("must be at most {MAX_LOG_RETENTION_DAYS}"),
            ));
        }
        let retention_interval_secs: u64 =
            parse_or(&reader, "WEBHOOK_RETENTION_INTERVAL_SECS", 3600)?;
        let event_channel_capacity: usize = parse_or(
            &reader,
            "WEBHOOK_EVENT_CHANNEL_CAPACITY",
            defaults.event_channel_capacity,
        )?;
        if event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "WEBHOOK_EVENT_CHANNEL_CAPACITY".into(),
                "must be greater than 0".into(),
            ));
        }

        let encryption_key = match reader("WEBHOOK_ENCRYPTION_KEY") {
            Ok(raw) => Some(parse_key(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            request_timeout: Duration::from_secs(request_timeout_secs),
            user_agent,
            allow_http,
            block_private_hosts,
            max_webhooks_per_owner,
            log_retention_days,
            retention_interval: Duration::from_secs(retention_interval_secs.max(1)),
            event_channel_capacity,
            encryption_key,
        })
    }

    #[must_use]
    pub fn url_policy(&self) -> UrlPolicy {
        UrlPolicy {
            allow_http: self.allow_http,
            block_private_hosts: self.block_private_hosts,
        }
    }
}

fn parse_or<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| {
        ConfigError::InvalidValue("WEBHOOK_ENCRYPTION_KEY".into(), e.to_string())
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        ConfigError::InvalidValue(
            "WEBHOOK_ENCRYPTION_KEY".into(),
            format!("expected 32 bytes (64 hex chars), got {}", b.len()),
        )
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
