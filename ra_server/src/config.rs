//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use rotating_auth::{
    auth::AuthConfig,
    db::DatabaseConfig,
    notify::{DEFAULT_QUEUE_CAPACITY, WebhookConfig},
};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Minimum access secret length (256-bit key material as hex or text)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter bind address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Where sessions are stored
    pub storage: StorageBackend,
    /// Database configuration (used by the postgres backend)
    pub database: DatabaseConfig,
    /// Token configuration
    pub security: SecurityConfig,
    /// Origin-change alert configuration
    pub notifications: NotificationConfig,
    /// Seconds between expired-session purges; 0 disables purging
    pub purge_interval_secs: u64,
}

/// Token-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// Access token signing secret (required)
    pub access_secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Session store call timeout in milliseconds
    pub store_timeout_ms: u64,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("access_secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .finish()
    }
}

/// Origin-change alert configuration
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Webhook endpoint; alerts are only logged when unset
    pub webhook_url: Option<String>,
    /// Webhook request timeout in seconds
    pub webhook_timeout_secs: u64,
    /// Pending alert queue capacity
    pub queue_capacity: usize,
}

impl NotificationConfig {
    pub fn webhook(&self) -> Option<WebhookConfig> {
        self.webhook_url
            .as_deref()
            .map(|url| WebhookConfig::new(url).with_timeout(self.webhook_timeout_secs))
    }
}

/// Session store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend '{}' (expected postgres or memory)", other),
            }),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional storage backend override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND", std::env::var("SERVER_BIND").ok())?
                .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8080))),
        };

        let metrics_bind = parse_addr("METRICS_BIND", std::env::var("METRICS_BIND").ok())?;

        let storage = match storage_override {
            Some(storage) => storage,
            None => std::env::var("STORAGE_BACKEND")
                .ok()
                .map(|v| v.parse::<StorageBackend>())
                .transpose()?
                .unwrap_or(StorageBackend::Postgres),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(database_url) = database_url_override {
            database.database_url = database_url;
        }

        // Security configuration (REQUIRED)
        let access_secret =
            std::env::var("JWT_ACCESS_SECRET").map_err(|_| ConfigError::MissingRequired {
                var: "JWT_ACCESS_SECRET".to_string(),
                hint: "Generate with: openssl rand -hex 32".to_string(),
            })?;

        let security = SecurityConfig {
            access_secret,
            access_ttl_secs: parse_env_or("JWT_ACCESS_TTL_SECS", 900),
            refresh_ttl_secs: parse_env_or("JWT_REFRESH_TTL_SECS", 2_592_000),
            store_timeout_ms: parse_env_or("STORE_TIMEOUT_MS", 5000),
        };

        let notifications = NotificationConfig {
            webhook_url: std::env::var("WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            webhook_timeout_secs: parse_env_or("WEBHOOK_TIMEOUT_SECS", 10),
            queue_capacity: parse_env_or("NOTIFY_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            storage,
            database,
            security,
            notifications,
            purge_interval_secs: parse_env_or("SESSION_PURGE_INTERVAL_SECS", 3600),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.access_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                var: "JWT_ACCESS_SECRET".to_string(),
                reason: format!("Must be at least {} characters", MIN_SECRET_LENGTH),
            });
        }

        if self.security.access_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_ACCESS_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.security.refresh_ttl_secs <= self.security.access_ttl_secs {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_TTL_SECS".to_string(),
                reason: format!(
                    "Must be greater than access token TTL ({})",
                    self.security.access_ttl_secs
                ),
            });
        }

        if self.security.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "STORE_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "NOTIFY_QUEUE_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &self.notifications.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: "WEBHOOK_URL".to_string(),
                    reason: "Must be an http:// or https:// URL".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Session manager configuration derived from the security settings
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.security.access_secret.clone())
            .with_access_ttl(Duration::from_secs(self.security.access_ttl_secs))
            .with_refresh_ttl(Duration::from_secs(self.security.refresh_ttl_secs))
            .with_store_timeout(Duration::from_millis(self.security.store_timeout_ms))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_addr(var: &str, value: Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .map(|v| {
            v.parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{}' is not an IP:PORT address", v),
            })
        })
        .transpose()
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
