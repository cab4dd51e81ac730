//! Token and session lifetime configuration.

use crate::db::timeouts::DEFAULT_QUERY_TIMEOUT;
use std::fmt;
use std::time::Duration;

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime (720 hours)
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(720 * 60 * 60);

/// Configuration passed into the session manager
///
/// Built once at startup and shared by reference; nothing here is read from
/// process-wide state.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA512 secret for access tokens
    pub access_secret: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// Refresh token (session) lifetime
    pub refresh_token_ttl: Duration,

    /// Upper bound for every session store call
    pub store_timeout: Duration,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes
    pub fn new(access_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            store_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the access token lifetime
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set the refresh token lifetime
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the store call timeout
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}
