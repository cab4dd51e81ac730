//! Session manager implementation.
//!
//! Refresh state machine for a single session:
//!
//! ```text
//! login ──► live ──refresh (same device)──► live (new digest)
//!            │
//!            ├──refresh (other device)──► blocked (with every owner session)
//!            ├──logout──────────────────► blocked (with every owner session)
//!            └──expiry──────────────────► dead (filtered at lookup)
//! ```
//!
//! The manager holds configuration and handles only; all session state lives
//! behind [`SessionRepository`].

use super::{
    codec,
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{NewSession, OwnerId, Rotation, TokenPair},
};
use crate::{
    db::{
        SessionRepository, StoreResult,
        timeouts::{with_long_timeout, with_timeout},
    },
    notify::{NotificationHandle, OriginChange},
};
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Session lifecycle operations exposed to the transport layer
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Start a session bound to `device_fingerprint` and return a token pair
    async fn login(
        &self,
        owner_id: OwnerId,
        device_fingerprint: &str,
        origin_address: &str,
    ) -> AuthResult<TokenPair>;

    /// Exchange a refresh token for a new pair, consuming the old one
    async fn refresh(
        &self,
        refresh_token: &str,
        device_fingerprint: &str,
        origin_address: &str,
    ) -> AuthResult<TokenPair>;

    /// Resolve the owner of an access token (no store lookup)
    fn validate(&self, access_token: &str) -> AuthResult<OwnerId>;

    /// Block every session of the access token's owner
    async fn logout(&self, access_token: &str) -> AuthResult<()>;
}

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    repo: Arc<dyn SessionRepository>,
    config: AuthConfig,
    notifications: NotificationHandle,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Session store
    /// * `config` - Secrets, lifetimes and store timeout
    /// * `notifications` - Queue for origin-change alerts
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        config: &AuthConfig,
        notifications: NotificationHandle,
    ) -> Self {
        Self {
            repo,
            config: config.clone(),
            notifications,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Delete expired sessions from the store
    ///
    /// Housekeeping only; lookups already ignore expired rows.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        with_long_timeout(self.repo.purge_expired()).await
    }

    /// Run a store call under the configured timeout
    async fn store<T, F>(&self, future: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        with_timeout(self.config.store_timeout, future).await
    }

    fn refresh_expiry(&self) -> i64 {
        let ttl = i64::try_from(self.config.refresh_token_ttl.as_secs()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_add(ttl)
    }

    fn issue_access_token(&self, owner_id: OwnerId, label: &str) -> AuthResult<String> {
        codec::sign_access_token_with_label(
            owner_id,
            label,
            &self.config.access_secret,
            self.config.access_token_ttl,
        )
        .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }
}

fn fingerprints_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[async_trait]
impl SessionService for SessionManager {
    /// # Errors
    ///
    /// * `AuthError::TokenIssuance` - Signing or storing the session failed
    async fn login(
        &self,
        owner_id: OwnerId,
        device_fingerprint: &str,
        origin_address: &str,
    ) -> AuthResult<TokenPair> {
        let material = codec::generate_refresh_secret();
        let access_token = self.issue_access_token(owner_id, &material.label)?;

        let session = NewSession {
            owner_id,
            refresh_token_hash: codec::hash_refresh_secret(&material.secret),
            refresh_token_id: material.label.clone(),
            device_fingerprint: device_fingerprint.to_string(),
            origin_address: origin_address.to_string(),
            expires_at: self.refresh_expiry(),
        };

        let session_id = self.store(self.repo.create(&session)).await.map_err(|e| {
            log::error!("Failed to store session for owner {}: {}", owner_id, e);
            AuthError::TokenIssuance(e.to_string())
        })?;

        log::info!(
            "Created session {} for owner {} (refresh label {})",
            session_id,
            owner_id,
            material.label
        );

        Ok(TokenPair {
            access_token,
            refresh_token: codec::encode_refresh_token(&material.secret),
        })
    }

    /// # Errors
    ///
    /// * `AuthError::MalformedRefreshToken` - Token is not valid transport encoding
    /// * `AuthError::SessionNotFound` - No live session holds this token
    /// * `AuthError::DeviceMismatch` - Different device; all owner sessions blocked
    /// * `AuthError::TokenIssuance` - Signing the new access token failed
    /// * `AuthError::Rotation` - Store lookup or update failed; old token still valid
    async fn refresh(
        &self,
        refresh_token: &str,
        device_fingerprint: &str,
        origin_address: &str,
    ) -> AuthResult<TokenPair> {
        let secret = codec::decode_refresh_token(refresh_token)
            .map_err(|_| AuthError::MalformedRefreshToken)?;
        let current_hash = codec::hash_refresh_secret(&secret);

        let session = self
            .store(self.repo.find_by_refresh_hash(&current_hash))
            .await
            .map_err(|e| {
                log::error!("Session lookup failed: {}", e);
                AuthError::Rotation(e)
            })?
            .ok_or(AuthError::SessionNotFound)?;

        if !fingerprints_match(&session.device_fingerprint, device_fingerprint) {
            match self.store(self.repo.block_all_for_owner(session.owner_id)).await {
                Ok(blocked) => log::warn!(
                    "Refresh of session {} from unrecognized device {:?}: blocked {} session(s) for owner {}",
                    session.id,
                    device_fingerprint,
                    blocked,
                    session.owner_id
                ),
                Err(e) => log::error!(
                    "Refresh of session {} from unrecognized device {:?}, but blocking sessions for owner {} failed: {}",
                    session.id,
                    device_fingerprint,
                    session.owner_id,
                    e
                ),
            }
            return Err(AuthError::DeviceMismatch);
        }

        if session.origin_address != origin_address {
            log::info!(
                "Session {} refreshed from new origin {} (previously {})",
                session.id,
                origin_address,
                session.origin_address
            );
            self.notifications.dispatch(OriginChange::new(
                session.owner_id,
                &session.origin_address,
                origin_address,
            ));
        }

        let material = codec::generate_refresh_secret();
        let access_token = self.issue_access_token(session.owner_id, &material.label)?;

        let rotation = Rotation {
            session_id: session.id,
            expected_hash: current_hash,
            new_hash: codec::hash_refresh_secret(&material.secret),
            new_token_id: material.label.clone(),
            origin_address: origin_address.to_string(),
            expires_at: self.refresh_expiry(),
        };

        let rotated = self.store(self.repo.rotate(&rotation)).await.map_err(|e| {
            log::error!("Failed to rotate session {}: {}", session.id, e);
            AuthError::Rotation(e)
        })?;

        if !rotated {
            // Lost the race against a concurrent refresh or a block
            log::warn!(
                "Session {} changed during refresh; rejecting stale token",
                session.id
            );
            return Err(AuthError::SessionNotFound);
        }

        log::debug!(
            "Rotated session {} (refresh label {} -> {})",
            session.id,
            session.refresh_token_id,
            material.label
        );

        Ok(TokenPair {
            access_token,
            refresh_token: codec::encode_refresh_token(&material.secret),
        })
    }

    /// # Errors
    ///
    /// * `AuthError::Unauthenticated` - Any signature, algorithm, expiry or claims failure
    fn validate(&self, access_token: &str) -> AuthResult<OwnerId> {
        codec::verify_access_token(access_token, &self.config.access_secret)
            .map_err(AuthError::Unauthenticated)
    }

    /// Issued access tokens stay valid until their own expiry; only refreshes
    /// are cut off.
    ///
    /// # Errors
    ///
    /// * `AuthError::Unauthenticated` - Access token is invalid
    /// * `AuthError::Revocation` - Store update failed
    async fn logout(&self, access_token: &str) -> AuthResult<()> {
        let owner_id = self.validate(access_token)?;

        let blocked = self
            .store(self.repo.block_all_for_owner(owner_id))
            .await
            .map_err(|e| {
                log::error!("Failed to block sessions for owner {}: {}", owner_id, e);
                AuthError::Revocation(e)
            })?;

        log::info!("Logout for owner {}: blocked {} session(s)", owner_id, blocked);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySessionRepository;
    use std::time::Duration;
    use uuid::Uuid;

    fn manager() -> (SessionManager, Arc<MemorySessionRepository>) {
        let repo = Arc::new(MemorySessionRepository::new());
        let config = AuthConfig::new("unit-test-secret-0123456789abcdef");
        let manager = SessionManager::new(repo.clone(), &config, NotificationHandle::disabled());
        (manager, repo)
    }

    #[test]
    fn test_fingerprints_match() {
        assert!(fingerprints_match("Chrome/1", "Chrome/1"));
        assert!(!fingerprints_match("Chrome/1", "Chrome/2"));
        assert!(!fingerprints_match("Chrome/1", "Chrome/10"));
        assert!(!fingerprints_match("", "curl/8"));
    }

    #[tokio::test]
    async fn test_login_stores_digest_not_secret() {
        let (manager, repo) = manager();
        let owner = Uuid::new_v4();

        let pair = manager.login(owner, "Chrome/1", "1.2.3.4").await.unwrap();
        let secret = codec::decode_refresh_token(&pair.refresh_token).unwrap();

        let sessions = repo.sessions_for_owner(owner);
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_ne!(session.refresh_token_hash, secret);
        assert_eq!(session.refresh_token_hash, codec::hash_refresh_secret(&secret));
        assert_eq!(session.device_fingerprint, "Chrome/1");
        assert_eq!(session.origin_address, "1.2.3.4");
        assert!(!session.blocked);
    }

    #[tokio::test]
    async fn test_access_token_carries_refresh_label() {
        let (manager, repo) = manager();
        let owner = Uuid::new_v4();

        let pair = manager.login(owner, "Chrome/1", "1.2.3.4").await.unwrap();
        let claims =
            codec::decode_access_claims(&pair.access_token, &manager.config().access_secret)
                .unwrap();

        let session = &repo.sessions_for_owner(owner)[0];
        assert_eq!(claims.rti.as_deref(), Some(session.refresh_token_id.as_str()));
    }

    #[tokio::test]
    async fn test_refresh_rotates_label_and_extends_expiry() {
        let (manager, repo) = manager();
        let owner = Uuid::new_v4();

        let pair = manager.login(owner, "Chrome/1", "1.2.3.4").await.unwrap();
        let before = repo.sessions_for_owner(owner)[0].clone();

        manager
            .refresh(&pair.refresh_token, "Chrome/1", "1.2.3.4")
            .await
            .unwrap();
        let after = repo.sessions_for_owner(owner)[0].clone();

        assert_eq!(before.id, after.id);
        assert_ne!(before.refresh_token_hash, after.refresh_token_hash);
        assert_ne!(before.refresh_token_id, after.refresh_token_id);
        assert!(after.expires_at >= before.expires_at);
    }

    #[tokio::test]
    async fn test_malformed_refresh_token() {
        let (manager, _) = manager();
        let err = manager
            .refresh("!!not-base64!!", "Chrome/1", "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedRefreshToken));
    }

    #[tokio::test]
    async fn test_login_fails_with_empty_secret() {
        let repo = Arc::new(MemorySessionRepository::new());
        let manager = SessionManager::new(
            repo.clone(),
            &AuthConfig::new(""),
            NotificationHandle::disabled(),
        );

        let err = manager
            .login(Uuid::new_v4(), "Chrome/1", "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenIssuance(_)));
        assert!(repo.is_empty(), "No session is stored when signing fails");
    }

    #[tokio::test]
    async fn test_purge_expired_passthrough() {
        let repo = Arc::new(MemorySessionRepository::new());
        let config = AuthConfig::new("unit-test-secret-0123456789abcdef")
            .with_refresh_ttl(Duration::ZERO);
        let manager = SessionManager::new(repo.clone(), &config, NotificationHandle::disabled());

        manager.login(Uuid::new_v4(), "Chrome/1", "1.2.3.4").await.unwrap();
        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert!(repo.is_empty());
    }
}
