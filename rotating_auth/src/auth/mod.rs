//! Authentication module providing token issuance and rotating sessions.
//!
//! This module implements:
//! - HS512 JWT access tokens (15-minute default expiry)
//! - Opaque refresh tokens, stored only as SHA-512 digests and rotated on every use
//! - Device binding: a refresh from another device blocks every session of the owner
//! - Origin tracking with out-of-band alerts on address change
//!
//! ## Example
//!
//! ```no_run
//! use rotating_auth::auth::{AuthConfig, SessionManager, SessionService};
//! use rotating_auth::db::MemorySessionRepository;
//! use rotating_auth::notify::NotificationHandle;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("an-access-secret-of-at-least-32-chars");
//!     let sessions = SessionManager::new(
//!         Arc::new(MemorySessionRepository::new()),
//!         &config,
//!         NotificationHandle::disabled(),
//!     );
//!
//!     let owner = uuid::Uuid::new_v4();
//!     let pair = sessions.login(owner, "Mozilla/5.0", "203.0.113.7").await?;
//!     assert_eq!(sessions.validate(&pair.access_token)?, owner);
//!
//!     let rotated = sessions
//!         .refresh(&pair.refresh_token, "Mozilla/5.0", "203.0.113.7")
//!         .await?;
//!     assert_ne!(rotated.refresh_token, pair.refresh_token);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod errors;
pub mod manager;
pub mod models;

pub use config::AuthConfig;
pub use errors::{AuthError, AuthResult, ErrorKind, TokenError};
pub use manager::{SessionManager, SessionService};
pub use models::{
    AccessTokenClaims, NewSession, OwnerId, RefreshMaterial, Rotation, Session, SessionId,
    TokenPair,
};
