//! # Rotating Auth
//!
//! Session authentication with short-lived signed access tokens and single-use,
//! device-bound refresh tokens.
//!
//! ## Core Modules
//!
//! - [`auth`]: Token codec, session manager and error taxonomy
//! - [`db`]: Session store trait with PostgreSQL and in-memory backends
//! - [`notify`]: Background delivery of origin-change alerts
//!
//! ## Example
//!
//! ```
//! use rotating_auth::auth::codec;
//! use std::time::Duration;
//!
//! let owner = uuid::Uuid::new_v4();
//! let token = codec::sign_access_token(owner, "secret", Duration::from_secs(60)).unwrap();
//! assert_eq!(codec::verify_access_token(&token, "secret").unwrap(), owner);
//! ```

/// Token issuance, rotation and validation.
pub mod auth;
pub use auth::{AuthConfig, AuthError, ErrorKind, SessionManager, SessionService, TokenPair};

/// Session persistence.
pub mod db;

/// Origin-change alerts.
pub mod notify;
