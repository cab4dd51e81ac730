//! Authentication error types.

use crate::db::StoreError;
use thiserror::Error;

/// Token codec errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed (empty secret or signer error)
    #[error("Failed to sign access token: {0}")]
    Signing(String),

    /// MAC did not verify
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Header declares an algorithm other than HS512
    #[error("Unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    /// Current time is at or past the embedded expiry
    #[error("Token expired")]
    Expired,

    /// Subject claim is not an owner identifier
    #[error("Malformed token claims")]
    MalformedClaims,

    /// Token could not be parsed at all
    #[error("Malformed token: {0}")]
    MalformedToken(String),
}

/// Error taxonomy exposed to callers
///
/// Callers only ever learn the kind, never the underlying store or codec
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedInput,
    Unauthenticated,
    DeviceMismatch,
    SessionNotFound,
    StorageFailure,
    NotificationFailure,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::DeviceMismatch => "device_mismatch",
            ErrorKind::SessionNotFound => "session_not_found",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::NotificationFailure => "notification_failure",
        }
    }

    /// Fixed client-facing message
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "Malformed request",
            ErrorKind::Unauthenticated => "Authentication failed",
            ErrorKind::DeviceMismatch => "Token refresh from a different device is not allowed",
            ErrorKind::SessionNotFound => "Session not found",
            ErrorKind::StorageFailure => "Internal server error",
            ErrorKind::NotificationFailure => "Notification failed",
        }
    }
}

/// Session service errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Refresh token is not valid transport encoding
    #[error("Malformed refresh token")]
    MalformedRefreshToken,

    /// Access token failed cryptographic or temporal checks
    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[source] TokenError),

    /// Refresh attempted from a different device; all owner sessions blocked
    #[error("Refresh attempted from a different device")]
    DeviceMismatch,

    /// No live session matches (expired, blocked, already rotated or unknown)
    #[error("Session not found")]
    SessionNotFound,

    /// Signing or storing a new session failed
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    /// Store update during refresh failed
    #[error("Session rotation failed: {0}")]
    Rotation(#[source] StoreError),

    /// Store update during logout failed
    #[error("Session revocation failed: {0}")]
    Revocation(#[source] StoreError),
}

impl AuthError {
    /// Taxonomy kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MalformedRefreshToken => ErrorKind::MalformedInput,
            AuthError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AuthError::DeviceMismatch => ErrorKind::DeviceMismatch,
            AuthError::SessionNotFound => ErrorKind::SessionNotFound,
            AuthError::TokenIssuance(_) | AuthError::Rotation(_) | AuthError::Revocation(_) => {
                ErrorKind::StorageFailure
            }
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store and codec details are dropped so callers cannot distinguish an
    /// expired session from a blocked or unknown one.
    pub fn client_message(&self) -> String {
        self.kind().message().to_string()
    }

    /// Whether the failure is on the server side (5xx-equivalent)
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::StorageFailure
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
