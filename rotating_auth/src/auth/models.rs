//! Session and token data models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner ID type (the authenticated principal)
pub type OwnerId = Uuid;

/// Session ID type, assigned by the store
pub type SessionId = i64;

/// Access/refresh token pair handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String, // Owner ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rti: Option<String>, // Refresh token label at issuance
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
}

/// Session model
///
/// One row per login. The raw refresh secret never appears here, only its
/// digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub owner_id: OwnerId,
    pub refresh_token_hash: String,
    pub refresh_token_id: String,
    pub device_fingerprint: String,
    pub origin_address: String,
    pub blocked: bool,
    pub expires_at: i64,
}

impl Session {
    /// Whether the session can still be exchanged at `now` (unix seconds)
    pub fn is_live(&self, now: i64) -> bool {
        !self.blocked && self.expires_at > now
    }
}

/// Input for creating a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub owner_id: OwnerId,
    pub refresh_token_hash: String,
    pub refresh_token_id: String,
    pub device_fingerprint: String,
    pub origin_address: String,
    pub expires_at: i64,
}

/// Compare-and-swap rotation of a session's refresh material.
///
/// Applied only while the session is live and still holds `expected_hash`.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub session_id: SessionId,
    pub expected_hash: String,
    pub new_hash: String,
    pub new_token_id: String,
    pub origin_address: String,
    pub expires_at: i64,
}

/// Freshly generated refresh material
///
/// `secret` goes to the client (transport-encoded); `label` is an audit
/// correlation id stored next to the digest.
#[derive(Clone)]
pub struct RefreshMaterial {
    pub secret: String,
    pub label: String,
}

impl std::fmt::Debug for RefreshMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshMaterial")
            .field("secret", &"[REDACTED]")
            .field("label", &self.label)
            .finish()
    }
}
