//! Access token signing/verification and refresh secret helpers.
//!
//! Access tokens are HS512-signed JWTs carrying the owner id, issue time and
//! expiry. The algorithm is fixed: a token whose header names anything else is
//! rejected before its signature is looked at. Refresh secrets are random
//! strings; only their SHA-512 digest is ever persisted.

use super::{
    errors::TokenError,
    models::{AccessTokenClaims, OwnerId, RefreshMaterial},
};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use std::time::Duration;
use uuid::Uuid;

/// The only algorithm this codec signs with or accepts
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// Bytes of randomness in a refresh secret
pub const REFRESH_SECRET_BYTES: usize = 32;

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Sign an access token for `owner_id` valid for `ttl`.
pub fn sign_access_token(
    owner_id: OwnerId,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    sign_with_label(owner_id, None, secret, ttl)
}

/// Sign an access token that also records the session's refresh label.
pub fn sign_access_token_with_label(
    owner_id: OwnerId,
    label: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    sign_with_label(owner_id, Some(label.to_string()), secret, ttl)
}

fn sign_with_label(
    owner_id: OwnerId,
    label: Option<String>,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = AccessTokenClaims {
        sub: owner_id.to_string(),
        rti: label,
        exp: now.saturating_add(ttl_secs),
        iat: now,
    };
    sign_claims(&claims, secret)
}

/// Sign arbitrary claims with HS512.
///
/// Exposed for callers that need explicit timestamps.
pub fn sign_claims(claims: &AccessTokenClaims, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("empty signing secret".to_string()));
    }

    encode(
        &Header::new(ACCESS_TOKEN_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify an access token and return its owner.
pub fn verify_access_token(token: &str, secret: &str) -> Result<OwnerId, TokenError> {
    let claims = decode_access_claims(token, secret)?;
    Uuid::parse_str(&claims.sub).map_err(|_| TokenError::MalformedClaims)
}

/// Verify an access token and return all of its claims.
///
/// Checks, in order: declared algorithm, signature, expiry. The subject is
/// returned unparsed.
pub fn decode_access_claims(token: &str, secret: &str) -> Result<AccessTokenClaims, TokenError> {
    let declared = declared_algorithm(token)?;
    if declared != "HS512" {
        return Err(TokenError::UnexpectedAlgorithm(declared));
    }

    let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
    // Expiry is checked below with an inclusive bound and no leeway
    validation.validate_exp = false;
    validation.leeway = 0;

    let data = decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
        JwtErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm(declared.clone()),
        JwtErrorKind::ExpiredSignature => TokenError::Expired,
        JwtErrorKind::Json(_) | JwtErrorKind::MissingRequiredClaim(_) => {
            TokenError::MalformedClaims
        }
        _ => TokenError::MalformedToken(e.to_string()),
    })?;

    if Utc::now().timestamp() >= data.claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(data.claims)
}

/// Read the `alg` field of the header without trusting anything else.
fn declared_algorithm(token: &str) -> Result<String, TokenError> {
    let header_b64 = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TokenError::MalformedToken("missing header".to_string()))?;

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| TokenError::MalformedToken(e.to_string()))?;

    let header: RawHeader = serde_json::from_slice(&header_json)
        .map_err(|e| TokenError::MalformedToken(e.to_string()))?;

    Ok(header.alg)
}

/// Generate a random refresh secret and an independent audit label.
pub fn generate_refresh_secret() -> RefreshMaterial {
    let mut bytes = [0u8; REFRESH_SECRET_BYTES];
    rand::rng().fill(&mut bytes);

    RefreshMaterial {
        secret: hex::encode(bytes),
        label: Uuid::new_v4().to_string(),
    }
}

/// Compute the SHA-512 hex digest of a refresh secret.
///
/// This is the store lookup key.
pub fn hash_refresh_secret(secret: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encode a refresh secret for transport.
pub fn encode_refresh_token(secret: &str) -> String {
    STANDARD.encode(secret.as_bytes())
}

/// Decode a transport-encoded refresh token back into its secret.
pub fn decode_refresh_token(token: &str) -> Result<String, TokenError> {
    if token.is_empty() {
        return Err(TokenError::MalformedToken("empty refresh token".to_string()));
    }

    let bytes = STANDARD
        .decode(token)
        .map_err(|e| TokenError::MalformedToken(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| TokenError::MalformedToken(e.to_string()))
}
