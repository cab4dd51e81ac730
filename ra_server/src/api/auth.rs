//! Authentication API handlers.
//!
//! This module provides HTTP REST endpoints for the session lifecycle:
//! - Login to start a device-bound session for an owner
//! - Refresh to exchange a refresh token for a new pair
//! - Me to resolve the owner of an access token
//! - Logout to block every session of the owner
//!
//! Failures are returned as `{"error_code": ..., "error_message": ...}` with a
//! fixed, sanitized message per error kind.
//!
//! # Examples
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": "0b6c2a54-5d7e-4a53-9a53-2f1f5e0c8d11"}'
//! ```
//!
//! Refresh:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/auth/refresh \
//!   -H "Content-Type: application/json" \
//!   -d '{"refresh_token": "..."}'
//! ```

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rotating_auth::auth::{AuthError, ErrorKind, OwnerId, TokenPair};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AppState,
    middleware::{BearerToken, ClientContext},
    request_id::RequestId,
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub error_message: String,
}

/// Error returned by every handler and by the auth middleware
#[derive(Debug)]
pub enum ApiError {
    /// Request body could not be parsed
    MalformedBody(String),
    /// Session operation failed
    Auth(AuthError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MalformedBody(_) => ErrorKind::MalformedInput,
            ApiError::Auth(e) => e.kind(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        ApiError::Auth(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated | ErrorKind::SessionNotFound => StatusCode::UNAUTHORIZED,
        ErrorKind::DeviceMismatch => StatusCode::FORBIDDEN,
        ErrorKind::StorageFailure | ErrorKind::NotificationFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        match &self {
            ApiError::Auth(e) if e.is_internal() => {
                tracing::error!(error = %e, "Session operation failed")
            }
            ApiError::Auth(e) => tracing::debug!(error = %e, "Session operation rejected"),
            ApiError::MalformedBody(reason) => {
                tracing::debug!(reason = %reason, "Malformed request body")
            }
        }

        let body = ErrorResponse {
            error_code: kind.code().to_string(),
            error_message: kind.message().to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

fn record_outcome<T>(operation: &'static str, result: &Result<T, ApiError>) {
    match result {
        Ok(_) => metrics::auth_operation(operation, "ok"),
        Err(e) => metrics::auth_operation(operation, e.kind().code()),
    }
}

/// Start a session for an owner.
///
/// The session is bound to the caller's `User-Agent` and records its address.
///
/// # Request Body
///
/// ```json
/// { "user_id": "0b6c2a54-5d7e-4a53-9a53-2f1f5e0c8d11" }
/// ```
///
/// # Response
///
/// `200 OK` with `{"access_token": ..., "refresh_token": ...}`.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed `user_id`
/// - `500 Internal Server Error`: Token issuance failed
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    client: ClientContext,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let result = match payload {
        Ok(Json(payload)) => state
            .sessions
            .login(payload.user_id, &client.device_fingerprint, &client.origin_address)
            .await
            .map(|pair| {
                tracing::info!(
                    request_id = %request_id.as_str(),
                    user_id = %payload.user_id,
                    ip_address = %client.origin_address,
                    "Session started"
                );
                Json(pair)
            })
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    record_outcome("login", &result);
    result
}

/// Exchange a refresh token for a new token pair.
///
/// The presented refresh token is consumed. A refresh from a device other than
/// the one the session was started on blocks every session of the owner.
///
/// # Request Body
///
/// ```json
/// { "refresh_token": "NmQ3ZjBi..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Body or token encoding is malformed
/// - `401 Unauthorized`: Token unknown, used, blocked or expired
/// - `403 Forbidden`: Refresh from a different device
/// - `500 Internal Server Error`: Store failure (the token stays usable)
pub async fn refresh(
    State(state): State<AppState>,
    request_id: RequestId,
    client: ClientContext,
    payload: Result<Json<RefreshPayload>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let result = match payload {
        Ok(Json(payload)) => state
            .sessions
            .refresh(
                &payload.refresh_token,
                &client.device_fingerprint,
                &client.origin_address,
            )
            .await
            .map(Json)
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    if let Err(ApiError::Auth(AuthError::DeviceMismatch)) = &result {
        metrics::sessions_mass_blocked();
        logging::log_security_event(
            "device_mismatch",
            None,
            Some(&client.origin_address),
            &format!(
                "Refresh from unrecognized device {:?} (request {}); owner sessions blocked",
                client.device_fingerprint,
                request_id.as_str()
            ),
        );
    }

    record_outcome("refresh", &result);
    result
}

/// Return the owner of the presented access token.
///
/// # Response
///
/// `200 OK` with `{"user_id": "..."}`.
pub async fn me(Extension(owner_id): Extension<OwnerId>) -> Json<MeResponse> {
    Json(MeResponse { user_id: owner_id })
}

/// Block every session of the access token's owner.
///
/// Access tokens already issued remain valid until they expire.
///
/// # Response
///
/// `204 No Content`.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid access token
/// - `500 Internal Server Error`: Store failure
pub async fn logout(
    State(state): State<AppState>,
    request_id: RequestId,
    Extension(owner_id): Extension<OwnerId>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<StatusCode, ApiError> {
    let result = state
        .sessions
        .logout(&token)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(ApiError::from);

    if result.is_ok() {
        tracing::info!(
            request_id = %request_id.as_str(),
            user_id = %owner_id,
            "Owner logged out"
        );
    }

    record_outcome("logout", &result);
    result
}
