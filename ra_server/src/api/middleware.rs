//! Authentication middleware and client context extraction.
//!
//! [`auth_middleware`] validates the `Authorization: Bearer <token>` header and
//! injects the owner ID into request extensions for downstream handlers:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use rotating_auth::auth::OwnerId;
//!
//! async fn protected_handler(Extension(owner_id): Extension<OwnerId>) -> String {
//!     format!("Authenticated as {}", owner_id)
//! }
//! # let _ = protected_handler;
//! ```
//!
//! [`ClientContext`] resolves the device fingerprint and origin address that
//! session operations are bound to.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, USER_AGENT},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use rotating_auth::auth::{AuthError, TokenError};
use std::convert::Infallible;
use std::net::SocketAddr;

use super::{AppState, auth::ApiError};

/// Origin recorded when no address can be determined
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// The raw bearer token of an authenticated request
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that validates access tokens and injects the owner ID.
///
/// # Behavior
///
/// - **Success**: Token valid → Injects `OwnerId` and [`BearerToken`] into request
///   extensions → Calls next handler
/// - **Missing header / invalid format**: `401 Unauthorized`
/// - **Invalid/expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| {
            AuthError::Unauthenticated(TokenError::MalformedToken(
                "missing bearer token".to_string(),
            ))
        })?
        .to_string();

    let owner_id = state.sessions.validate(&token)?;

    request.extensions_mut().insert(owner_id);
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}

/// Device fingerprint and origin address of the calling client
///
/// The fingerprint is the `User-Agent` header (empty when absent). The origin is
/// the first `X-Forwarded-For` entry, else `X-Real-IP`, else the socket peer
/// address, else `"unknown"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientContext {
    pub device_fingerprint: String,
    pub origin_address: String,
}

impl ClientContext {
    fn from_parts(parts: &Parts) -> Self {
        let device_fingerprint = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            device_fingerprint,
            origin_address: client_origin(&parts.headers, peer),
        }
    }
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn client_origin(headers: &HeaderMap, peer: Option<String>) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string)
        .or(peer)
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_origin_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let origin = client_origin(&headers, Some("127.0.0.1".to_string()));
        assert_eq!(origin, "203.0.113.7");
    }

    #[test]
    fn test_origin_falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_origin(&headers, Some("127.0.0.1".to_string())), "10.0.0.2");

        let headers = HeaderMap::new();
        assert_eq!(client_origin(&headers, Some("127.0.0.1".to_string())), "127.0.0.1");
        assert_eq!(client_origin(&headers, None), UNKNOWN_ORIGIN);
    }

    #[test]
    fn test_client_context_from_parts() {
        let (mut parts, _) = axum::http::Request::builder()
            .header(USER_AGENT, "Chrome/1")
            .body(())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        let context = ClientContext::from_parts(&parts);
        assert_eq!(context.device_fingerprint, "Chrome/1");
        assert_eq!(context.origin_address, "192.0.2.1");
    }

    #[test]
    fn test_client_context_without_user_agent() {
        let (parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();

        let context = ClientContext::from_parts(&parts);
        assert_eq!(context.device_fingerprint, "");
        assert_eq!(context.origin_address, UNKNOWN_ORIGIN);
    }
}
