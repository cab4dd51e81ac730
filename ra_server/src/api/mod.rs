//! HTTP API for the auth service.
//!
//! # Modules
//!
//! - [`auth`]: Session endpoints (login, refresh, me, logout) and error mapping
//! - [`middleware`]: Bearer-token middleware and client context extraction
//! - [`request_id`]: Request correlation and per-request metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                  - Store health (public)
//! POST /api/v1/auth/login       - Start a session (public)
//! POST /api/v1/auth/refresh     - Rotate a refresh token (public)
//! GET  /api/v1/auth/me          - Current owner (auth required)
//! POST /api/v1/auth/logout      - Block all owner sessions (auth required)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ra_server::api::{create_router, AppState};
//! use rotating_auth::{AuthConfig, SessionManager};
//! use rotating_auth::db::MemorySessionRepository;
//! use rotating_auth::notify::NotificationHandle;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sessions = SessionManager::new(
//!     Arc::new(MemorySessionRepository::new()),
//!     &AuthConfig::new("an-access-secret-of-at-least-32-chars"),
//!     NotificationHandle::disabled(),
//! );
//! let state = AppState::new(Arc::new(sessions), None);
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use rotating_auth::{SessionService, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
///
/// # Fields
///
/// - `sessions`: Session lifecycle operations
/// - `database`: PostgreSQL handle for health checks; `None` for the memory backend
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionService>,
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(sessions: Arc<dyn SessionService>, database: Option<Database>) -> Self {
        Self { sessions, database }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    // Refresh is public: the access token may already have expired
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the session store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":"postgres","database":true,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
