//! Prometheus metrics for monitoring the auth service.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`) for scraping by monitoring systems. Without an installed
//! exporter every call here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration by route and status
//! - **Auth Metrics**: Operation outcomes, mass blocks, origin alerts
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ra_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::auth_operation("refresh", "ok");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Count a session operation by outcome (`ok` or an error code).
pub fn auth_operation(operation: &'static str, outcome: &str) {
    metrics::counter!("auth_operations_total",
        "operation" => operation,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count a refresh rejected for device mismatch (all owner sessions blocked).
pub fn sessions_mass_blocked() {
    metrics::counter!("sessions_mass_blocked_total").increment(1);
}

/// Count an origin change seen on refresh.
pub fn origin_change_alerts() {
    metrics::counter!("origin_change_alerts_total").increment(1);
}

/// Record the number of sessions removed by a purge run.
pub fn sessions_purged(count: u64) {
    metrics::counter!("sessions_purged_total").increment(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        auth_operation("login", "ok");
        sessions_mass_blocked();
        origin_change_alerts();
        sessions_purged(3);
    }
}
