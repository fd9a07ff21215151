//! Prometheus metrics for the authentication server.
//!
//! Counters are recorded unconditionally through the `metrics` facade; they
//! only leave the process once [`init_metrics`] has installed the exporter
//! (when `METRICS_BIND` is set).
//!
//! ```rust,no_run
//! use ag_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/auth/login", 200);
//! metrics::login_attempt(metrics::LoginOutcome::Success);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request. `path` is the route template, never the raw URI.
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

/// How a login attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    InvalidCredentials,
    Locked,
    Error,
}

impl LoginOutcome {
    fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Locked => "locked",
            Self::Error => "error",
        }
    }
}

/// Increment login attempts counter.
pub fn login_attempt(outcome: LoginOutcome) {
    metrics::counter!("auth_login_attempts_total",
        "outcome" => outcome.as_label()
    )
    .increment(1);
}

/// Increment refresh counter; `rotated` is false for every rejection.
pub fn token_refresh(rotated: bool) {
    let outcome = if rotated { "rotated" } else { "rejected" };
    metrics::counter!("auth_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Increment successful registrations counter.
pub fn registrations_total() {
    metrics::counter!("auth_registrations_total").increment(1);
}
