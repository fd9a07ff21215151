//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here picks those records up alongside the server's own `tracing` events.

use sha2::{Digest, Sha256};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG` (default `info,sqlx=warn,hyper=warn`).
///
/// ```no_run
/// use ag_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Short, non-reversible identifier for a bearer or refresh token.
///
/// Raw tokens never go to the log; this lets two log lines about the same
/// token be correlated.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Log security event with structured data
///
/// ```
/// use ag_server::logging::log_security_event;
///
/// log_security_event("login_locked", Some("a@x.com"), None, "Login refused while locked");
/// ```
pub fn log_security_event(
    event_type: &str,
    email: Option<&str>,
    token: Option<&str>,
    message: &str,
) {
    let fingerprint = token.map(token_fingerprint);
    tracing::warn!(
        event_type = event_type,
        email = email,
        token = fingerprint.as_deref(),
        "SECURITY: {}",
        message
    );
}

/// Log API request/response
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    tracing::info!(
        request_id = request_id,
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        "API request completed"
    );
}
