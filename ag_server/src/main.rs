//! Authentication server: registration, login with lockout, and rotating
//! refresh-token sessions over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use ag_server::{api, config::ServerConfig, logging, metrics};
use anyhow::{Context, Error};
use authgate::{
    AuthManager,
    db::{Database, PgCredentialStore},
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the authgate authentication server

USAGE:
  ag_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8000)
  DATABASE_URL                 PostgreSQL connection string
  SECRET_KEY                   Token signing secret (required, 32+ chars)
  ALGORITHM                    HS256, HS384 or HS512
  ACCESS_TOKEN_EXPIRE_MINUTES  Access token lifetime
  REFRESH_TOKEN_EXPIRE_DAYS    Refresh token lifetime
  LOCKOUT_THRESHOLD            Failed logins before lockout
  LOCKOUT_MINUTES              Lockout window
  METRICS_BIND                 Prometheus exporter address (optional)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;
    let database_url: Option<String> = pargs
        .opt_value_from_str("--db-url")
        .context("Invalid --db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url).context("Invalid configuration")?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on {}", metrics_bind);
    }

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply schema")?;
    info!("Database connected successfully");

    let store = Arc::new(PgCredentialStore::new(db.pool().clone()));
    let auth_manager = Arc::new(
        AuthManager::new(store, config.auth.clone()).context("Failed to build auth manager")?,
    );

    let app = api::create_router(api::AppState { auth_manager });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
