//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use authgate::{
    config::{AuthConfig, ConfigError},
    db::DatabaseConfig,
};
use std::net::SocketAddr;

/// Default HTTP bind address
pub const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token, lockout, and hashing settings
    pub auth: AuthConfig,
    /// Prometheus exporter address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// CLI overrides win over `SERVER_BIND` and `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, database_url_override, |key| {
            std::env::var(key).ok()
        })
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = bind_override
            .or_else(|| lookup("SERVER_BIND").and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND));

        let database = DatabaseConfig::from_lookup(|key| match key {
            "DATABASE_URL" => database_url_override.clone().or_else(|| lookup(key)),
            _ => lookup(key),
        })?;

        let auth = AuthConfig::from_lookup(&lookup)?;
        auth.validate()?;

        let metrics_bind = match lookup("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not a socket address"),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            auth,
            metrics_bind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "SECRET_KEY".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SECRET_KEY"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = ServerConfig::from_lookup(
            None,
            Some("postgres://cli@localhost/db".to_string()),
            lookup_from(&[
                ("SECRET_KEY", SECRET),
                ("DATABASE_URL", "postgres://env@localhost/db"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bind, SocketAddr::from(DEFAULT_BIND));
        assert_eq!(config.database.database_url, "postgres://cli@localhost/db");
        assert!(config.metrics_bind.is_none());
        assert_eq!(config.auth.lockout.threshold, 5);
    }

    #[test]
    fn test_env_bind_and_metrics() {
        let config = ServerConfig::from_lookup(
            None,
            None,
            lookup_from(&[
                ("SECRET_KEY", SECRET),
                ("DATABASE_URL", "postgres://env@localhost/db"),
                ("SERVER_BIND", "0.0.0.0:9000"),
                ("METRICS_BIND", "0.0.0.0:9100"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.metrics_bind.map(|a| a.port()), Some(9100));
        assert_eq!(config.database.database_url, "postgres://env@localhost/db");
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = ServerConfig::from_lookup(
            None,
            None,
            lookup_from(&[("DATABASE_URL", "postgres://env@localhost/db")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let err = ServerConfig::from_lookup(
            None,
            None,
            lookup_from(&[
                ("SECRET_KEY", "short"),
                ("DATABASE_URL", "postgres://env@localhost/db"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_bad_metrics_bind_is_rejected() {
        let err = ServerConfig::from_lookup(
            None,
            None,
            lookup_from(&[
                ("SECRET_KEY", SECRET),
                ("DATABASE_URL", "postgres://env@localhost/db"),
                ("METRICS_BIND", "nope"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
