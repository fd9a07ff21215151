//! Settings for token signing, lockout policy, and password hashing.
//!
//! Everything has a documented default; `from_env` overrides from the
//! process environment and tests build configs directly with the `with_*`
//! helpers (shrinking TTLs and lockout windows instead of sleeping).

use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::fmt;

/// Default access token lifetime (30 minutes)
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

/// Consecutive failures that arm a lockout
pub const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;

/// Default lockout window (15 minutes)
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 15;

/// Minimum accepted signing secret length
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted access token lifetime (1 day)
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;

/// Longest accepted refresh token lifetime (1 year)
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Longest accepted lockout window (7 days)
pub const MAX_LOCKOUT_MINUTES: i64 = 7 * 24 * 60;

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret (`SECRET_KEY`)
    pub secret_key: String,
    /// Signing algorithm (`ALGORITHM`), HMAC family only
    pub algorithm: Algorithm,
    /// Access token lifetime (`ACCESS_TOKEN_EXPIRE_MINUTES`)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (`REFRESH_TOKEN_EXPIRE_DAYS`)
    pub refresh_token_ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

/// Brute-force lockout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that arm the lockout (`LOCKOUT_THRESHOLD`)
    pub threshold: i32,
    /// How long the account stays frozen (`LOCKOUT_MINUTES`)
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
            duration: Duration::minutes(DEFAULT_LOCKOUT_MINUTES),
        }
    }
}

/// Argon2id cost parameters and pepper
#[derive(Clone)]
pub struct HasherConfig {
    /// Server-side pepper appended before hashing (`PASSWORD_PEPPER`), may be empty
    pub pepper: String,
    /// Memory cost in KiB (`ARGON2_MEMORY_COST`)
    pub memory_cost_kib: u32,
    /// Iterations (`ARGON2_TIME_COST`)
    pub time_cost: u32,
    /// Lanes (`ARGON2_PARALLELISM`)
    pub parallelism: u32,
}

impl fmt::Debug for HasherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasherConfig")
            .field("pepper", &"<redacted>")
            .field("memory_cost_kib", &self.memory_cost_kib)
            .field("time_cost", &self.time_cost)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            pepper: String::new(),
            memory_cost_kib: argon2::Params::DEFAULT_M_COST,
            time_cost: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub tokens: TokenConfig,
    pub lockout: LockoutPolicy,
    pub hasher: HasherConfig,
}

impl AuthConfig {
    /// Configuration with all defaults and the given signing secret.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            tokens: TokenConfig {
                secret_key: secret_key.into(),
                algorithm: Algorithm::HS256,
                access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
                refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
            },
            lockout: LockoutPolicy::default(),
            hasher: HasherConfig::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.tokens.algorithm = algorithm;
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.tokens.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.tokens.refresh_token_ttl = ttl;
        self
    }

    pub fn with_lockout(mut self, threshold: i32, duration: Duration) -> Self {
        self.lockout = LockoutPolicy {
            threshold,
            duration,
        };
        self
    }

    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.hasher.pepper = pepper.into();
        self
    }

    /// Override Argon2 costs. Tests use tiny values to keep hashing fast.
    pub fn with_hasher_cost(mut self, memory_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        self.hasher.memory_cost_kib = memory_cost_kib;
        self.hasher.time_cost = time_cost;
        self.hasher.parallelism = parallelism;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `SECRET_KEY`: HMAC signing secret (required)
    /// - `ALGORITHM`: HS256, HS384 or HS512 (default: HS256)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default: 30)
    /// - `REFRESH_TOKEN_EXPIRE_DAYS` (default: 7)
    /// - `LOCKOUT_THRESHOLD` (default: 5)
    /// - `LOCKOUT_MINUTES` (default: 15)
    /// - `PASSWORD_PEPPER` (default: empty)
    /// - `ARGON2_MEMORY_COST`, `ARGON2_TIME_COST`, `ARGON2_PARALLELISM`
    ///
    /// # Errors
    ///
    /// Returns error if `SECRET_KEY` is missing, `ALGORITHM` is unknown, or a
    /// lifetime does not fit in a duration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] but reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").ok_or_else(|| ConfigError::MissingRequired {
            var: "SECRET_KEY".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let algorithm = match lookup("ALGORITHM") {
            Some(name) => name.parse::<Algorithm>().map_err(|_| ConfigError::Invalid {
                var: "ALGORITHM".to_string(),
                reason: format!("Unknown algorithm '{name}'"),
            })?,
            None => Algorithm::HS256,
        };

        let defaults = HasherConfig::default();

        Ok(Self {
            tokens: TokenConfig {
                secret_key,
                algorithm,
                access_token_ttl: duration_or(
                    &lookup,
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    DEFAULT_ACCESS_TOKEN_MINUTES,
                    Duration::try_minutes,
                )?,
                refresh_token_ttl: duration_or(
                    &lookup,
                    "REFRESH_TOKEN_EXPIRE_DAYS",
                    DEFAULT_REFRESH_TOKEN_DAYS,
                    Duration::try_days,
                )?,
            },
            lockout: LockoutPolicy {
                threshold: parse_or(&lookup, "LOCKOUT_THRESHOLD", DEFAULT_LOCKOUT_THRESHOLD),
                duration: duration_or(
                    &lookup,
                    "LOCKOUT_MINUTES",
                    DEFAULT_LOCKOUT_MINUTES,
                    Duration::try_minutes,
                )?,
            },
            hasher: HasherConfig {
                pepper: lookup("PASSWORD_PEPPER").unwrap_or_default(),
                memory_cost_kib: parse_or(&lookup, "ARGON2_MEMORY_COST", defaults.memory_cost_kib),
                time_cost: parse_or(&lookup, "ARGON2_TIME_COST", defaults.time_cost),
                parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", defaults.parallelism),
            },
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "SECRET_KEY".to_string(),
                reason: format!("Must be at least {MIN_SECRET_LEN} characters"),
            });
        }

        if !matches!(
            self.tokens.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                var: "ALGORITHM".to_string(),
                reason: "Only HS256, HS384 and HS512 are supported".to_string(),
            });
        }

        if self.tokens.access_token_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: "Must be positive".to_string(),
            });
        }

        if self.tokens.access_token_ttl > Duration::minutes(MAX_ACCESS_TOKEN_MINUTES) {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: format!("Must be at most {MAX_ACCESS_TOKEN_MINUTES}"),
            });
        }

        if self.tokens.refresh_token_ttl > Duration::days(MAX_REFRESH_TOKEN_DAYS) {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                reason: format!("Must be at most {MAX_REFRESH_TOKEN_DAYS}"),
            });
        }

        if self.tokens.refresh_token_ttl <= self.tokens.access_token_ttl {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                reason: "Must outlive the access token".to_string(),
            });
        }

        if self.lockout.threshold < 1 {
            return Err(ConfigError::Invalid {
                var: "LOCKOUT_THRESHOLD".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.lockout.duration <= Duration::zero() {
            return Err(ConfigError::Invalid {
                var: "LOCKOUT_MINUTES".to_string(),
                reason: "Must be positive".to_string(),
            });
        }

        if self.lockout.duration > Duration::minutes(MAX_LOCKOUT_MINUTES) {
            return Err(ConfigError::Invalid {
                var: "LOCKOUT_MINUTES".to_string(),
                reason: format!("Must be at most {MAX_LOCKOUT_MINUTES}"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a looked-up value, falling back to `default` when absent or unparseable
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a looked-up count of `unit`s into a duration
///
/// Absent or unparseable values fall back to `default`; a count too large to
/// represent is an error.
fn duration_or<F>(
    lookup: &F,
    key: &str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let count = parse_or(lookup, key, default);
    unit(count).ok_or_else(|| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("{count} is out of range"),
    })
}
