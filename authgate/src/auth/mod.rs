//! Authentication module providing registration, login with brute-force
//! lockout, and rotating refresh-token sessions.
//!
//! This module implements:
//! - Argon2id password hashing with an optional server-side pepper
//! - HMAC-signed JWT access tokens (30-minute default expiry)
//! - Single-use refresh tokens (7-day default expiry) persisted in a
//!   [`CredentialStore`](crate::db::CredentialStore)
//!
//! ## Example
//!
//! ```no_run
//! use authgate::auth::AuthManager;
//! use authgate::config::AuthConfig;
//! use authgate::db::MemoryCredentialStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryCredentialStore::new());
//!     let auth = AuthManager::new(store, AuthConfig::from_env()?)?;
//!
//!     auth.register("player@example.com", "SecurePass123").await?;
//!     let tokens = auth.login("player@example.com", "SecurePass123").await?;
//!     let rotated = auth.rotate(&tokens.refresh_token).await?;
//!     assert!(rotated.is_some());
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod tokens;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    AccountState, FailedLogin, RefreshToken, SessionTokens, TokenClaims, User, UserId,
};
pub use password::PasswordHasher;
pub use tokens::TokenCodec;
