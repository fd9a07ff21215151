//! # authgate
//!
//! Credential issuance and session management: users register with an email
//! and password, log in to receive a short-lived access token plus a
//! single-use refresh token, rotate refresh tokens, log out, and change their
//! password. Repeated failed logins lock an account for a fixed window.
//!
//! ## Core Modules
//!
//! - [`auth`]: Authentication engine, token codec, password hashing
//! - [`config`]: Token, lockout, and hasher settings
//! - [`db`]: Credential store trait with PostgreSQL and in-memory backends

pub mod auth;
pub mod config;
pub mod db;

pub use auth::{AuthError, AuthManager, AuthResult, SessionTokens, TokenClaims, User};
pub use config::{AuthConfig, ConfigError};
