//! Signed, expiring bearer tokens.

use super::{
    clock::Clock,
    errors::{AuthError, AuthResult},
    models::TokenClaims,
};
use crate::config::TokenConfig;
use chrono::Duration;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;
use uuid::Uuid;

/// Issues and verifies HMAC-signed JWTs carrying a subject claim.
#[derive(Clone)]
pub struct TokenCodec {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
            clock,
        }
    }

    /// Sign a token for `subject` that expires `ttl` from now.
    ///
    /// Every token gets a random `jti`, so two tokens minted for the same
    /// subject within the same second are still distinct strings.
    ///
    /// # Errors
    ///
    /// * `AuthError::TimeOutOfRange` - `ttl` overflows the expiry timestamp
    pub fn issue(&self, subject: &str, ttl: Duration) -> AuthResult<String> {
        let now = self.clock.now();
        let expires = now.checked_add_signed(ttl).ok_or(AuthError::TimeOutOfRange)?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Short-lived token for bearer authentication
    pub fn issue_access(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, self.config.access_token_ttl)
    }

    /// Long-lived token for rotation
    pub fn issue_refresh(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, self.config.refresh_token_ttl)
    }

    /// Decode and check a token.
    ///
    /// Returns `None` for anything unusable: malformed input, bad signature,
    /// a different algorithm, or `exp` not strictly after the current time.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(self.config.algorithm);
        // Expiry is checked below against the injected clock, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .ok()?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            return None;
        }

        Some(claims)
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.config.access_token_ttl
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.config.refresh_token_ttl
    }
}
