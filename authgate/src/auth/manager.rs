//! Authentication manager implementation.

use super::{
    clock::{Clock, SystemClock},
    errors::{AuthError, AuthResult},
    models::{AccountState, SessionTokens, TokenClaims, User},
    password::PasswordHasher,
    tokens::TokenCodec,
};
use crate::{
    config::{AuthConfig, LockoutPolicy},
    db::CredentialStore,
};
use chrono::DateTime;
use std::sync::Arc;

/// Authentication manager
///
/// Owns the lockout state machine and the refresh-token lifecycle. Everything
/// it shares between requests is read-only, so clones are cheap and safe to
/// hand to every request handler.
#[derive(Clone)]
pub struct AuthManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenCodec,
    hasher: PasswordHasher,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl AuthManager {
    /// Create a new authentication manager using the system clock
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Hasher cost parameters are invalid
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> AuthResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a new authentication manager reading time from `clock`
    pub fn with_clock(
        store: Arc<dyn CredentialStore>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::new(&config.hasher)?;
        let tokens = TokenCodec::new(config.tokens, clock.clone());

        Ok(Self {
            store,
            tokens,
            hasher,
            lockout: config.lockout,
            clock,
        })
    }

    /// Register a new user
    ///
    /// The email is stored exactly as given.
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self.store.create_user(email, &password_hash).await?;

        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check credentials and drive the lockout state machine
    ///
    /// A locked account is rejected before the password is evaluated and its
    /// counters are left alone. An unknown email still pays for one password
    /// verification.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No account for `email`
    /// * `AuthError::AccountLocked` - Lockout window still open
    /// * `AuthError::InvalidCredentials` - Wrong password (failure recorded)
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            self.hasher.verify_dummy(password);
            return Err(AuthError::UserNotFound);
        };

        let now = self.clock.now();
        if let AccountState::Locked { until } = user.account_state(now) {
            log::warn!("Login attempt for account {} locked until {}", user.id, until);
            return Err(AuthError::AccountLocked);
        }

        if !self.hasher.verify(password, &user.password_hash) {
            let lockout_until = now
                .checked_add_signed(self.lockout.duration)
                .ok_or(AuthError::TimeOutOfRange)?;
            let outcome = self
                .store
                .record_failed_login(user.id, self.lockout.threshold, lockout_until)
                .await?;

            match outcome.lockout_until {
                Some(until) if until > now => {
                    log::warn!("Account {} locked until {}", user.id, until);
                }
                _ => log::debug!(
                    "Failed login for account {} ({} consecutive)",
                    user.id,
                    outcome.failed_login_attempts
                ),
            }
            return Err(AuthError::InvalidCredentials);
        }

        if user.failed_login_attempts != 0 || user.lockout_until.is_some() {
            self.store.reset_failed_logins(user.id).await?;
        }

        Ok(User {
            failed_login_attempts: 0,
            lockout_until: None,
            ..user
        })
    }

    /// Authenticate and start a session
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionTokens> {
        let user = self.authenticate(email, password).await?;
        self.issue_tokens(&user).await
    }

    /// Mint an access/refresh pair for `user` and persist the refresh token
    pub async fn issue_tokens(&self, user: &User) -> AuthResult<SessionTokens> {
        let access_token = self.tokens.issue_access(&user.email)?;
        let refresh_token = self.tokens.issue_refresh(&user.email)?;

        let expires_at = match self
            .tokens
            .verify(&refresh_token)
            .and_then(|claims| DateTime::from_timestamp(claims.exp, 0))
        {
            Some(at) => at,
            None => self
                .clock
                .now()
                .checked_add_signed(self.tokens.refresh_token_ttl())
                .ok_or(AuthError::TimeOutOfRange)?,
        };

        self.store
            .create_refresh_token(user.id, &refresh_token, expires_at)
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented token is consumed. `Ok(None)` covers every rejection:
    /// bad signature or embedded expiry, unknown or expired row, a user that
    /// no longer exists, or a concurrent caller that consumed it first.
    pub async fn rotate(&self, presented: &str) -> AuthResult<Option<SessionTokens>> {
        if self.tokens.verify(presented).is_none() {
            log::debug!("Refresh rejected: token failed verification");
            return Ok(None);
        }

        let Some(record) = self.store.find_refresh_token(presented).await? else {
            log::warn!("Refresh rejected: token not on record (revoked or reused)");
            return Ok(None);
        };

        if record.is_expired(self.clock.now()) {
            log::debug!("Refresh rejected: stored token {} expired", record.id);
            return Ok(None);
        }

        let Some(user) = self.store.find_user_by_id(record.user_id).await? else {
            return Ok(None);
        };

        if !self.store.delete_refresh_token(presented).await? {
            log::warn!("Refresh rejected: token {} consumed concurrently", record.id);
            return Ok(None);
        }

        self.issue_tokens(&user).await.map(Some)
    }

    /// Delete the matching refresh token if any
    pub async fn revoke(&self, refresh_token: &str) -> AuthResult<()> {
        self.store.delete_refresh_token(refresh_token).await?;
        Ok(())
    }

    /// Replace the password of `user` after checking the old one
    ///
    /// Returns `false` and leaves the stored hash untouched when `old` does
    /// not match. Refresh tokens issued before the change stay valid.
    pub async fn change_password(&self, user: &User, old: &str, new: &str) -> AuthResult<bool> {
        if !self.hasher.verify(old, &user.password_hash) {
            return Ok(false);
        }

        let password_hash = self.hasher.hash(new)?;
        self.store.update_password_hash(user.id, &password_hash).await?;

        log::info!("Password changed for user {}", user.id);
        Ok(true)
    }

    pub async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.store.find_user_by_email(email).await
    }

    /// Resolve the user behind an access token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Token failed verification
    /// * `AuthError::UserNotFound` - Subject no longer exists
    pub async fn current_user(&self, access_token: &str) -> AuthResult<User> {
        let claims = self
            .verify_access_token(access_token)
            .ok_or(AuthError::InvalidToken)?;

        self.store
            .find_user_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub fn verify_access_token(&self, token: &str) -> Option<TokenClaims> {
        self.tokens.verify(token)
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }
}
