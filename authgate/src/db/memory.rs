//! In-memory `CredentialStore` for tests and local runs.
//!
//! One mutex guards all tables, so each trait method is atomic with respect
//! to every other call, matching the per-row guarantees of the SQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::repository::CredentialStore;
use crate::auth::{AuthError, AuthResult, Clock, FailedLogin, RefreshToken, SystemClock, User, UserId};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    next_user_id: UserId,
    next_token_id: i64,
}

/// Mutex-guarded maps standing in for the `users` and `refresh_tokens` tables
#[derive(Debug, Clone)]
pub struct MemoryCredentialStore {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` for `created_at` stamps.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }

    /// Number of stored refresh tokens belonging to `user_id`.
    pub async fn refresh_token_count(&self, user_id: UserId) -> usize {
        self.tables
            .lock()
            .await
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let mut tables = self.tables.lock().await;

        if tables.users.values().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: self.clock.now(),
            failed_login_attempts: 0,
            lockout_until: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn record_failed_login(
        &self,
        user_id: UserId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> AuthResult<FailedLogin> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(AuthError::UserNotFound)?;

        let attempts = user.failed_login_attempts + 1;
        if attempts >= threshold {
            user.failed_login_attempts = 0;
            user.lockout_until = Some(lockout_until);
        } else {
            user.failed_login_attempts = attempts;
        }

        Ok(FailedLogin {
            failed_login_attempts: user.failed_login_attempts,
            lockout_until: user.lockout_until,
        })
    }

    async fn reset_failed_logins(&self, user_id: UserId) -> AuthResult<()> {
        if let Some(user) = self.tables.lock().await.users.get_mut(&user_id) {
            user.failed_login_attempts = 0;
            user.lockout_until = None;
        }
        Ok(())
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()> {
        if let Some(user) = self.tables.lock().await.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken> {
        let mut tables = self.tables.lock().await;
        tables.next_token_id += 1;

        let record = RefreshToken {
            id: tables.next_token_id,
            user_id,
            token: token.to_string(),
            created_at: self.clock.now(),
            expires_at,
        };
        tables
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tables.lock().await.refresh_tokens.get(token).cloned())
    }

    async fn delete_refresh_token(&self, token: &str) -> AuthResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .refresh_tokens
            .remove(token)
            .is_some())
    }

    async fn health_check(&self) -> AuthResult<()> {
        Ok(())
    }
}
