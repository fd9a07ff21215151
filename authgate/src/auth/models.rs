//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
}

impl User {
    /// Whether a lockout is armed and still in the future at `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// Where the account sits in the lockout state machine at `now`.
    pub fn account_state(&self, now: DateTime<Utc>) -> AccountState {
        match self.lockout_until {
            Some(until) if until > now => AccountState::Locked { until },
            _ if self.failed_login_attempts > 0 => AccountState::SoftFailing {
                failures: self.failed_login_attempts,
            },
            _ => AccountState::Active,
        }
    }
}

/// Lockout state derived from the persisted counters.
///
/// There is no stored flag: `Locked` ends on its own once `until` passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Active,
    SoftFailing { failures: i32 },
    Locked { until: DateTime<Utc> },
}

/// Persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// A stored token is usable only while `expires_at` is in the future.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Counter state written back by a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedLogin {
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
}

/// Session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims carried by both access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // User email
    pub exp: i64,    // Expiration timestamp
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: 1,
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            failed_login_attempts: 0,
            lockout_until: None,
        }
    }

    #[test]
    fn test_account_state_transitions() {
        let now = Utc::now();
        let mut u = user();
        assert_eq!(u.account_state(now), AccountState::Active);

        u.failed_login_attempts = 3;
        assert_eq!(u.account_state(now), AccountState::SoftFailing { failures: 3 });

        u.failed_login_attempts = 0;
        u.lockout_until = Some(now + Duration::minutes(15));
        assert!(u.is_locked(now));
        assert!(matches!(u.account_state(now), AccountState::Locked { .. }));

        // Lock lapses on its own
        let later = now + Duration::minutes(16);
        assert!(!u.is_locked(later));
        assert_eq!(u.account_state(later), AccountState::Active);
    }

    #[test]
    fn test_lockout_boundary_is_strict() {
        let now = Utc::now();
        let mut u = user();
        u.lockout_until = Some(now);
        assert!(!u.is_locked(now), "lockout ending exactly now is not active");
    }

    #[test]
    fn test_refresh_token_expiry() {
        let now = Utc::now();
        let token = RefreshToken {
            id: 1,
            user_id: 1,
            token: "t".to_string(),
            created_at: now,
            expires_at: now + Duration::days(7),
        };
        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::days(7)));
    }

    #[test]
    fn test_user_serialization_hides_hash() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password_hash"));
    }
}
