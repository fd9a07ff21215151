//! Authentication error types.

use thiserror::Error;

/// Authentication errors
///
/// The variants stay distinguishable inside the core (the engine decides
/// whether to touch lockout counters based on them), while the HTTP layer
/// collapses them into a handful of status codes.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// A configured lifetime pushed a timestamp past the representable range
    #[error("Timestamp out of range")]
    TimeOutOfRange,

    /// Token signing failed
    #[error("Token signing failed: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// No user with the given email or id
    #[error("User not found")]
    UserNotFound,

    /// Wrong password for an existing account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is temporarily locked after repeated failures
    #[error("Account is locked, try again later")]
    AccountLocked,

    /// Email already exists
    #[error("Email already registered")]
    EmailTaken,

    /// Old password did not match during a password change
    #[error("Old password is incorrect")]
    WrongPassword,

    /// Malformed, expired, or tampered bearer token
    #[error("Invalid token")]
    InvalidToken,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and signing errors are sanitized so internals never reach the
    /// client.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_)
            | AuthError::TokenSigning(_)
            | AuthError::HashingFailed
            | AuthError::TimeOutOfRange => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error is a rejected login (unknown user, wrong password, or locked).
    pub fn is_login_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::UserNotFound | AuthError::InvalidCredentials | AuthError::AccountLocked
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_sanitizes_internal_errors() {
        let err = AuthError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(AuthError::HashingFailed.client_message(), "Internal server error");
        assert_eq!(AuthError::TimeOutOfRange.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_passes_domain_errors() {
        assert_eq!(AuthError::EmailTaken.client_message(), "Email already registered");
        assert_eq!(AuthError::WrongPassword.client_message(), "Old password is incorrect");
    }

    #[test]
    fn test_login_rejections() {
        assert!(AuthError::UserNotFound.is_login_rejection());
        assert!(AuthError::InvalidCredentials.is_login_rejection());
        assert!(AuthError::AccountLocked.is_login_rejection());
        assert!(!AuthError::EmailTaken.is_login_rejection());
        assert!(!AuthError::HashingFailed.is_login_rejection());
    }
}
