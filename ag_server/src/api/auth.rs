//! Authentication API handlers.
//!
//! Endpoints for registration, login, token refresh, logout, password change,
//! and the current-user profile. Errors are JSON `{"detail": ...}` bodies.
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8000/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "player@example.com", "password": "Pass123!"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8000/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "player@example.com", "password": "Pass123!"}'
//! ```

use authgate::{AuthError, SessionTokens, User};
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, error::ApiError, extract::ApiJson};
use crate::{
    logging::log_security_event,
    metrics::{self, LoginOutcome},
};

/// Register and login body. The email is checked for shape only and kept
/// exactly as sent.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsPayload {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordPayload {
    pub old_password: String,
    pub new_password: String,
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

impl From<SessionTokens> for TokenResponse {
    fn from(tokens: SessionTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

/// Register a new user account.
///
/// # Response
///
/// `200 OK` with `{"id": 1, "email": "player@example.com"}`
///
/// # Errors
///
/// - `400 Bad Request`: Email already registered
/// - `422 Unprocessable Entity`: Malformed email or body
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CredentialsPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .auth_manager
        .register(&payload.email, &payload.password)
        .await?;

    metrics::registrations_total();
    Ok(Json(user.into()))
}

/// Authenticate a user and start a session.
///
/// # Response
///
/// `200 OK` with an access/refresh token pair and `"token_type": "bearer"`.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email, wrong password, or locked account.
///   The body is always `Invalid credentials` so the cause is not revealed.
/// - `422 Unprocessable Entity`: Malformed email or body
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CredentialsPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate()?;

    match state.auth_manager.login(&payload.email, &payload.password).await {
        Ok(tokens) => {
            metrics::login_attempt(LoginOutcome::Success);
            Ok(Json(tokens.into()))
        }
        Err(err) if err.is_login_rejection() => {
            let outcome = if matches!(err, AuthError::AccountLocked) {
                log_security_event(
                    "login_locked",
                    Some(&payload.email),
                    None,
                    "Login refused for locked account",
                );
                LoginOutcome::Locked
            } else {
                LoginOutcome::InvalidCredentials
            };
            metrics::login_attempt(outcome);
            Err(ApiError::unauthorized("Invalid credentials"))
        }
        Err(err) => {
            metrics::login_attempt(LoginOutcome::Error);
            Err(err.into())
        }
    }
}

/// Exchange a refresh token for a new pair.
///
/// The presented token is consumed; presenting it again fails.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, revoked, or already used token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rotated = state.auth_manager.rotate(&payload.refresh_token).await?;
    metrics::token_refresh(rotated.is_some());

    match rotated {
        Some(tokens) => Ok(Json(tokens.into())),
        None => {
            log_security_event(
                "refresh_rejected",
                None,
                Some(&payload.refresh_token),
                "Refresh token rejected",
            );
            Err(ApiError::unauthorized("Invalid refresh token"))
        }
    }
}

/// Revoke a refresh token.
///
/// Succeeds whether or not the token was on record.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_manager.revoke(&payload.refresh_token).await?;
    Ok(Json(MessageResponse {
        msg: "Logged out successfully.",
    }))
}

/// Change the authenticated user's password.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid bearer token
/// - `404 Not Found`: Token subject no longer exists
/// - `400 Bad Request`: Old password is incorrect
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(payload): ApiJson<ChangePasswordPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    let changed = state
        .auth_manager
        .change_password(&user, &payload.old_password, &payload.new_password)
        .await?;
    if !changed {
        return Err(AuthError::WrongPassword.into());
    }

    Ok(Json(MessageResponse {
        msg: "Password changed successfully.",
    }))
}

/// Profile of the authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}
