//! Authentication middleware for protected endpoints.
//!
//! Validates the `Authorization: Bearer <token>` header, resolves the token
//! subject and injects the [`User`](authgate::User) into request extensions for downstream
//! handlers:
//!
//! ```rust,no_run
//! use authgate::User;
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user): Extension<User>) -> String {
//!     format!("Authenticated as {}", user.email)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use authgate::AuthError;

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;

/// Reject the request with 401 unless it carries a valid bearer token.
///
/// - **Missing or malformed header**: `Not authenticated`
/// - **Invalid or expired token**: `Invalid token`
/// - **Subject no longer exists**: 404 `User not found`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let user = match state.auth_manager.current_user(token).await {
        Ok(user) => user,
        Err(AuthError::InvalidToken) => {
            log_security_event("bearer_rejected", None, Some(token), "Invalid bearer token");
            return Err(ApiError::unauthorized("Invalid token"));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
