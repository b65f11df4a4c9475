//! Session middleware
//!
//! Protected routes require a session token, sent either as
//! `Authorization: Bearer <token>` or in the `resumo_session` cookie.
//! The resolved user is stored in request extensions for handlers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use resumo_common::db::{User, UserStatus};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "resumo_session";

/// Authenticated user attached to a request
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    /// Raw token (needed for logout)
    pub token: String,
}

/// Extract the session token from headers
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

/// `Set-Cookie` value that clears the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the session user if the request carries a valid token.
///
/// Blocked users are treated as anonymous here; `require_session`
/// rejects them explicitly.
pub async fn optional_user(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<User>> {
    let Some(token) = extract_token(headers) else {
        return Ok(None);
    };
    let user = db::sessions::find_session_user(&state.db, &token).await?;
    Ok(user.filter(|u| u.status == UserStatus::Active))
}

/// Session middleware for protected routes
///
/// - missing, unknown or expired token → 401
/// - blocked user → 403
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user = db::sessions::find_session_user(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session is invalid or expired".to_string()))?;

    if user.status == UserStatus::Blocked {
        return Err(ApiError::Forbidden("Account is blocked".to_string()));
    }

    request.extensions_mut().insert(SessionUser { user, token });
    Ok(next.run(request).await)
}
