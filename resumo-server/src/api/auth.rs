//! Local sign-up, sign-in and session endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use resumo_common::access::subscription_active;
use resumo_common::auth::verify_password;
use resumo_common::db::{SubscriptionPlan, User, UserRole, UserStatus};
use resumo_common::validation::{is_plausible_email, normalize_email, FieldErrors};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::db;
use crate::extract::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::session::{clear_session_cookie, session_cookie, SessionUser};
use crate::AppState;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_DISPLAY_NAME_CHARS: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub plan: SubscriptionPlan,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Public view of a user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub subscription: SubscriptionInfo,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.guid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            status: user.status,
            subscription: SubscriptionInfo {
                plan: user.subscription_plan,
                expires_at: user.subscription_expires_at,
                active: subscription_active(
                    user.subscription_plan,
                    user.subscription_expires_at,
                    Utc::now(),
                ),
            },
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

async fn start_session(state: &AppState, user: &User) -> ApiResult<(SessionResponse, String)> {
    let (token, expires_at) = db::sessions::create_session(&state.db, &user.guid).await?;
    let cookie = session_cookie(&token, expires_at);
    Ok((
        SessionResponse {
            user: UserProfile::from(user),
            token,
            expires_at,
        },
        cookie,
    ))
}

/// POST /api/auth/local/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    let password = request.password.unwrap_or_default();
    let display_name = request.display_name.unwrap_or_default().trim().to_string();

    let mut errors = FieldErrors::new();
    errors.check(is_plausible_email(&email), "email", "must be a valid e-mail address");
    errors.check(
        password.chars().count() >= MIN_PASSWORD_CHARS,
        "password",
        format!("must be at least {} characters", MIN_PASSWORD_CHARS),
    );
    errors.check(!display_name.is_empty(), "displayName", "must not be empty");
    errors.check(
        display_name.chars().count() <= MAX_DISPLAY_NAME_CHARS,
        "displayName",
        format!("must be at most {} characters", MAX_DISPLAY_NAME_CHARS),
    );
    errors.into_result()?;

    let user = db::users::create_local_user(&state.db, &email, &display_name, &password)
        .await?
        .ok_or_else(|| ApiError::Conflict("E-mail is already registered".to_string()))?;

    db::audit::record(&state.db, Some(&user.guid), "auth.register", json!({ "email": email })).await?;
    info!("Registered user {}", user.guid);

    let (body, cookie) = start_session(&state, &user).await?;
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/auth/local/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    let password = request.password.unwrap_or_default();

    let invalid = || ApiError::Unauthorized("Invalid e-mail or password".to_string());
    let user = db::users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Password check task failed: {}", e)))?;
    if !verified {
        return Err(invalid());
    }

    if user.status == UserStatus::Blocked {
        return Err(ApiError::Forbidden("Account is blocked".to_string()));
    }

    db::audit::record(&state.db, Some(&user.guid), "auth.login", json!({})).await?;

    let (body, cookie) = start_session(&state, &user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Response> {
    db::sessions::delete_session(&state.db, &session.token).await?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear_session_cookie())]).into_response())
}

/// GET /api/auth/session
pub async fn current_session(Extension(session): Extension<SessionUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&session.user))
}
