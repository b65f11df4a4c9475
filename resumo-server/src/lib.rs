//! resumo-server library - book-summary reading service
//!
//! HTTP API over the shared SQLite database plus the maintenance
//! operations used by the `resumo-admin` binary.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod extract;
pub mod maintenance;
pub mod pagination;
pub mod session;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Root of the `audio/`, `pdf/` and `covers/` folders
    pub media_root: PathBuf,
    /// Server start time (for uptime)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, media_root: PathBuf) -> Self {
        Self {
            db,
            media_root,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Health, sign-in, catalog browsing and covers are public; everything
/// else goes through the session middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require a session)
    let protected = Router::new()
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/session", get(api::auth::current_session))
        .route("/api/access/check", get(api::access::check_access))
        .route("/api/items/:slug/content", get(api::items::get_item_content))
        .route(
            "/api/progress/:item_id",
            get(api::progress::get_progress).put(api::progress::save_progress),
        )
        .route("/api/continue-reading", get(api::progress::continue_reading))
        .route("/api/reading-events", post(api::events::record_event))
        .route("/api/gamification/me", get(api::gamification::get_my_gamification))
        .route("/api/leaderboard", get(api::gamification::get_leaderboard))
        .route("/api/quiz/:item_id", get(api::quiz::get_quiz))
        .route("/api/quiz/:item_id/answers", post(api::quiz::submit_answers))
        .route(
            "/api/user/preferences",
            get(api::preferences::get_preferences).post(api::preferences::update_preferences),
        )
        .route("/api/recommendations", get(api::recommendations::get_recommendations))
        .route("/api/sync-map/:item_id", get(api::sync_map::get_sync_map))
        .route("/media/audio/:file", get(api::media::serve_audio))
        .route("/media/pdf/:file", get(api::media::serve_pdf))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    // Public routes (no session)
    let public = Router::new()
        .route("/api/auth/local/register", post(api::auth::register))
        .route("/api/auth/local/login", post(api::auth::login))
        .route("/api/items", get(api::items::list_items))
        .route("/api/items/:slug", get(api::items::get_item))
        .route("/media/covers/:file", get(api::media::serve_cover))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
