//! Reading progress endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use resumo_common::db::{settings, ReadingProgress};
use resumo_common::gamification::Activity;
use resumo_common::time;
use resumo_common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::access::{load_item, require_access};
use crate::api::gamification::ActivityOutcomeView;
use crate::db;
use crate::db::progress::ProgressUpdate;
use crate::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::session::SessionUser;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub item_id: String,
    pub section_index: i64,
    pub scroll_position: f64,
    pub audio_position_ms: i64,
    pub percent: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressView {
    /// Progress for an item the user never opened
    pub fn empty(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            section_index: 0,
            scroll_position: 0.0,
            audio_position_ms: 0,
            percent: 0.0,
            completed: false,
            completed_at: None,
            updated_at: None,
        }
    }
}

impl From<ReadingProgress> for ProgressView {
    fn from(progress: ReadingProgress) -> Self {
        Self {
            item_id: progress.item_id,
            section_index: progress.section_index,
            scroll_position: progress.scroll_position,
            audio_position_ms: progress.audio_position_ms,
            percent: progress.percent,
            completed: progress.completed_at.is_some(),
            completed_at: progress.completed_at,
            updated_at: Some(progress.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub section_index: Option<i64>,
    pub scroll_position: Option<f64>,
    pub audio_position_ms: Option<i64>,
    pub percent: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressResponse {
    pub progress: ProgressView,
    pub gamification: Option<ActivityOutcomeView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueReadingEntry {
    pub item_id: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub cover_file: Option<String>,
    pub section_index: i64,
    pub percent: f64,
    pub updated_at: DateTime<Utc>,
}

/// GET /api/progress/:item_id
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(item_id): ApiPath<String>,
) -> ApiResult<Json<ProgressView>> {
    let item = load_item(&state, &item_id).await?;

    let progress = db::progress::get(&state.db, &session.user.guid, &item.guid)
        .await?
        .map(ProgressView::from)
        .unwrap_or_else(|| ProgressView::empty(&item.guid));

    Ok(Json(progress))
}

fn validate_update(request: &SaveProgressRequest, section_count: i64) -> Result<ProgressUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();

    let max_section = (section_count - 1).max(0);
    match request.section_index {
        None => errors.add("sectionIndex", "is required"),
        Some(index) => errors.check(
            (0..=max_section).contains(&index),
            "sectionIndex",
            format!("must be between 0 and {}", max_section),
        ),
    }
    match request.scroll_position {
        None => errors.add("scrollPosition", "is required"),
        Some(position) => errors.check(
            (0.0..=1.0).contains(&position),
            "scrollPosition",
            "must be between 0 and 1",
        ),
    }
    match request.percent {
        None => errors.add("percent", "is required"),
        Some(percent) => errors.check(
            (0.0..=100.0).contains(&percent),
            "percent",
            "must be between 0 and 100",
        ),
    }
    if let Some(audio) = request.audio_position_ms {
        errors.check(audio >= 0, "audioPositionMs", "must not be negative");
    }

    errors.into_result()?;

    Ok(ProgressUpdate {
        section_index: request.section_index.unwrap_or_default(),
        scroll_position: request.scroll_position.unwrap_or_default(),
        audio_position_ms: request.audio_position_ms,
        percent: request.percent.unwrap_or_default(),
    })
}

/// PUT /api/progress/:item_id
///
/// The first update reaching 100% completes the item and awards points.
pub async fn save_progress(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(item_id): ApiPath<String>,
    ApiJson(request): ApiJson<SaveProgressRequest>,
) -> ApiResult<Json<SaveProgressResponse>> {
    let item = load_item(&state, &item_id).await?;
    require_access(&state, &session.user, &item).await?;

    let section_count = db::items::section_count(&state.db, &item.guid).await?;
    let update = validate_update(&request, section_count)?;

    let mut tx = state.db.begin().await?;
    let (progress, newly_completed) =
        db::progress::upsert(&mut tx, &session.user.guid, &item.guid, update).await?;

    let gamification = if newly_completed {
        let outcome = db::gamification::record_activity(
            &mut tx,
            &session.user.guid,
            Activity::ItemCompleted,
            time::today(),
            true,
        )
        .await?;
        Some(ActivityOutcomeView::from(outcome))
    } else {
        None
    };
    tx.commit().await?;

    if newly_completed {
        info!("User {} completed item {}", session.user.guid, item.slug);
    }

    Ok(Json(SaveProgressResponse {
        progress: ProgressView::from(progress),
        gamification,
    }))
}

/// GET /api/continue-reading
pub async fn continue_reading(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Json<Vec<ContinueReadingEntry>>> {
    let limit = settings::continue_reading_limit(&state.db).await?;
    let rows = db::progress::continue_reading(&state.db, &session.user.guid, limit).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| ContinueReadingEntry {
                item_id: row.item_id,
                slug: row.slug,
                title: row.title,
                author: row.author,
                cover_file: row.cover_file,
                section_index: row.section_index,
                percent: row.percent,
                updated_at: row.updated_at,
            })
            .collect(),
    ))
}
