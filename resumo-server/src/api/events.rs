//! Reading event endpoint

use axum::{extract::State, http::StatusCode, Extension, Json};
use resumo_common::db::ReadingEventKind;
use resumo_common::gamification::Activity;
use resumo_common::time;
use resumo_common::validation::FieldErrors;
use serde::{Deserialize, Serialize};

use crate::api::access::{load_item, require_access};
use crate::api::gamification::ActivityOutcomeView;
use crate::db;
use crate::extract::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEventRequest {
    pub item_id: Option<String>,
    pub kind: Option<String>,
    pub section_index: Option<i64>,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEventResponse {
    pub event_id: String,
    pub gamification: ActivityOutcomeView,
}

fn activity_for(kind: ReadingEventKind) -> Activity {
    match kind {
        ReadingEventKind::ItemOpened => Activity::ItemOpened,
        ReadingEventKind::SectionRead => Activity::SectionRead,
        ReadingEventKind::AudioListened => Activity::AudioListened,
    }
}

/// POST /api/reading-events
///
/// Every event advances the streak; points are only awarded the first
/// time a (item, kind, section) combination is logged.
pub async fn record_event(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiJson(request): ApiJson<ReadingEventRequest>,
) -> ApiResult<(StatusCode, Json<ReadingEventResponse>)> {
    let mut errors = FieldErrors::new();
    let item_id = request.item_id.unwrap_or_default();
    errors.check(!item_id.trim().is_empty(), "itemId", "is required");

    let kind = match request.kind.as_deref().map(str::parse::<ReadingEventKind>) {
        Some(Ok(kind)) => Some(kind),
        Some(Err(message)) => {
            errors.add("kind", message);
            None
        }
        None => {
            errors.add("kind", "is required");
            None
        }
    };
    if kind == Some(ReadingEventKind::SectionRead) && request.section_index.is_none() {
        errors.add("sectionIndex", "is required for section_read");
    }
    if let Some(duration) = request.duration_seconds {
        errors.check(duration >= 0, "durationSeconds", "must not be negative");
    }
    errors.into_result()?;
    let kind = kind.ok_or_else(|| ApiError::BadRequest("kind is required".to_string()))?;

    let item = load_item(&state, &item_id).await?;
    require_access(&state, &session.user, &item).await?;

    if let Some(index) = request.section_index {
        let section_count = db::items::section_count(&state.db, &item.guid).await?;
        let mut errors = FieldErrors::new();
        errors.check(
            index >= 0 && index < section_count.max(1),
            "sectionIndex",
            "is outside the item's sections",
        );
        errors.into_result()?;
    }

    let user_id = &session.user.guid;
    let mut tx = state.db.begin().await?;

    let repeat =
        db::events::has_prior_event(&mut tx, user_id, &item.guid, kind, request.section_index).await?;
    let event_id = db::events::insert_event(
        &mut tx,
        user_id,
        &item.guid,
        kind,
        request.section_index,
        request.duration_seconds,
    )
    .await?;
    let outcome = db::gamification::record_activity(
        &mut tx,
        user_id,
        activity_for(kind),
        time::today(),
        !repeat,
    )
    .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ReadingEventResponse {
            event_id,
            gamification: ActivityOutcomeView::from(outcome),
        }),
    ))
}
