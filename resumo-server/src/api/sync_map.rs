//! Audio/text sync map endpoint

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use resumo_common::sync_map::SyncEntry;
use serde::Serialize;

use crate::api::access::{load_item, require_access};
use crate::db;
use crate::extract::ApiPath;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionUser;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMapResponse {
    pub item_id: String,
    pub audio_duration_ms: i64,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<SyncEntry>,
}

/// GET /api/sync-map/:item_id
///
/// Regenerates the stored map when it is missing or stale.
pub async fn get_sync_map(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(item_id): ApiPath<String>,
) -> ApiResult<Json<SyncMapResponse>> {
    let item = load_item(&state, &item_id).await?;
    require_access(&state, &session.user, &item).await?;

    let map = db::sync_maps::current(&state.db, &item.guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {} has no audio", item.guid)))?;

    Ok(Json(SyncMapResponse {
        item_id: map.item_id,
        audio_duration_ms: map.audio_duration_ms,
        generated_at: map.generated_at,
        entries: map.entries.0,
    }))
}
