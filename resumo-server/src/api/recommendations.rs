//! Recommendation endpoint

use axum::{
    extract::State,
    Extension, Json,
};
use resumo_common::db::settings;
use resumo_common::recommend::{self, Candidate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db;
use crate::extract::ApiQuery;
use crate::error::ApiResult;
use crate::pagination::clamp_limit;
use crate::session::SessionUser;
use crate::AppState;

pub const MAX_RECOMMENDATIONS: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub item_id: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub cover_file: Option<String>,
    pub readers: i64,
    pub preferred_category: bool,
}

/// GET /api/recommendations?limit=
///
/// Published items the user has not started, preferred categories first.
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> ApiResult<Json<Vec<Recommendation>>> {
    let default_limit = settings::recommendation_limit(&state.db).await?;
    let limit = clamp_limit(query.limit, default_limit, MAX_RECOMMENDATIONS);

    let preferred = db::preferences::get(&state.db, &session.user.guid)
        .await?
        .categories
        .0;
    let rows = db::recommendations::candidates(&state.db, &session.user.guid).await?;

    let candidates = rows
        .iter()
        .map(|row| Candidate {
            item_id: row.item_id.clone(),
            title: row.title.clone(),
            category: row.category.clone(),
            readers: row.readers,
        })
        .collect();
    let mut by_id: HashMap<String, _> = rows.into_iter().map(|row| (row.item_id.clone(), row)).collect();

    let ranked = recommend::rank(candidates, &preferred, limit as usize);
    let recommendations = ranked
        .into_iter()
        .filter_map(|candidate| by_id.remove(&candidate.item_id))
        .map(|row| Recommendation {
            preferred_category: preferred
                .iter()
                .any(|c| c.to_lowercase() == row.category.to_lowercase()),
            item_id: row.item_id,
            slug: row.slug,
            title: row.title,
            author: row.author,
            category: row.category,
            cover_file: row.cover_file,
            readers: row.readers,
        })
        .collect();

    Ok(Json(recommendations))
}
