//! Gamification profile and leaderboard endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use resumo_common::db::settings;
use resumo_common::gamification::{level_for_points, Badge};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::gamification::ActivityOutcome;
use crate::extract::ApiQuery;
use crate::error::ApiResult;
use crate::pagination::clamp_limit;
use crate::session::SessionUser;
use crate::AppState;

/// Upper bound for `?limit=` on the leaderboard
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Gamification effect of a single write, returned alongside it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutcomeView {
    pub points_awarded: i64,
    pub total_points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub new_badges: Vec<Badge>,
}

impl From<ActivityOutcome> for ActivityOutcomeView {
    fn from(outcome: ActivityOutcome) -> Self {
        Self {
            points_awarded: outcome.points_awarded,
            total_points: outcome.total_points,
            level: outcome.level,
            current_streak: outcome.current_streak,
            new_badges: outcome.new_badges,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub badge: Badge,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationProfile {
    pub points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub items_completed: i64,
    pub quiz_correct: i64,
    pub badges: Vec<BadgeView>,
    pub rank: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
    pub level: i64,
    pub longest_streak: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub my_rank: Option<i64>,
}

/// GET /api/gamification/me
pub async fn get_my_gamification(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Json<GamificationProfile>> {
    let user_id = &session.user.guid;
    let row = db::gamification::get_profile(&state.db, user_id).await?;
    let badges = db::gamification::badges(&state.db, user_id)
        .await?
        .into_iter()
        .map(|(badge, awarded_at)| BadgeView { badge, awarded_at })
        .collect();
    let rank = db::gamification::rank_of(&state.db, user_id).await?;

    let profile = match row {
        Some(row) => GamificationProfile {
            points: row.points,
            level: row.level,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            last_activity_date: row.last_activity_date,
            items_completed: row.items_completed,
            quiz_correct: row.quiz_correct,
            badges,
            rank,
        },
        None => GamificationProfile {
            points: 0,
            level: level_for_points(0),
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            items_completed: 0,
            quiz_correct: 0,
            badges,
            rank,
        },
    };

    Ok(Json(profile))
}

/// GET /api/leaderboard?limit=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let default_limit = settings::leaderboard_size(&state.db).await?;
    let limit = clamp_limit(query.limit, default_limit, MAX_LEADERBOARD_LIMIT);

    let entries = db::gamification::leaderboard(&state.db, limit)
        .await?
        .into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index as i64 + 1,
            user_id: row.user_id,
            display_name: row.display_name,
            points: row.points,
            level: row.level,
            longest_streak: row.longest_streak,
        })
        .collect();
    let my_rank = db::gamification::rank_of(&state.db, &session.user.guid).await?;

    Ok(Json(LeaderboardResponse { entries, my_rank }))
}
