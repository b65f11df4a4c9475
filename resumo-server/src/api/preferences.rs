//! User preference endpoints

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use resumo_common::db::{ReadingFormat, Theme, UserPreferences};
use resumo_common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Json as JsonColumn;

use crate::db;
use crate::extract::ApiJson;
use crate::error::ApiResult;
use crate::session::SessionUser;
use crate::AppState;

pub const FONT_SIZE_RANGE: (i64, i64) = (12, 32);
pub const DAILY_GOAL_RANGE: (i64, i64) = (1, 600);
pub const MAX_CATEGORIES: usize = 20;
pub const MAX_CATEGORY_CHARS: usize = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub preferred_format: ReadingFormat,
    pub font_size: i64,
    pub theme: Theme,
    pub categories: Vec<String>,
    pub daily_goal_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<UserPreferences> for PreferencesView {
    fn from(prefs: UserPreferences) -> Self {
        Self {
            preferred_format: prefs.preferred_format,
            font_size: prefs.font_size,
            theme: prefs.theme,
            categories: prefs.categories.0,
            daily_goal_minutes: prefs.daily_goal_minutes,
            updated_at: prefs.updated_at,
        }
    }
}

/// Partial update; absent fields keep their stored value.
///
/// Enum fields arrive as text so bad values become field errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub preferred_format: Option<String>,
    pub font_size: Option<i64>,
    pub theme: Option<String>,
    pub categories: Option<Vec<String>>,
    pub daily_goal_minutes: Option<i64>,
}

/// Validate `update` and apply it to `prefs`
pub fn apply_update(prefs: &mut UserPreferences, update: PreferencesUpdate) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(format) = update.preferred_format {
        match format.parse::<ReadingFormat>() {
            Ok(format) => prefs.preferred_format = format,
            Err(message) => errors.add("preferredFormat", message),
        }
    }

    if let Some(theme) = update.theme {
        match theme.parse::<Theme>() {
            Ok(theme) => prefs.theme = theme,
            Err(message) => errors.add("theme", message),
        }
    }

    if let Some(size) = update.font_size {
        let (min, max) = FONT_SIZE_RANGE;
        errors.check(
            (min..=max).contains(&size),
            "fontSize",
            format!("must be between {} and {}", min, max),
        );
        prefs.font_size = size;
    }

    if let Some(goal) = update.daily_goal_minutes {
        let (min, max) = DAILY_GOAL_RANGE;
        errors.check(
            (min..=max).contains(&goal),
            "dailyGoalMinutes",
            format!("must be between {} and {}", min, max),
        );
        prefs.daily_goal_minutes = goal;
    }

    if let Some(categories) = update.categories {
        let mut cleaned: Vec<String> = Vec::with_capacity(categories.len());
        for category in categories {
            let category = category.trim().to_string();
            if category.is_empty() || category.chars().count() > MAX_CATEGORY_CHARS {
                errors.add(
                    "categories",
                    format!("each category must be 1 to {} characters", MAX_CATEGORY_CHARS),
                );
                continue;
            }
            if !cleaned.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
                cleaned.push(category);
            }
        }
        errors.check(
            cleaned.len() <= MAX_CATEGORIES,
            "categories",
            format!("at most {} categories", MAX_CATEGORIES),
        );
        prefs.categories = JsonColumn(cleaned);
    }

    errors.into_result()
}

/// GET /api/user/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
) -> ApiResult<Json<PreferencesView>> {
    let prefs = db::preferences::get(&state.db, &session.user.guid).await?;
    Ok(Json(PreferencesView::from(prefs)))
}

/// POST /api/user/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiJson(update): ApiJson<PreferencesUpdate>,
) -> ApiResult<Json<PreferencesView>> {
    let mut prefs = db::preferences::get(&state.db, &session.user.guid).await?;
    apply_update(&mut prefs, update)?;

    let saved = db::preferences::save(&state.db, prefs).await?;
    db::audit::record(
        &state.db,
        Some(&session.user.guid),
        "preferences.updated",
        json!({
            "preferredFormat": saved.preferred_format,
            "fontSize": saved.font_size,
            "theme": saved.theme,
            "categories": saved.categories.0,
            "dailyGoalMinutes": saved.daily_goal_minutes,
        }),
    )
    .await?;

    Ok(Json(PreferencesView::from(saved)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut prefs = UserPreferences::defaults_for("u1");
        let update = PreferencesUpdate {
            theme: Some("dark".to_string()),
            ..Default::default()
        };
        apply_update(&mut prefs, update).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.font_size, UserPreferences::DEFAULT_FONT_SIZE);
        assert_eq!(prefs.preferred_format, ReadingFormat::Text);
    }

    #[test]
    fn test_all_errors_reported() {
        let mut prefs = UserPreferences::defaults_for("u1");
        let update = PreferencesUpdate {
            preferred_format: Some("video".to_string()),
            font_size: Some(99),
            theme: Some("neon".to_string()),
            categories: Some(vec!["".to_string()]),
            daily_goal_minutes: Some(0),
        };
        let errors = apply_update(&mut prefs, update).unwrap_err();
        for field in ["preferredFormat", "fontSize", "theme", "categories", "dailyGoalMinutes"] {
            assert!(errors.get(field).is_some(), "missing error for {}", field);
        }
    }

    #[test]
    fn test_categories_trimmed_and_deduplicated() {
        let mut prefs = UserPreferences::defaults_for("u1");
        let update = PreferencesUpdate {
            categories: Some(vec![
                " negocios ".to_string(),
                "Negocios".to_string(),
                "historia".to_string(),
            ]),
            ..Default::default()
        };
        apply_update(&mut prefs, update).unwrap();
        assert_eq!(prefs.categories.0, vec!["negocios", "historia"]);
    }
}
