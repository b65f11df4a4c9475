//! User preference storage

use resumo_common::db::UserPreferences;
use resumo_common::{time, Result};
use sqlx::SqlitePool;

/// Stored preferences, or defaults for users who never saved any
pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<UserPreferences> {
    let prefs = sqlx::query_as::<_, UserPreferences>("SELECT * FROM user_preferences WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(prefs.unwrap_or_else(|| UserPreferences::defaults_for(user_id)))
}

/// Write the full preference row; returns it with a fresh timestamp
pub async fn save(pool: &SqlitePool, mut prefs: UserPreferences) -> Result<UserPreferences> {
    prefs.updated_at = time::now();

    sqlx::query(
        r#"
        INSERT INTO user_preferences
            (user_id, preferred_format, font_size, theme, categories, daily_goal_minutes, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id) DO UPDATE SET
            preferred_format = excluded.preferred_format,
            font_size = excluded.font_size,
            theme = excluded.theme,
            categories = excluded.categories,
            daily_goal_minutes = excluded.daily_goal_minutes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&prefs.user_id)
    .bind(prefs.preferred_format)
    .bind(prefs.font_size)
    .bind(prefs.theme)
    .bind(&prefs.categories)
    .bind(prefs.daily_goal_minutes)
    .bind(prefs.updated_at)
    .execute(pool)
    .await?;

    Ok(prefs)
}
