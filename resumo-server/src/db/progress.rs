//! Reading progress queries

use chrono::{DateTime, Utc};
use resumo_common::db::ReadingProgress;
use resumo_common::{time, Result};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// Values written by a progress update
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub section_index: i64,
    pub scroll_position: f64,
    pub audio_position_ms: Option<i64>,
    pub percent: f64,
}

/// Row of the "continue reading" shelf
#[derive(Debug, Clone, FromRow)]
pub struct ContinueReadingRow {
    pub item_id: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub cover_file: Option<String>,
    pub section_index: i64,
    pub percent: f64,
    pub updated_at: DateTime<Utc>,
}

pub async fn get(pool: &SqlitePool, user_id: &str, item_id: &str) -> Result<Option<ReadingProgress>> {
    let progress = sqlx::query_as::<_, ReadingProgress>(
        "SELECT * FROM reading_progress WHERE user_id = ? AND item_id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await?;
    Ok(progress)
}

/// Insert or update progress. Returns the stored row and whether this
/// update completed the item for the first time.
pub async fn upsert(
    conn: &mut SqliteConnection,
    user_id: &str,
    item_id: &str,
    update: ProgressUpdate,
) -> Result<(ReadingProgress, bool)> {
    let existing = sqlx::query_as::<_, ReadingProgress>(
        "SELECT * FROM reading_progress WHERE user_id = ? AND item_id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    let now = time::now();
    let previously_completed = existing.as_ref().and_then(|p| p.completed_at);
    let newly_completed = previously_completed.is_none() && update.percent >= 100.0;
    let completed_at = previously_completed.or(if newly_completed { Some(now) } else { None });
    let audio_position_ms = update
        .audio_position_ms
        .or(existing.as_ref().map(|p| p.audio_position_ms))
        .unwrap_or(0);

    sqlx::query(
        r#"
        INSERT INTO reading_progress
            (user_id, item_id, section_index, scroll_position, audio_position_ms, percent, completed_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, item_id) DO UPDATE SET
            section_index = excluded.section_index,
            scroll_position = excluded.scroll_position,
            audio_position_ms = excluded.audio_position_ms,
            percent = excluded.percent,
            completed_at = excluded.completed_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(update.section_index)
    .bind(update.scroll_position)
    .bind(audio_position_ms)
    .bind(update.percent)
    .bind(completed_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let stored = ReadingProgress {
        user_id: user_id.to_string(),
        item_id: item_id.to_string(),
        section_index: update.section_index,
        scroll_position: update.scroll_position,
        audio_position_ms,
        percent: update.percent,
        completed_at,
        updated_at: now,
    };

    Ok((stored, newly_completed))
}

/// Unfinished items, most recently read first
pub async fn continue_reading(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ContinueReadingRow>> {
    let rows = sqlx::query_as::<_, ContinueReadingRow>(
        r#"
        SELECT items.guid AS item_id, items.slug, items.title, items.author, items.cover_file,
               reading_progress.section_index, reading_progress.percent, reading_progress.updated_at
        FROM reading_progress
        JOIN items ON items.guid = reading_progress.item_id
        WHERE reading_progress.user_id = ?
          AND reading_progress.completed_at IS NULL
          AND items.published = 1
        ORDER BY reading_progress.updated_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
