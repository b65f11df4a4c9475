//! Recommendation candidates

use resumo_common::Result;
use sqlx::{FromRow, SqlitePool};

/// Published item the user has not started, with its reader count
#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub item_id: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub cover_file: Option<String>,
    pub readers: i64,
}

pub async fn candidates(pool: &SqlitePool, user_id: &str) -> Result<Vec<CandidateRow>> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT items.guid AS item_id, items.slug, items.title, items.author, items.category,
               items.cover_file,
               (SELECT COUNT(*) FROM reading_progress rp WHERE rp.item_id = items.guid) AS readers
        FROM items
        WHERE items.published = 1
          AND NOT EXISTS (
              SELECT 1 FROM reading_progress own
              WHERE own.item_id = items.guid AND own.user_id = ?
          )
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
