//! Reading event log

use resumo_common::db::ReadingEventKind;
use resumo_common::{time, uuid_utils, Result};
use sqlx::SqliteConnection;

/// True if the same (user, item, kind, section) was already logged
pub async fn has_prior_event(
    conn: &mut SqliteConnection,
    user_id: &str,
    item_id: &str,
    kind: ReadingEventKind,
    section_index: Option<i64>,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM reading_events
            WHERE user_id = ? AND item_id = ? AND kind = ? AND section_index IS ?
        )
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(kind)
    .bind(section_index)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

pub async fn insert_event(
    conn: &mut SqliteConnection,
    user_id: &str,
    item_id: &str,
    kind: ReadingEventKind,
    section_index: Option<i64>,
    duration_seconds: Option<i64>,
) -> Result<String> {
    let guid = uuid_utils::generate();
    sqlx::query(
        r#"
        INSERT INTO reading_events (guid, user_id, item_id, kind, section_index, duration_seconds, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(user_id)
    .bind(item_id)
    .bind(kind)
    .bind(section_index)
    .bind(duration_seconds)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;
    Ok(guid)
}
