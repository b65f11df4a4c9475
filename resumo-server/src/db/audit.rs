//! Audit log

use resumo_common::db::AuditEntry;
use resumo_common::{time, uuid_utils, Result};
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};

/// Append an audit row. `user_id` is `None` for admin CLI actions.
pub async fn record<'e, E>(executor: E, user_id: Option<&str>, action: &str, detail: Value) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO audit_log (guid, user_id, action, detail, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(uuid_utils::generate())
        .bind(user_id)
        .bind(action)
        .bind(detail.to_string())
        .bind(time::now())
        .execute(executor)
        .await?;
    Ok(())
}

/// Most recent entries for an action, newest first
pub async fn recent(pool: &SqlitePool, action: &str, limit: i64) -> Result<Vec<AuditEntry>> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        "SELECT * FROM audit_log WHERE action = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(action)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
