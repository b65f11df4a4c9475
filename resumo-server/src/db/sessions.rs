//! Session storage
//!
//! Only SHA-256 hashes of session tokens are stored.

use chrono::{DateTime, Utc};
use resumo_common::auth::{generate_session_token, hash_token};
use resumo_common::db::{settings, User};
use resumo_common::{time, Result};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

#[derive(Debug, FromRow)]
struct SessionRow {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

/// Start a session; returns the raw token and its expiry
pub async fn create_session(pool: &SqlitePool, user_id: &str) -> Result<(String, DateTime<Utc>)> {
    let timeout = settings::session_timeout_seconds(pool).await?;
    let token = generate_session_token();
    let now = time::now();
    let expires_at = time::after_seconds(now, timeout);

    sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok((token, expires_at))
}

/// Resolve a raw token to its user. Expired sessions are deleted.
pub async fn find_session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let token_hash = hash_token(token);

    let session = sqlx::query_as::<_, SessionRow>(
        "SELECT token_hash, expires_at FROM sessions WHERE token_hash = ?",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    if session.expires_at <= time::now() {
        debug!("Removing expired session");
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&session.token_hash)
            .execute(pool)
            .await?;
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT users.* FROM users JOIN sessions ON sessions.user_id = users.guid WHERE sessions.token_hash = ?",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

// Stored timestamps are RFC 3339 text; julianday() compares them as instants
const EXPIRED: &str = "julianday(expires_at) <= julianday(?)";

/// Number of sessions that expired at or before `now`
pub async fn count_expired_sessions(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sessions WHERE {}", EXPIRED))
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}

/// Delete every session that expired at or before `now`; returns how many
pub async fn delete_expired_sessions(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(&format!("DELETE FROM sessions WHERE {}", EXPIRED))
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
