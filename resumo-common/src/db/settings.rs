//! Settings database access
//!
//! Read/write runtime limits from the settings table (key-value store).
//! All settings are global, not per user.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

pub const FREE_ITEMS_LIMIT: &str = "free_items_limit";
pub const SESSION_TIMEOUT_SECONDS: &str = "session_timeout_seconds";
pub const LEADERBOARD_SIZE: &str = "leaderboard_size";
pub const CONTINUE_READING_LIMIT: &str = "continue_reading_limit";
pub const RECOMMENDATION_LIMIT: &str = "recommendation_limit";

/// Every setting with its default value
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (FREE_ITEMS_LIMIT, "3"),
    (SESSION_TIMEOUT_SECONDS, "2592000"), // 30 days
    (LEADERBOARD_SIZE, "10"),
    (CONTINUE_READING_LIMIT, "10"),
    (RECOMMENDATION_LIMIT, "6"),
];

/// Default for a known key
fn default_for(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// Read and parse a setting. `None` when absent or NULL.
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value.flatten() {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Setting '{}' has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T: Display>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .bind(crate::time::now())
    .execute(db)
    .await?;

    Ok(())
}

/// Read an integer setting, falling back to its default when missing or
/// unparsable
pub async fn get_i64(db: &SqlitePool, key: &str) -> Result<i64> {
    let fallback = default_for(key)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| Error::Config(format!("No default for setting '{}'", key)))?;

    match get_setting::<i64>(db, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(fallback),
        Err(Error::Config(msg)) => {
            warn!("{} - using default {}", msg, fallback);
            Ok(fallback)
        }
        Err(e) => Err(e),
    }
}

pub async fn free_items_limit(db: &SqlitePool) -> Result<i64> {
    Ok(get_i64(db, FREE_ITEMS_LIMIT).await?.max(0))
}

pub async fn session_timeout_seconds(db: &SqlitePool) -> Result<i64> {
    Ok(get_i64(db, SESSION_TIMEOUT_SECONDS).await?.max(60))
}

pub async fn leaderboard_size(db: &SqlitePool) -> Result<i64> {
    Ok(get_i64(db, LEADERBOARD_SIZE).await?.clamp(1, 100))
}

pub async fn continue_reading_limit(db: &SqlitePool) -> Result<i64> {
    Ok(get_i64(db, CONTINUE_READING_LIMIT).await?.clamp(1, 100))
}

pub async fn recommendation_limit(db: &SqlitePool) -> Result<i64> {
    Ok(get_i64(db, RECOMMENDATION_LIMIT).await?.clamp(1, 50))
}

/// Ensure every default setting exists.
///
/// Missing settings are created; NULL values are reset to the default.
pub async fn init_default_settings(db: &SqlitePool) -> Result<()> {
    for (key, default_value) in DEFAULT_SETTINGS {
        ensure_setting(db, key, default_value).await?;
    }
    Ok(())
}

async fn ensure_setting(db: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match existing {
        None => {
            // INSERT OR IGNORE: two processes may initialize concurrently
            sqlx::query("INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?, ?, ?)")
                .bind(key)
                .bind(default_value)
                .bind(crate::time::now())
                .execute(db)
                .await?;
            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ?, updated_at = ? WHERE key = ?")
                .bind(default_value)
                .bind(crate::time::now())
                .bind(key)
                .execute(db)
                .await?;
            warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}
