//! Database schema migrations
//!
//! Versioned migrations bring databases created by older releases up to
//! date without manual intervention. Applied versions are recorded in the
//! `schema_version` table and every migration is idempotent.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema or data change
//! 3. **Prefer ALTER TABLE / UPDATE** over DROP/CREATE so no data is lost

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        info!("✓ Migration v3 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: Add audio_position_ms column to reading_progress
///
/// **Background:** Progress rows originally tracked only the text position.
/// Audio bookmarks were added later.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add audio_position_ms column to reading_progress");

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('reading_progress') WHERE name = 'audio_position_ms'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  audio_position_ms column already exists - skipping");
        return Ok(());
    }

    match sqlx::query(
        "ALTER TABLE reading_progress ADD COLUMN audio_position_ms INTEGER NOT NULL DEFAULT 0",
    )
    .execute(pool)
    .await
    {
        Ok(_) => info!("  ✓ Added audio_position_ms column to reading_progress"),
        // Another process may have won the race
        Err(e) if e.to_string().contains("duplicate column") => {
            info!("  audio_position_ms column added concurrently - skipping");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Migration v2: Backfill user_gamification rows
///
/// **Background:** Users created before gamification shipped have no row,
/// which leaves them off the leaderboard.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Backfill user_gamification rows");

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO user_gamification (user_id, updated_at)
        SELECT guid, ? FROM users
        WHERE guid NOT IN (SELECT user_id FROM user_gamification)
        "#,
    )
    .bind(crate::time::now())
    .execute(pool)
    .await?;

    info!("  ✓ Created {} gamification rows", result.rows_affected());
    Ok(())
}

/// Migration v3: Normalize stored e-mails and slugs
///
/// **Background:** Early imports stored mixed-case e-mails and slugs with
/// spaces, so lookups by the normalized form missed them. Rows whose
/// normalized value collides with an existing row are left untouched and
/// reported.
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v3: Normalize e-mails and slugs");

    let emails = sqlx::query(
        "UPDATE OR IGNORE users SET email = lower(trim(email)) WHERE email != lower(trim(email))",
    )
    .execute(pool)
    .await?;

    let slugs = sqlx::query(
        r#"
        UPDATE OR IGNORE items SET slug = replace(lower(trim(slug)), ' ', '-')
        WHERE slug != replace(lower(trim(slug)), ' ', '-')
        "#,
    )
    .execute(pool)
    .await?;

    info!(
        "  ✓ Normalized {} e-mails and {} slugs",
        emails.rows_affected(),
        slugs.rows_affected()
    );

    let leftover_emails: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email != lower(trim(email))")
            .fetch_one(pool)
            .await?;
    if leftover_emails > 0 {
        warn!(
            "  {} e-mails could not be normalized (duplicate after normalization)",
            leftover_emails
        );
    }

    Ok(())
}
