//! Database initialization
//!
//! Opening a database always brings it to the current schema:
//! 1. Create tables that do not exist (idempotent)
//! 2. Run versioned migrations
//! 3. Ensure default settings

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout for lock contention between the server and the admin tool
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (creating if needed) the database file and bring it up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    prepare_database(&pool).await?;
    Ok(pool)
}

/// Fresh in-memory database with the full schema.
///
/// Uses exactly one connection that is never recycled: every connection
/// to `sqlite::memory:` is a separate database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    prepare_database(&pool).await?;
    Ok(pool)
}

/// Create tables, run migrations and ensure default settings
pub async fn prepare_database(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;

    // Accounts
    create_users_table(pool).await?;
    create_accounts_table(pool).await?;
    create_sessions_table(pool).await?;

    // Catalog
    create_items_table(pool).await?;
    create_summary_sections_table(pool).await?;
    create_audio_tracks_table(pool).await?;
    create_sync_maps_table(pool).await?;
    create_quiz_questions_table(pool).await?;

    // Per-user state
    create_reading_progress_table(pool).await?;
    create_reading_events_table(pool).await?;
    create_item_access_table(pool).await?;
    create_user_preferences_table(pool).await?;
    create_user_gamification_table(pool).await?;
    create_user_badges_table(pool).await?;
    create_quiz_answers_table(pool).await?;
    create_audit_log_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;
    crate::db::settings::init_default_settings(pool).await?;

    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#],
    )
    .await
}

/// Create the settings table
///
/// Stores runtime limits as key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TEXT NOT NULL
        )
        "#],
    )
    .await
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'reader' CHECK (role IN ('reader', 'admin')),
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'blocked')),
            subscription_plan TEXT NOT NULL DEFAULT 'free' CHECK (subscription_plan IN ('free', 'premium')),
            subscription_expires_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#],
    )
    .await
}

async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS accounts (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            provider TEXT NOT NULL,
            provider_account_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (provider, provider_account_id)
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id)",
        ],
    )
    .await
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
        ],
    )
    .await
}

/// Create the items table
///
/// One row per summarized book. Renditions hang off it: text sections,
/// an audio track, an optional PDF and a cover image.
pub async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS items (
            guid TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            category TEXT NOT NULL,
            synopsis TEXT NOT NULL DEFAULT '',
            cover_file TEXT,
            pdf_file TEXT,
            is_free INTEGER NOT NULL DEFAULT 0,
            published INTEGER NOT NULL DEFAULT 1,
            reading_minutes INTEGER NOT NULL DEFAULT 0 CHECK (reading_minutes >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_items_category ON items(category)",
        ],
    )
    .await
}

async fn create_summary_sections_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS summary_sections (
            guid TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL CHECK (position >= 0),
            heading TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            UNIQUE (item_id, position)
        )
        "#],
    )
    .await
}

async fn create_audio_tracks_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS audio_tracks (
            guid TEXT PRIMARY KEY,
            item_id TEXT NOT NULL UNIQUE REFERENCES items(guid) ON DELETE CASCADE,
            file_name TEXT NOT NULL,
            duration_ms INTEGER NOT NULL CHECK (duration_ms >= 0),
            created_at TEXT NOT NULL
        )
        "#],
    )
    .await
}

async fn create_sync_maps_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS sync_maps (
            item_id TEXT PRIMARY KEY REFERENCES items(guid) ON DELETE CASCADE,
            entries TEXT NOT NULL,
            audio_duration_ms INTEGER NOT NULL,
            generated_at TEXT NOT NULL
        )
        "#],
    )
    .await
}

async fn create_quiz_questions_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            guid TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            prompt TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            explanation TEXT
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_quiz_questions_item ON quiz_questions(item_id)",
        ],
    )
    .await
}

async fn create_reading_progress_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS reading_progress (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            section_index INTEGER NOT NULL DEFAULT 0,
            scroll_position REAL NOT NULL DEFAULT 0 CHECK (scroll_position >= 0 AND scroll_position <= 1),
            audio_position_ms INTEGER NOT NULL DEFAULT 0,
            percent REAL NOT NULL DEFAULT 0 CHECK (percent >= 0 AND percent <= 100),
            completed_at TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, item_id)
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_reading_progress_item ON reading_progress(item_id)",
        ],
    )
    .await
}

async fn create_reading_events_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS reading_events (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('item_opened', 'section_read', 'audio_listened')),
            section_index INTEGER,
            duration_seconds INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_reading_events_user_item ON reading_events(user_id, item_id)",
        ],
    )
    .await
}

async fn create_item_access_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS item_access (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            first_accessed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, item_id)
        )
        "#],
    )
    .await
}

async fn create_user_preferences_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id TEXT PRIMARY KEY REFERENCES users(guid) ON DELETE CASCADE,
            preferred_format TEXT NOT NULL DEFAULT 'text' CHECK (preferred_format IN ('text', 'audio', 'pdf')),
            font_size INTEGER NOT NULL DEFAULT 18,
            theme TEXT NOT NULL DEFAULT 'light' CHECK (theme IN ('light', 'dark', 'sepia')),
            categories TEXT NOT NULL DEFAULT '[]',
            daily_goal_minutes INTEGER NOT NULL DEFAULT 15,
            updated_at TEXT NOT NULL
        )
        "#],
    )
    .await
}

async fn create_user_gamification_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS user_gamification (
            user_id TEXT PRIMARY KEY REFERENCES users(guid) ON DELETE CASCADE,
            points INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1,
            current_streak INTEGER NOT NULL DEFAULT 0,
            longest_streak INTEGER NOT NULL DEFAULT 0,
            last_activity_date TEXT,
            items_completed INTEGER NOT NULL DEFAULT 0,
            quiz_correct INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_user_gamification_points ON user_gamification(points DESC)",
        ],
    )
    .await
}

async fn create_user_badges_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS user_badges (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            badge TEXT NOT NULL,
            awarded_at TEXT NOT NULL,
            PRIMARY KEY (user_id, badge)
        )
        "#],
    )
    .await
}

async fn create_quiz_answers_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS quiz_answers (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            question_id TEXT NOT NULL REFERENCES quiz_questions(guid) ON DELETE CASCADE,
            selected_index INTEGER NOT NULL,
            is_correct INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_quiz_answers_user_question ON quiz_answers(user_id, question_id)",
        ],
    )
    .await
}

async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            guid TEXT PRIMARY KEY,
            user_id TEXT,
            action TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
            "CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action)",
        ],
    )
    .await
}

/// Names of every application table, in dependency order
pub const TABLES: &[&str] = &[
    "users",
    "accounts",
    "sessions",
    "items",
    "summary_sections",
    "audio_tracks",
    "sync_maps",
    "quiz_questions",
    "reading_progress",
    "reading_events",
    "item_access",
    "user_preferences",
    "user_gamification",
    "user_badges",
    "quiz_answers",
    "audit_log",
    "settings",
];
