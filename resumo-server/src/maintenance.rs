//! Maintenance operations behind the `resumo-admin` binary
//!
//! Each operation that changes data writes an `admin.*` audit row.

use chrono::Duration;
use resumo_common::db::{ReadingEventKind, SubscriptionPlan, UserRole, UserStatus, TABLES};
use resumo_common::gamification::Activity;
use resumo_common::media::{sanitize_file_name, MediaKind};
use resumo_common::validation::{is_valid_slug, FieldErrors};
use resumo_common::{time, uuid_utils, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;

/// Item definition accepted by `import-item`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemImport {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub synopsis: String,
    pub cover_file: Option<String>,
    pub pdf_file: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub reading_minutes: i64,
    #[serde(default)]
    pub sections: Vec<SectionImport>,
    pub audio: Option<AudioImport>,
    #[serde(default)]
    pub quiz: Vec<QuestionImport>,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionImport {
    #[serde(default)]
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioImport {
    pub file: String,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionImport {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub item_id: String,
    pub created: bool,
    pub sections: usize,
    pub questions: usize,
    pub has_audio: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub expired_sessions: u64,
    pub orphaned_progress: u64,
    pub orphaned_events: u64,
    pub orphaned_unlocks: u64,
    pub orphaned_answers: u64,
    pub stale_sync_maps: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.expired_sessions
            + self.orphaned_progress
            + self.orphaned_events
            + self.orphaned_unlocks
            + self.orphaned_answers
            + self.stale_sync_maps
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncMapReport {
    pub generated: usize,
    pub skipped: usize,
}

fn validate_import(import: &ItemImport) -> std::result::Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    errors.check(is_valid_slug(&import.slug), "slug", "must be lowercase letters, digits and dashes");
    errors.check(!import.title.trim().is_empty(), "title", "must not be empty");
    errors.check(!import.author.trim().is_empty(), "author", "must not be empty");
    errors.check(!import.category.trim().is_empty(), "category", "must not be empty");
    errors.check(import.reading_minutes >= 0, "readingMinutes", "must not be negative");

    if let Some(cover) = &import.cover_file {
        if let Err(e) = sanitize_file_name(MediaKind::Cover, cover) {
            errors.add("coverFile", e.to_string());
        }
    }
    if let Some(pdf) = &import.pdf_file {
        if let Err(e) = sanitize_file_name(MediaKind::Pdf, pdf) {
            errors.add("pdfFile", e.to_string());
        }
    }
    if let Some(audio) = &import.audio {
        if let Err(e) = sanitize_file_name(MediaKind::Audio, &audio.file) {
            errors.add("audio.file", e.to_string());
        }
        errors.check(audio.duration_ms >= 0, "audio.durationMs", "must not be negative");
    }

    for (index, section) in import.sections.iter().enumerate() {
        errors.check(
            !section.body.trim().is_empty(),
            &format!("sections[{}].body", index),
            "must not be empty",
        );
    }

    for (index, question) in import.quiz.iter().enumerate() {
        let field = format!("quiz[{}]", index);
        errors.check(!question.prompt.trim().is_empty(), &field, "prompt must not be empty");
        errors.check(question.options.len() >= 2, &field, "needs at least two options");
        errors.check(
            question.correct_index >= 0 && (question.correct_index as usize) < question.options.len(),
            &field,
            "correctIndex must point at an option",
        );
    }

    errors.into_result()
}

/// Insert or replace an item (matched by slug) with all of its children
pub async fn import_item(pool: &SqlitePool, import: &ItemImport) -> Result<ImportReport> {
    validate_import(import).map_err(|e| Error::InvalidInput(e.summary()))?;

    let existing = db::items::find_by_slug(pool, &import.slug).await?;
    let created = existing.is_none();
    let item_id = existing
        .map(|item| item.guid)
        .unwrap_or_else(uuid_utils::generate);
    let now = time::now();

    let mut tx = pool.begin().await?;

    if created {
        sqlx::query(
            r#"
            INSERT INTO items
                (guid, slug, title, author, category, synopsis, cover_file, pdf_file,
                 is_free, published, reading_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item_id)
        .bind(&import.slug)
        .bind(import.title.trim())
        .bind(import.author.trim())
        .bind(import.category.trim())
        .bind(&import.synopsis)
        .bind(&import.cover_file)
        .bind(&import.pdf_file)
        .bind(import.is_free)
        .bind(import.published)
        .bind(import.reading_minutes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query(
            r#"
            UPDATE items SET
                title = ?, author = ?, category = ?, synopsis = ?, cover_file = ?, pdf_file = ?,
                is_free = ?, published = ?, reading_minutes = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(import.title.trim())
        .bind(import.author.trim())
        .bind(import.category.trim())
        .bind(&import.synopsis)
        .bind(&import.cover_file)
        .bind(&import.pdf_file)
        .bind(import.is_free)
        .bind(import.published)
        .bind(import.reading_minutes)
        .bind(now)
        .bind(&item_id)
        .execute(&mut *tx)
        .await?;

        for table in ["summary_sections", "audio_tracks", "quiz_questions", "sync_maps"] {
            sqlx::query(&format!("DELETE FROM {} WHERE item_id = ?", table))
                .bind(&item_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    for (position, section) in import.sections.iter().enumerate() {
        sqlx::query(
            "INSERT INTO summary_sections (guid, item_id, position, heading, body) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_utils::generate())
        .bind(&item_id)
        .bind(position as i64)
        .bind(section.heading.trim())
        .bind(&section.body)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(audio) = &import.audio {
        sqlx::query(
            "INSERT INTO audio_tracks (guid, item_id, file_name, duration_ms, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_utils::generate())
        .bind(&item_id)
        .bind(&audio.file)
        .bind(audio.duration_ms)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    for (position, question) in import.quiz.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quiz_questions (guid, item_id, position, prompt, options, correct_index, explanation)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_utils::generate())
        .bind(&item_id)
        .bind(position as i64)
        .bind(question.prompt.trim())
        .bind(sqlx::types::Json(&question.options))
        .bind(question.correct_index)
        .bind(&question.explanation)
        .execute(&mut *tx)
        .await?;
    }

    db::audit::record(
        &mut *tx,
        None,
        "admin.import_item",
        json!({ "slug": import.slug, "itemId": item_id, "created": created }),
    )
    .await?;

    tx.commit().await?;

    let report = ImportReport {
        item_id,
        created,
        sections: import.sections.len(),
        questions: import.quiz.len(),
        has_audio: import.audio.is_some(),
    };
    info!(
        "{} item '{}' ({} sections, {} questions)",
        if created { "Imported" } else { "Replaced" },
        import.slug,
        report.sections,
        report.questions
    );
    Ok(report)
}

/// Parse an import file and import it
pub async fn import_item_file(pool: &SqlitePool, path: &std::path::Path) -> Result<ImportReport> {
    let text = tokio::fs::read_to_string(path).await?;
    let import: ItemImport = serde_json::from_str(&text)?;
    import_item(pool, &import).await
}

pub async fn delete_item(pool: &SqlitePool, slug: &str) -> Result<()> {
    if !db::items::delete_by_slug(pool, slug).await? {
        return Err(Error::NotFound(format!("item '{}'", slug)));
    }
    db::audit::record(pool, None, "admin.delete_item", json!({ "slug": slug })).await?;
    info!("Deleted item '{}'", slug);
    Ok(())
}

const ORPHANED_BY_USER_OR_ITEM: &str =
    "user_id NOT IN (SELECT guid FROM users) OR item_id NOT IN (SELECT guid FROM items)";
const ORPHANED_ANSWER: &str =
    "user_id NOT IN (SELECT guid FROM users) OR question_id NOT IN (SELECT guid FROM quiz_questions)";
const STALE_SYNC_MAP: &str = "NOT EXISTS (SELECT 1 FROM audio_tracks WHERE audio_tracks.item_id = sync_maps.item_id AND audio_tracks.duration_ms = sync_maps.audio_duration_ms)";

/// Count (dry run) or delete the rows of `table` matching `condition`
async fn purge(pool: &SqlitePool, table: &str, condition: &str, dry_run: bool) -> Result<u64> {
    if dry_run {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE {}", table, condition))
            .fetch_one(pool)
            .await?;
        return Ok(count as u64);
    }

    let result = sqlx::query(&format!("DELETE FROM {} WHERE {}", table, condition))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Remove expired sessions, orphaned per-user rows and stale sync maps.
///
/// With `dry_run` nothing is deleted; the report holds what would be.
pub async fn cleanup(pool: &SqlitePool, dry_run: bool) -> Result<CleanupReport> {
    let mut report = CleanupReport {
        dry_run,
        ..Default::default()
    };

    let now = time::now();
    report.expired_sessions = if dry_run {
        db::sessions::count_expired_sessions(pool, now).await?
    } else {
        db::sessions::delete_expired_sessions(pool, now).await?
    };

    let targets = [
        (&mut report.orphaned_progress, "reading_progress", ORPHANED_BY_USER_OR_ITEM),
        (&mut report.orphaned_events, "reading_events", ORPHANED_BY_USER_OR_ITEM),
        (&mut report.orphaned_unlocks, "item_access", ORPHANED_BY_USER_OR_ITEM),
        (&mut report.orphaned_answers, "quiz_answers", ORPHANED_ANSWER),
        (&mut report.stale_sync_maps, "sync_maps", STALE_SYNC_MAP),
    ];
    for (slot, table, condition) in targets {
        *slot = purge(pool, table, condition, dry_run).await?;
    }

    if !dry_run {
        db::audit::record(pool, None, "admin.cleanup", json!(report)).await?;
    }
    info!(
        "Cleanup {}: {} rows",
        if dry_run { "(dry run)" } else { "done" },
        report.total()
    );
    Ok(report)
}

/// Generate sync maps for every item with audio.
///
/// Without `force`, maps that match the current audio duration are kept.
pub async fn generate_sync_maps(pool: &SqlitePool, force: bool) -> Result<SyncMapReport> {
    let item_ids: Vec<String> = sqlx::query_scalar("SELECT item_id FROM audio_tracks ORDER BY item_id")
        .fetch_all(pool)
        .await?;

    let mut report = SyncMapReport::default();
    for item_id in &item_ids {
        let up_to_date = match (
            db::sync_maps::get(pool, item_id).await?,
            db::items::audio_track(pool, item_id).await?,
        ) {
            (Some(map), Some(track)) => map.audio_duration_ms == track.duration_ms,
            _ => false,
        };

        if up_to_date && !force {
            report.skipped += 1;
            continue;
        }
        if db::sync_maps::regenerate(pool, item_id).await?.is_some() {
            report.generated += 1;
        }
    }

    db::audit::record(pool, None, "admin.generate_sync_maps", json!(report)).await?;
    Ok(report)
}

/// Set a user's plan. `days` sets an expiry for premium; free clears it.
pub async fn set_subscription(
    pool: &SqlitePool,
    email: &str,
    plan: SubscriptionPlan,
    days: Option<i64>,
) -> Result<()> {
    if let Some(days) = days {
        if days <= 0 {
            return Err(Error::InvalidInput("days must be positive".to_string()));
        }
    }
    let expires_at = match plan {
        SubscriptionPlan::Premium => days.map(|d| time::now() + Duration::days(d)),
        SubscriptionPlan::Free => None,
    };

    let email = resumo_common::validation::normalize_email(email);
    if !db::users::set_subscription(pool, &email, plan, expires_at).await? {
        return Err(Error::NotFound(format!("user '{}'", email)));
    }

    db::audit::record(
        pool,
        None,
        "admin.set_subscription",
        json!({ "email": email, "plan": plan, "expiresAt": expires_at }),
    )
    .await?;
    info!("Set subscription of {} to {}", email, plan);
    Ok(())
}

pub async fn set_role(pool: &SqlitePool, email: &str, role: UserRole) -> Result<()> {
    let email = resumo_common::validation::normalize_email(email);
    if !db::users::set_role(pool, &email, role).await? {
        return Err(Error::NotFound(format!("user '{}'", email)));
    }
    db::audit::record(pool, None, "admin.set_role", json!({ "email": email, "role": role })).await?;
    info!("Set role of {} to {}", email, role);
    Ok(())
}

pub async fn set_status(pool: &SqlitePool, email: &str, status: UserStatus) -> Result<()> {
    let email = resumo_common::validation::normalize_email(email);
    if !db::users::set_status(pool, &email, status).await? {
        return Err(Error::NotFound(format!("user '{}'", email)));
    }
    db::audit::record(pool, None, "admin.set_status", json!({ "email": email, "status": status }))
        .await?;
    info!("Set status of {} to {}", email, status);
    Ok(())
}

/// Rebuild counters, points and level from stored activity and award any
/// badges they now qualify for.
///
/// Streaks are kept as stored. Returns the number of users processed.
pub async fn recompute_gamification(pool: &SqlitePool) -> Result<usize> {
    let user_ids: Vec<String> = sqlx::query_scalar("SELECT guid FROM users ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    for user_id in &user_ids {
        let items_completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reading_progress WHERE user_id = ? AND completed_at IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let quiz_correct: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT question_id) FROM quiz_answers WHERE user_id = ? AND is_correct = 1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let mut points = items_completed * Activity::ItemCompleted.points()
            + quiz_correct * Activity::QuizCorrect.points();
        for (kind, activity) in [
            (ReadingEventKind::SectionRead, Activity::SectionRead),
            (ReadingEventKind::AudioListened, Activity::AudioListened),
        ] {
            let rewarded: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM (
                    SELECT DISTINCT item_id, section_index FROM reading_events
                    WHERE user_id = ? AND kind = ?
                )
                "#,
            )
            .bind(user_id)
            .bind(kind)
            .fetch_one(pool)
            .await?;
            points += rewarded * activity.points();
        }

        let mut tx = pool.begin().await?;
        let mut stats = db::gamification::load_stats(&mut tx, user_id).await?;
        stats.items_completed = items_completed;
        stats.quiz_correct = quiz_correct;
        stats.points = points;
        db::gamification::save_stats(&mut tx, user_id, &stats).await?;
        db::gamification::award_badges(&mut tx, user_id, &stats).await?;
        tx.commit().await?;
    }

    db::audit::record(
        pool,
        None,
        "admin.recompute_gamification",
        json!({ "users": user_ids.len() }),
    )
    .await?;
    info!("Recomputed gamification for {} users", user_ids.len());
    Ok(user_ids.len())
}

/// Row count per application table
pub async fn stats(pool: &SqlitePool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await?;
        counts.push((*table, count));
    }
    Ok(counts)
}
