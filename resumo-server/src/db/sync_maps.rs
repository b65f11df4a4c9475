//! Stored audio/text sync maps

use resumo_common::db::StoredSyncMap;
use resumo_common::sync_map::{self, SyncEntry};
use resumo_common::{time, Result};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;

use super::items;

pub async fn get(pool: &SqlitePool, item_id: &str) -> Result<Option<StoredSyncMap>> {
    let map = sqlx::query_as::<_, StoredSyncMap>("SELECT * FROM sync_maps WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(map)
}

/// Build the map from the item's sections and audio duration and store it.
///
/// Returns `None` when the item has no audio track.
pub async fn regenerate(pool: &SqlitePool, item_id: &str) -> Result<Option<StoredSyncMap>> {
    let Some(track) = items::audio_track(pool, item_id).await? else {
        return Ok(None);
    };

    let weights: Vec<usize> = items::sections(pool, item_id)
        .await?
        .iter()
        .map(|section| sync_map::text_weight(&section.body))
        .collect();
    let entries: Vec<SyncEntry> = sync_map::generate(&weights, track.duration_ms);
    let generated_at = time::now();

    sqlx::query(
        r#"
        INSERT INTO sync_maps (item_id, entries, audio_duration_ms, generated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (item_id) DO UPDATE SET
            entries = excluded.entries,
            audio_duration_ms = excluded.audio_duration_ms,
            generated_at = excluded.generated_at
        "#,
    )
    .bind(item_id)
    .bind(Json(&entries))
    .bind(track.duration_ms)
    .bind(generated_at)
    .execute(pool)
    .await?;

    info!(
        "Generated sync map for item {} ({} entries, {} ms)",
        item_id,
        entries.len(),
        track.duration_ms
    );

    Ok(Some(StoredSyncMap {
        item_id: item_id.to_string(),
        entries: Json(entries),
        audio_duration_ms: track.duration_ms,
        generated_at,
    }))
}

/// Stored map if it matches the current audio duration, otherwise a fresh one.
///
/// Returns `None` when the item has no audio track.
pub async fn current(pool: &SqlitePool, item_id: &str) -> Result<Option<StoredSyncMap>> {
    let Some(track) = items::audio_track(pool, item_id).await? else {
        return Ok(None);
    };

    match get(pool, item_id).await? {
        Some(stored) if stored.audio_duration_ms == track.duration_ms => Ok(Some(stored)),
        _ => regenerate(pool, item_id).await,
    }
}
