//! Catalog queries: items and their renditions

use resumo_common::db::{AudioTrack, Item, SummarySection};
use resumo_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};

/// Filters for the catalog listing
#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub category: Option<String>,
    /// Case-insensitive match on title or author
    pub query: Option<String>,
}

/// One page of published items
#[derive(Debug)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: i64,
    pub pagination: Pagination,
}

/// Escape `LIKE` wildcards so user input matches literally, with backslash as the escape
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a ItemFilter) {
    builder.push(" WHERE published = 1");

    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        builder.push(" AND category = ").push_bind(category);
    }

    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        builder
            .push(" AND (lower(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(author) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// List published items, newest first
pub async fn list_published(pool: &SqlitePool, filter: &ItemFilter, page: i64) -> Result<ItemPage> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items");
    push_filter(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let pagination = calculate_pagination(total, page);

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM items");
    push_filter(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, title ASC LIMIT ")
        .push_bind(PAGE_SIZE)
        .push(" OFFSET ")
        .push_bind(pagination.offset);
    let items = select.build_query_as::<Item>().fetch_all(pool).await?;

    Ok(ItemPage {
        items,
        total,
        pagination,
    })
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(item)
}

pub async fn find_by_id(pool: &SqlitePool, item_id: &str) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE guid = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(item)
}

/// Sections ordered by position
pub async fn sections(pool: &SqlitePool, item_id: &str) -> Result<Vec<SummarySection>> {
    let sections = sqlx::query_as::<_, SummarySection>(
        "SELECT * FROM summary_sections WHERE item_id = ? ORDER BY position",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;
    Ok(sections)
}

pub async fn section_count(pool: &SqlitePool, item_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM summary_sections WHERE item_id = ?")
        .bind(item_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn question_count(pool: &SqlitePool, item_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions WHERE item_id = ?")
        .bind(item_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn audio_track(pool: &SqlitePool, item_id: &str) -> Result<Option<AudioTrack>> {
    let track = sqlx::query_as::<_, AudioTrack>("SELECT * FROM audio_tracks WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(track)
}

/// Item owning an audio file
pub async fn find_by_audio_file(pool: &SqlitePool, file_name: &str) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(
        "SELECT items.* FROM items JOIN audio_tracks ON audio_tracks.item_id = items.guid WHERE audio_tracks.file_name = ?",
    )
    .bind(file_name)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

/// Item owning a PDF file
pub async fn find_by_pdf_file(pool: &SqlitePool, file_name: &str) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE pdf_file = ?")
        .bind(file_name)
        .fetch_optional(pool)
        .await?;
    Ok(item)
}

/// Delete an item by slug. Children go with it through cascading keys.
pub async fn delete_by_slug(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM items WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
