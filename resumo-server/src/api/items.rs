//! Catalog endpoints

use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use resumo_common::access::GrantReason;
use resumo_common::db::{Item, UserRole};
use serde::{Deserialize, Serialize};

use crate::api::access::require_access;
use crate::api::progress::ProgressView;
use crate::db;
use crate::db::items::ItemFilter;
use crate::extract::{ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::session::{optional_user, SessionUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Catalog card
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub synopsis: String,
    pub cover_file: Option<String>,
    pub is_free: bool,
    pub reading_minutes: i64,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.guid.clone(),
            slug: item.slug.clone(),
            title: item.title.clone(),
            author: item.author.clone(),
            category: item.category.clone(),
            synopsis: item.synopsis.clone(),
            cover_file: item.cover_file.clone(),
            is_free: item.is_free,
            reading_minutes: item.reading_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemListResponse {
    pub items: Vec<ItemSummary>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub summary: ItemSummary,
    pub published: bool,
    pub has_audio: bool,
    pub has_pdf: bool,
    pub section_count: i64,
    pub question_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub index: i64,
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioView {
    pub file: String,
    pub url: String,
    pub duration_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContent {
    pub item: ItemSummary,
    pub access: GrantReason,
    pub sections: Vec<SectionView>,
    pub audio: Option<AudioView>,
    pub pdf_url: Option<String>,
    pub progress: ProgressView,
}

/// GET /api/items?category=&q=&page=
pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<ItemListResponse>> {
    let filter = ItemFilter {
        category: query.category,
        query: query.q,
    };
    let page = db::items::list_published(&state.db, &filter, query.page).await?;

    Ok(Json(ItemListResponse {
        items: page.items.iter().map(ItemSummary::from).collect(),
        page: page.pagination.page,
        total_pages: page.pagination.total_pages,
        total: page.total,
    }))
}

/// GET /api/items/:slug
///
/// Unpublished items are visible to admins only.
pub async fn get_item(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    headers: HeaderMap,
) -> ApiResult<Json<ItemDetail>> {
    let item = db::items::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}'", slug)))?;

    if !item.published {
        let is_admin = optional_user(&state, &headers)
            .await?
            .is_some_and(|user| user.role == UserRole::Admin);
        if !is_admin {
            return Err(ApiError::NotFound(format!("Item '{}'", slug)));
        }
    }

    let has_audio = db::items::audio_track(&state.db, &item.guid).await?.is_some();
    let section_count = db::items::section_count(&state.db, &item.guid).await?;
    let question_count = db::items::question_count(&state.db, &item.guid).await?;

    Ok(Json(ItemDetail {
        summary: ItemSummary::from(&item),
        published: item.published,
        has_audio,
        has_pdf: item.pdf_file.is_some(),
        section_count,
        question_count,
        updated_at: item.updated_at,
    }))
}

/// GET /api/items/:slug/content
pub async fn get_item_content(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<ItemContent>> {
    let item = db::items::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}'", slug)))?;

    let access = require_access(&state, &session.user, &item).await?;

    let sections = db::items::sections(&state.db, &item.guid)
        .await?
        .into_iter()
        .map(|section| SectionView {
            index: section.position,
            heading: section.heading,
            body: section.body,
        })
        .collect();

    let audio = db::items::audio_track(&state.db, &item.guid)
        .await?
        .map(|track| AudioView {
            url: format!("/media/audio/{}", track.file_name),
            file: track.file_name,
            duration_ms: track.duration_ms,
        });

    let progress = db::progress::get(&state.db, &session.user.guid, &item.guid)
        .await?
        .map(ProgressView::from)
        .unwrap_or_else(|| ProgressView::empty(&item.guid));

    Ok(Json(ItemContent {
        pdf_url: item.pdf_file.as_ref().map(|file| format!("/media/pdf/{}", file)),
        item: ItemSummary::from(&item),
        access,
        sections,
        audio,
        progress,
    }))
}
