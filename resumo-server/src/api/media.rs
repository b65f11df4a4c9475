//! Media file serving
//!
//! Covers are public. Audio and PDF files are served only to users with
//! access to the item that owns them. Files are streamed by
//! `tower_http::services::ServeFile`, which handles range requests.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    response::Response,
    Extension,
};
use resumo_common::db::Item;
use resumo_common::media::{content_type, resolve_path, sanitize_file_name, MediaKind};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::api::access::require_access;
use crate::db;
use crate::extract::ApiPath;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionUser;
use crate::AppState;

async fn send_file(state: &AppState, kind: MediaKind, file: &str, request: Request) -> ApiResult<Response> {
    let path = resolve_path(&state.media_root, kind, file)?;
    if !tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(ApiError::NotFound(format!("Media file '{}'", file)));
    }

    debug!("Serving {} file {}", kind, path.display());
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type(file)),
        );
    }
    if kind.requires_access() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
    }
    Ok(response)
}

async fn owning_item(state: &AppState, kind: MediaKind, file: &str) -> ApiResult<Item> {
    let item = match kind {
        MediaKind::Audio => db::items::find_by_audio_file(&state.db, file).await?,
        MediaKind::Pdf => db::items::find_by_pdf_file(&state.db, file).await?,
        MediaKind::Cover => None,
    };
    item.ok_or_else(|| ApiError::NotFound(format!("Media file '{}'", file)))
}

async fn serve_gated(
    state: AppState,
    session: SessionUser,
    kind: MediaKind,
    file: String,
    request: Request,
) -> ApiResult<Response> {
    let file = sanitize_file_name(kind, &file)?;
    let item = owning_item(&state, kind, &file).await?;
    require_access(&state, &session.user, &item).await?;
    send_file(&state, kind, &file, request).await
}

/// GET /media/audio/:file
pub async fn serve_audio(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(file): ApiPath<String>,
    request: Request,
) -> ApiResult<Response> {
    serve_gated(state, session, MediaKind::Audio, file, request).await
}

/// GET /media/pdf/:file
pub async fn serve_pdf(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(file): ApiPath<String>,
    request: Request,
) -> ApiResult<Response> {
    serve_gated(state, session, MediaKind::Pdf, file, request).await
}

/// GET /media/covers/:file
pub async fn serve_cover(
    State(state): State<AppState>,
    ApiPath(file): ApiPath<String>,
    request: Request,
) -> ApiResult<Response> {
    send_file(&state, MediaKind::Cover, &file, request).await
}
