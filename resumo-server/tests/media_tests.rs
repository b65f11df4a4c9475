//! Integration tests for media serving and sync maps

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::TestApp;

// ============================================================================
// Covers (public)
// ============================================================================

#[tokio::test]
async fn test_cover_is_public() {
    let app = TestApp::new().await;
    app.write_media("covers", "habitos.jpg", b"\xFF\xD8\xFFfake-jpeg");

    let response = app.get("/media/covers/habitos.jpg", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "image/jpeg");
}

#[tokio::test]
async fn test_missing_and_illegal_file_names() {
    let app = TestApp::new().await;

    let missing = app.get("/media/covers/nada.jpg", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let wrong_extension = app.get("/media/covers/script.sh", None).await;
    assert_eq!(wrong_extension.status, StatusCode::BAD_REQUEST);

    let traversal = app.get("/media/covers/..%2Fsecret.jpg", None).await;
    assert_eq!(traversal.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Audio and PDF (gated)
// ============================================================================

#[tokio::test]
async fn test_audio_requires_session_and_access() {
    let app = TestApp::new().await;
    app.set_free_limit(0).await;
    app.seed_item("habitos", "produtividade").await;
    app.write_media("audio", "habitos.mp3", b"ID3fake-audio-bytes");
    let token = app.register("ana@example.com", "Ana").await;

    let anonymous = app.get("/media/audio/habitos.mp3", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let no_quota = app.get("/media/audio/habitos.mp3", Some(&token)).await;
    assert_eq!(no_quota.status, StatusCode::PAYMENT_REQUIRED);

    app.make_premium("ana@example.com").await;
    let response = app.get("/media/audio/habitos.mp3", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers[header::CACHE_CONTROL], "private, no-store");
}

#[tokio::test]
async fn test_audio_supports_range_requests() {
    let app = TestApp::new().await;
    app.seed_item("habitos", "produtividade").await;
    app.write_media("audio", "habitos.mp3", b"abcdefghij");
    let token = app.register("ana@example.com", "Ana").await;
    app.make_premium("ana@example.com").await;

    let request = Request::builder()
        .uri("/media/audio/habitos.mp3")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::RANGE, "bytes=2-5")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.body, "cdef");
}

#[tokio::test]
async fn test_unowned_gated_file_is_not_found() {
    let app = TestApp::new().await;
    app.write_media("pdf", "orfao.pdf", b"%PDF-1.4");
    let token = app.register("ana@example.com", "Ana").await;
    app.make_premium("ana@example.com").await;

    let response = app.get("/media/pdf/orfao.pdf", Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pdf_served_to_reader_with_access() {
    let app = TestApp::new().await;
    app.seed_item("habitos", "produtividade").await;
    app.write_media("pdf", "habitos.pdf", b"%PDF-1.4 fake");
    let token = app.register("ana@example.com", "Ana").await;

    // Default free quota covers it
    let response = app.get("/media/pdf/habitos.pdf", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/pdf");
}

// ============================================================================
// Sync maps
// ============================================================================

#[tokio::test]
async fn test_sync_map_covers_audio_in_section_order() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;
    let item_id = app.seed_item("habitos", "produtividade").await;

    let response = app.get(&format!("/api/sync-map/{}", item_id), Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["audioDurationMs"], 40_000);

    // Sections of 100, 200 and 100 characters over 40 seconds
    let entries = response.body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    let starts: Vec<i64> = entries
        .iter()
        .map(|e| e["timestampMs"].as_i64().unwrap())
        .collect();
    assert_eq!(starts, vec![0, 10_000, 30_000]);
    assert_eq!(entries[2]["sectionIndex"], 2);
}

#[tokio::test]
async fn test_sync_map_missing_without_audio() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;
    let mut item = helpers::sample_item("sem-audio", "ficcao");
    item.audio = None;
    let item_id = app.import(item).await;

    let response = app.get(&format!("/api/sync-map/{}", item_id), Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
