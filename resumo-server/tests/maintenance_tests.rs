//! Integration tests for the admin maintenance operations

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use helpers::{sample_item, TestApp};
use resumo_common::db::SubscriptionPlan;
use resumo_common::Error;
use resumo_server::maintenance;
use serde_json::json;

async fn count(app: &TestApp, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(&app.db).await.unwrap()
}

// ============================================================================
// Import / delete
// ============================================================================

#[tokio::test]
async fn test_import_replaces_children_and_keeps_id() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;

    let first = maintenance::import_item(&app.db, &sample_item("habitos", "produtividade"))
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.sections, 3);
    assert_eq!(first.questions, 2);

    // A stored answer belongs to the old questions
    let ids = app.question_ids(&first.item_id).await;
    app.post(
        &format!("/api/quiz/{}/answers", first.item_id),
        Some(&token),
        json!({ "answers": [{ "questionId": ids[0], "selectedIndex": 1 }] }),
    )
    .await;
    assert_eq!(count(&app, "SELECT COUNT(*) FROM quiz_answers").await, 1);

    let mut revised = sample_item("habitos", "produtividade");
    revised.title = "Hábitos Atômicos".to_string();
    revised.sections.truncate(1);
    revised.quiz.truncate(1);
    revised.audio = None;
    let second = maintenance::import_item(&app.db, &revised).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.item_id, first.item_id);
    assert!(!second.has_audio);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM summary_sections").await, 1);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM audio_tracks").await, 0);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM quiz_answers").await, 0);

    let detail = app.get("/api/items/habitos", None).await;
    assert_eq!(detail.body["title"], "Hábitos Atômicos");
    assert_eq!(detail.body["hasAudio"], false);
}

#[tokio::test]
async fn test_import_rejects_invalid_definitions() {
    let app = TestApp::new().await;

    let mut bad = sample_item("Slug Invalido", "ficcao");
    bad.quiz[0].correct_index = 9;
    bad.pdf_file = Some("../fora.pdf".to_string());

    let err = maintenance::import_item(&app.db, &bad).await.unwrap_err();
    match err {
        Error::InvalidInput(message) => {
            assert!(message.contains("slug"));
            assert!(message.contains("quiz[0]"));
            assert!(message.contains("pdfFile"));
        }
        other => panic!("expected invalid input, got {:?}", other),
    }
    assert_eq!(count(&app, "SELECT COUNT(*) FROM items").await, 0);
}

#[tokio::test]
async fn test_import_item_from_json_file() {
    let app = TestApp::new().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("item.json");
    std::fs::write(
        &path,
        json!({
            "slug": "o-principe",
            "title": "O Príncipe",
            "author": "Maquiavel",
            "category": "politica",
            "isFree": true,
            "sections": [{ "heading": "Capítulo 1", "body": "Texto do capítulo." }],
            "audio": { "file": "o-principe.mp3", "durationMs": 60000 },
            "quiz": [{ "prompt": "Quem?", "options": ["Maquiavel", "Platão"], "correctIndex": 0 }]
        })
        .to_string(),
    )
    .unwrap();

    let report = maintenance::import_item_file(&app.db, &path).await.unwrap();
    assert!(report.created);
    assert!(report.has_audio);

    let detail = app.get("/api/items/o-principe", None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["isFree"], true);
    assert_eq!(detail.body["published"], true);
}

#[tokio::test]
async fn test_delete_item_cascades() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;
    let item_id = app.seed_item("habitos", "produtividade").await;
    app.put(
        &format!("/api/progress/{}", item_id),
        Some(&token),
        json!({ "sectionIndex": 0, "scrollPosition": 0.0, "percent": 10.0 }),
    )
    .await;

    maintenance::delete_item(&app.db, "habitos").await.unwrap();
    assert_eq!(count(&app, "SELECT COUNT(*) FROM items").await, 0);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM reading_progress").await, 0);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM item_access").await, 0);

    let again = maintenance::delete_item(&app.db, "habitos").await;
    assert!(matches!(again, Err(Error::NotFound(_))));
}

// ============================================================================
// Cleanup and sync maps
// ============================================================================

#[tokio::test]
async fn test_cleanup_dry_run_then_delete() {
    let app = TestApp::new().await;
    app.register("ana@example.com", "Ana").await;
    app.register("bruno@example.com", "Bruno").await;

    sqlx::query("UPDATE sessions SET expires_at = ? WHERE user_id = (SELECT guid FROM users WHERE email = 'bruno@example.com')")
        .bind(Utc::now() - Duration::minutes(5))
        .execute(&app.db)
        .await
        .unwrap();

    // Orphans can only appear when foreign keys were off at write time
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&app.db).await.unwrap();
    sqlx::query(
        "INSERT INTO reading_progress (user_id, item_id, updated_at) VALUES ('ghost-user', 'ghost-item', ?)",
    )
    .bind(Utc::now())
    .execute(&app.db)
    .await
    .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&app.db).await.unwrap();

    let preview = maintenance::cleanup(&app.db, true).await.unwrap();
    assert!(preview.dry_run);
    assert_eq!(preview.expired_sessions, 1);
    assert_eq!(preview.orphaned_progress, 1);
    assert_eq!(preview.total(), 2);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 2);

    let report = maintenance::cleanup(&app.db, false).await.unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 1);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM reading_progress").await, 0);
    assert_eq!(
        count(&app, "SELECT COUNT(*) FROM audit_log WHERE action = 'admin.cleanup'").await,
        1
    );

    let nothing_left = maintenance::cleanup(&app.db, true).await.unwrap();
    assert_eq!(nothing_left.total(), 0);
}

#[tokio::test]
async fn test_cleanup_removes_every_expired_session_at_once() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;
    let user_id: String = sqlx::query_scalar("SELECT guid FROM users")
        .fetch_one(&app.db)
        .await
        .unwrap();

    // Whole-second and sub-second expiries, past and future
    let now = Utc::now();
    let expiries = [
        now - Duration::days(40),
        now - Duration::seconds(1),
        now - Duration::milliseconds(1500),
        now + Duration::milliseconds(1500),
        now + Duration::days(3),
    ];
    for (n, expires_at) in expiries.iter().enumerate() {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(format!("stale-{}", n))
            .bind(&user_id)
            .bind(now - Duration::days(50))
            .bind(expires_at)
            .execute(&app.db)
            .await
            .unwrap();
    }

    let preview = maintenance::cleanup(&app.db, true).await.unwrap();
    assert_eq!(preview.expired_sessions, 3);

    let report = maintenance::cleanup(&app.db, false).await.unwrap();
    assert_eq!(report.expired_sessions, 3);
    // The registration session and the two future ones remain
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 3);
    assert_eq!(app.get("/api/auth/session", Some(&token)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_generate_sync_maps_skips_current_maps() {
    let app = TestApp::new().await;
    app.seed_item("habitos", "produtividade").await;
    app.seed_item("estoicos", "filosofia").await;
    let mut silent = sample_item("silencioso", "ficcao");
    silent.audio = None;
    app.import(silent).await;

    let first = maintenance::generate_sync_maps(&app.db, false).await.unwrap();
    assert_eq!(first.generated, 2);
    assert_eq!(first.skipped, 0);

    let second = maintenance::generate_sync_maps(&app.db, false).await.unwrap();
    assert_eq!(second.generated, 0);
    assert_eq!(second.skipped, 2);

    let forced = maintenance::generate_sync_maps(&app.db, true).await.unwrap();
    assert_eq!(forced.generated, 2);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_set_subscription_validation() {
    let app = TestApp::new().await;
    app.register("ana@example.com", "Ana").await;

    let unknown =
        maintenance::set_subscription(&app.db, "ninguem@example.com", SubscriptionPlan::Premium, None)
            .await;
    assert!(matches!(unknown, Err(Error::NotFound(_))));

    let zero_days =
        maintenance::set_subscription(&app.db, "ana@example.com", SubscriptionPlan::Premium, Some(0))
            .await;
    assert!(matches!(zero_days, Err(Error::InvalidInput(_))));

    // E-mail lookup is case-insensitive
    maintenance::set_subscription(&app.db, " ANA@example.com", SubscriptionPlan::Premium, Some(7))
        .await
        .unwrap();
    let expires: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT subscription_expires_at FROM users")
            .fetch_one(&app.db)
            .await
            .unwrap();
    let expires = expires.unwrap();
    assert!(expires > Utc::now() + Duration::days(6));
    assert!(expires <= Utc::now() + Duration::days(7));

    // Downgrading clears the expiry
    maintenance::set_subscription(&app.db, "ana@example.com", SubscriptionPlan::Free, None)
        .await
        .unwrap();
    let expires: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT subscription_expires_at FROM users")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert!(expires.is_none());
}

#[tokio::test]
async fn test_recompute_gamification_rebuilds_points_and_badges() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;
    let item_id = app.seed_item("habitos", "produtividade").await;

    app.put(
        &format!("/api/progress/{}", item_id),
        Some(&token),
        json!({ "sectionIndex": 2, "scrollPosition": 1.0, "percent": 100.0 }),
    )
    .await;
    for section in [0, 1, 1] {
        app.post(
            "/api/reading-events",
            Some(&token),
            json!({ "itemId": item_id, "kind": "section_read", "sectionIndex": section }),
        )
        .await;
    }
    let before = app.get("/api/gamification/me", Some(&token)).await;
    assert_eq!(before.body["points"], 60);

    sqlx::query("UPDATE user_gamification SET points = 0, items_completed = 0")
        .execute(&app.db)
        .await
        .unwrap();
    sqlx::query("DELETE FROM user_badges").execute(&app.db).await.unwrap();

    let users = maintenance::recompute_gamification(&app.db).await.unwrap();
    assert_eq!(users, 1);

    let after = app.get("/api/gamification/me", Some(&token)).await;
    assert_eq!(after.body["points"], 60);
    assert_eq!(after.body["itemsCompleted"], 1);
    assert_eq!(after.body["currentStreak"], before.body["currentStreak"]);
    assert_eq!(after.body["badges"][0]["badge"], "first_summary");
}

#[tokio::test]
async fn test_stats_counts_rows() {
    let app = TestApp::new().await;
    app.register("ana@example.com", "Ana").await;
    app.seed_item("habitos", "produtividade").await;

    let stats = maintenance::stats(&app.db).await.unwrap();
    let lookup = |table: &str| stats.iter().find(|(t, _)| *t == table).map(|(_, c)| *c);

    assert_eq!(lookup("users"), Some(1));
    assert_eq!(lookup("items"), Some(1));
    assert_eq!(lookup("summary_sections"), Some(3));
    assert_eq!(lookup("quiz_questions"), Some(2));
}
