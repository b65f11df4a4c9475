//! Integration tests for user preferences and recommendations

mod helpers;

use axum::http::StatusCode;
use helpers::TestApp;
use serde_json::json;

// ============================================================================
// Preferences
// ============================================================================

#[tokio::test]
async fn test_preferences_default_then_partial_update() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;

    let defaults = app.get("/api/user/preferences", Some(&token)).await;
    assert_eq!(defaults.status, StatusCode::OK);
    assert_eq!(defaults.body["preferredFormat"], "text");
    assert_eq!(defaults.body["theme"], "light");
    assert_eq!(defaults.body["categories"], json!([]));

    let updated = app
        .post(
            "/api/user/preferences",
            Some(&token),
            json!({ "theme": "sepia", "categories": [" Filosofia ", "filosofia", "Negócios"] }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["theme"], "sepia");
    assert_eq!(updated.body["categories"], json!(["Filosofia", "Negócios"]));
    assert_eq!(updated.body["fontSize"], defaults.body["fontSize"]);

    let reread = app.get("/api/user/preferences", Some(&token)).await;
    assert_eq!(reread.body["theme"], "sepia");

    let audited: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = 'preferences.updated'")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(audited, 1);
}

#[tokio::test]
async fn test_invalid_preferences_are_not_saved() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;

    let response = app
        .post(
            "/api/user/preferences",
            Some(&token),
            json!({ "theme": "dark", "fontSize": 4, "preferredFormat": "video" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]["fields"]["fontSize"].is_array());
    assert!(response.body["error"]["fields"]["preferredFormat"].is_array());

    let reread = app.get("/api/user/preferences", Some(&token)).await;
    assert_eq!(reread.body["theme"], "light");
}

// ============================================================================
// Recommendations
// ============================================================================

#[tokio::test]
async fn test_recommendations_prefer_chosen_categories_and_skip_started_items() {
    let app = TestApp::new().await;
    app.set_free_limit(10).await;
    let token = app.register("ana@example.com", "Ana").await;
    let started = app.seed_item("comecado", "filosofia").await;
    app.seed_item("estoicos", "filosofia").await;
    app.seed_item("habitos", "produtividade").await;
    app.seed_item("vendas", "negocios").await;

    app.post(
        "/api/user/preferences",
        Some(&token),
        json!({ "categories": ["Filosofia"] }),
    )
    .await;
    app.put(
        &format!("/api/progress/{}", started),
        Some(&token),
        json!({ "sectionIndex": 0, "scrollPosition": 0.1, "percent": 5.0 }),
    )
    .await;

    let response = app.get("/api/recommendations", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body.as_array().unwrap();
    let slugs: Vec<&str> = items.iter().map(|i| i["slug"].as_str().unwrap()).collect();

    assert_eq!(items.len(), 3);
    assert!(!slugs.contains(&"comecado"));
    assert_eq!(slugs[0], "estoicos");
    assert_eq!(items[0]["preferredCategory"], true);
    assert_eq!(items[1]["preferredCategory"], false);

    let limited = app.get("/api/recommendations?limit=1", Some(&token)).await;
    assert_eq!(limited.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_recommendations_rank_popular_items_first_without_preferences() {
    let app = TestApp::new().await;
    app.set_free_limit(10).await;
    let ana = app.register("ana@example.com", "Ana").await;
    let bruno = app.register("bruno@example.com", "Bruno").await;
    app.seed_item("pouco-lido", "ficcao").await;
    let popular = app.seed_item("popular", "ficcao").await;

    app.put(
        &format!("/api/progress/{}", popular),
        Some(&bruno),
        json!({ "sectionIndex": 0, "scrollPosition": 0.0, "percent": 1.0 }),
    )
    .await;

    let response = app.get("/api/recommendations", Some(&ana)).await;
    let items = response.body.as_array().unwrap();
    assert_eq!(items[0]["slug"], "popular");
    assert_eq!(items[0]["readers"], 1);
}

#[tokio::test]
async fn test_wrong_preference_type_gets_error_envelope() {
    let app = TestApp::new().await;
    let token = app.register("ana@example.com", "Ana").await;

    let response = app
        .post("/api/user/preferences", Some(&token), json!({ "fontSize": "big" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "BAD_REQUEST");
    assert!(response.body["error"]["message"].is_string());
}
