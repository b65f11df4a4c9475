//! Shared test infrastructure for resumo-server integration tests
//!
//! - TestApp: router over an in-memory database and a temporary media root
//! - Request helpers returning status, JSON body and headers
//! - Seed helpers for users and catalog items

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use resumo_common::db::{init_in_memory, settings, SubscriptionPlan, UserRole};
use resumo_server::maintenance::{self, AudioImport, ItemImport, QuestionImport, SectionImport};
use resumo_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

pub const PASSWORD: &str = "segredo-forte-123";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub media: TempDir,
}

/// Status, parsed JSON body (Null when empty) and headers
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = init_in_memory().await.expect("in-memory database");
        let media = tempfile::tempdir().expect("media dir");
        for folder in ["audio", "pdf", "covers"] {
            std::fs::create_dir_all(media.path().join(folder)).expect("media subfolder");
        }

        let state = AppState::new(db.clone(), media.path().to_path_buf());
        Self {
            router: build_router(state),
            db,
            media,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            body,
            headers,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request("PUT", uri, token, Some(body)).await
    }

    /// Register a reader and return their session token
    pub async fn register(&self, email: &str, display_name: &str) -> String {
        let response = self
            .post(
                "/api/auth/local/register",
                None,
                json!({ "email": email, "password": PASSWORD, "displayName": display_name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    pub async fn make_premium(&self, email: &str) {
        maintenance::set_subscription(&self.db, email, SubscriptionPlan::Premium, None)
            .await
            .unwrap();
    }

    pub async fn make_admin(&self, email: &str) {
        maintenance::set_role(&self.db, email, UserRole::Admin).await.unwrap();
    }

    pub async fn set_free_limit(&self, limit: i64) {
        settings::set_setting(&self.db, settings::FREE_ITEMS_LIMIT, limit)
            .await
            .unwrap();
    }

    /// Import a paid, published item with three sections, audio, PDF and
    /// two quiz questions (correct answers: 1 and 0). Returns its id.
    pub async fn seed_item(&self, slug: &str, category: &str) -> String {
        self.import(sample_item(slug, category)).await
    }

    pub async fn import(&self, item: ItemImport) -> String {
        maintenance::import_item(&self.db, &item).await.unwrap().item_id
    }

    /// Write a file under the media root
    pub fn write_media(&self, folder: &str, name: &str, contents: &[u8]) {
        std::fs::write(self.media.path().join(folder).join(name), contents).unwrap();
    }

    /// Question ids of an item, in order
    pub async fn question_ids(&self, item_id: &str) -> Vec<String> {
        sqlx::query_scalar("SELECT guid FROM quiz_questions WHERE item_id = ? ORDER BY position")
            .bind(item_id)
            .fetch_all(&self.db)
            .await
            .unwrap()
    }
}

pub fn sample_item(slug: &str, category: &str) -> ItemImport {
    ItemImport {
        slug: slug.to_string(),
        title: format!("Resumo de {}", slug),
        author: "Autora Exemplo".to_string(),
        category: category.to_string(),
        synopsis: "Uma sinopse curta.".to_string(),
        cover_file: Some(format!("{}.jpg", slug)),
        pdf_file: Some(format!("{}.pdf", slug)),
        is_free: false,
        published: true,
        reading_minutes: 12,
        sections: vec![
            SectionImport {
                heading: "Introdução".to_string(),
                body: "a".repeat(100),
            },
            SectionImport {
                heading: "Ideias principais".to_string(),
                body: "b".repeat(200),
            },
            SectionImport {
                heading: "Conclusão".to_string(),
                body: "c".repeat(100),
            },
        ],
        audio: Some(AudioImport {
            file: format!("{}.mp3", slug),
            duration_ms: 40_000,
        }),
        quiz: vec![
            QuestionImport {
                prompt: "Qual é a ideia central?".to_string(),
                options: vec!["Nenhuma".to_string(), "A certa".to_string(), "Outra".to_string()],
                correct_index: 1,
                explanation: Some("Explicada na seção 2.".to_string()),
            },
            QuestionImport {
                prompt: "Quem escreveu?".to_string(),
                options: vec!["A autora".to_string(), "Ninguém".to_string()],
                correct_index: 0,
                explanation: None,
            },
        ],
    }
}
