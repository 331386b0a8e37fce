//! services/api/src/web/test_support.rs
//!
//! Shared fixtures for handler tests: an `AppState` over the in-memory store,
//! request builders and a logged-in teacher.

use crate::config::Config;
use crate::web::{router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    Router,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use vocab_exam_core::ports::DatabaseService;
use vocab_exam_core::testing::{InMemoryDatabase, RecordingNotifier};

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/vocab_exam_test".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn test_state() -> (Arc<AppState>, Arc<InMemoryDatabase>) {
    let db = Arc::new(InMemoryDatabase::new());
    let state = Arc::new(AppState {
        db: db.clone(),
        notifier: Arc::new(RecordingNotifier::default()),
        config: Arc::new(test_config()),
    });
    (state, db)
}

pub struct TestContext {
    pub app: Router,
    pub db: Arc<InMemoryDatabase>,
}

pub fn setup_test_context() -> TestContext {
    let (state, db) = test_state();
    TestContext {
        app: router(state),
        db,
    }
}

/// A teacher with a live auth session; returns the id and the `Cookie` header value.
pub async fn logged_in_teacher(db: &InMemoryDatabase, email: &str, name: &str) -> (Uuid, String) {
    let teacher = db.create_teacher(email, name, "hash").await.expect("teacher");
    let session_id = Uuid::new_v4().to_string();
    db.create_auth_session(&session_id, teacher.id, Utc::now() + Duration::days(1))
        .await
        .expect("auth session");
    (teacher.id, format!("session={}", session_id))
}

pub fn json_request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
