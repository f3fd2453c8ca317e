// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use habit_streaks::config::Config;
use habit_streaks::db::{FirestoreDb, MemoryStore, SharedStore};
use habit_streaks::middleware::auth::create_jwt;
use habit_streaks::models::{Repeat, Task, TaskMetric};
use habit_streaks::routes::create_router;
use habit_streaks::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router, the shared state and the store itself.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();
    let state = Arc::new(AppState::new(Config::test_default(), shared));
    (create_router(state.clone()), state, store)
}

/// Session token for `user_id` signed with the test key.
#[allow(dead_code)]
pub fn test_token(user_id: u64) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key).expect("Failed to create JWT")
}

/// Build an authenticated request with an optional JSON body.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    user_id: u64,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", test_token(user_id)));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request through the router.
#[allow(dead_code)]
pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A task fixture owned by `owner`.
#[allow(dead_code)]
pub fn test_task(id: &str, owner: u64, repeat: Repeat, metric: TaskMetric) -> Task {
    Task {
        id: id.to_string(),
        owner_user_id: owner,
        activity_name: format!("Habit {}", id),
        metric,
        deadline_date: None,
        repeat,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// Parse `YYYY-MM-DD`.
#[allow(dead_code)]
pub fn day(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

/// Unique id for emulator test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
