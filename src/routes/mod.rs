// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod stats;
pub mod tasks;

use crate::error::{AppError, Result};
use crate::middleware::auth::require_auth;
use crate::models::Task;
use crate::time_utils::CallerTz;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Caller's time zone, e.g. `?tz=America/Denver` or `?tz_offset_minutes=-480`.
///
/// An IANA name follows DST; a bare offset does not.
#[derive(Debug, Default, Deserialize)]
pub struct TzQuery {
    pub tz: Option<String>,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

impl TzQuery {
    pub fn zone(&self) -> Result<CallerTz> {
        CallerTz::resolve(self.tz.as_deref(), self.tz_offset_minutes)
    }
}

/// Load a task the caller owns. Foreign tasks look the same as missing ones.
pub(crate) async fn load_owned_task(state: &AppState, task_id: &str, user_id: u64) -> Result<Task> {
    match state.store.get_task(task_id).await? {
        Some(task) if task.owner_user_id == user_id => Ok(task),
        _ => Err(AppError::NotFound(format!("Task {} not found", task_id))),
    }
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new().route("/health", get(health_check));

    // Everything under /api acts on the caller's own tasks
    let protected_routes = tasks::routes()
        .merge(stats::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
