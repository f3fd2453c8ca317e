// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task, occurrence and progress routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Occurrence, ProgressEvent, ProgressKind, Repeat, Task, TaskMetric};
use crate::routes::load_owned_task;
use crate::services::{BatchGenerationReport, GenerationReport};
use crate::time_utils::{format_utc_rfc3339, local_date, parse_date, parse_rfc3339, CallerTz};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Task routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/api/tasks/{task_id}/occurrences/generate",
            post(generate_task_occurrences),
        )
        .route("/api/occurrences/generate", post(generate_all_occurrences))
        .route("/api/tasks/{task_id}/occurrences", get(list_occurrences))
        .route(
            "/api/tasks/{task_id}/occurrences/{date}",
            put(set_completion),
        )
        .route("/api/tasks/{task_id}/progress", post(record_progress))
}

// ─── Tasks ───────────────────────────────────────────────────

/// Body for creating or replacing a task.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskRequest {
    #[validate(length(min = 1, max = 100))]
    pub activity_name: String,
    #[validate(range(min = 1))]
    pub timer_minutes: Option<u32>,
    #[validate(range(min = 1))]
    pub counter: Option<u32>,
    /// Calendar date, `YYYY-MM-DD`
    pub deadline_date: Option<String>,
    /// One of none/daily/weekly/monthly/yearly; defaults to none
    pub repeat: Option<String>,
}

impl TaskRequest {
    /// Validate and convert into a task with the given identity.
    fn into_task(self, id: String, owner_user_id: u64, created_at: String) -> Result<Task> {
        self.validate()?;

        let activity_name = self.activity_name.trim().to_string();
        if activity_name.is_empty() {
            return Err(AppError::BadRequest(
                "activity_name must not be blank".to_string(),
            ));
        }

        let repeat = match self.repeat.as_deref() {
            Some(raw) => raw.parse::<Repeat>()?,
            None => Repeat::None,
        };
        let deadline_date = self.deadline_date.as_deref().map(parse_date).transpose()?;

        Ok(Task {
            id,
            owner_user_id,
            activity_name,
            metric: TaskMetric {
                timer_minutes: self.timer_minutes,
                counter: self.counter,
            },
            deadline_date,
            repeat,
            created_at,
        })
    }
}

/// List the caller's tasks, soonest deadline first.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Task>>> {
    let tasks = state.store.list_tasks_by_user(user.user_id).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<TaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = body.into_task(
        uuid::Uuid::new_v4().to_string(),
        user.user_id,
        format_utc_rfc3339(Utc::now()),
    )?;
    state.store.upsert_task(&task).await?;

    tracing::info!(
        user_id = user.user_id,
        task_id = %task.id,
        repeat = %task.repeat,
        accumulative = task.is_accumulative(),
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>> {
    let task = load_owned_task(&state, &task_id, user.user_id).await?;
    Ok(Json(task))
}

/// Replace a task's editable fields. Existing occurrences are kept.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Json(body): Json<TaskRequest>,
) -> Result<Json<Task>> {
    let existing = load_owned_task(&state, &task_id, user.user_id).await?;
    let task = body.into_task(existing.id, user.user_id, existing.created_at)?;
    state.store.upsert_task(&task).await?;

    tracing::info!(user_id = user.user_id, task_id = %task.id, "Task updated");

    Ok(Json(task))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteTaskResponse {
    pub task_id: String,
    /// Task, occurrence and streak documents removed
    pub deleted: u32,
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<DeleteTaskResponse>> {
    let task = load_owned_task(&state, &task_id, user.user_id).await?;
    let deleted = state.store.delete_task(&task.id).await?;

    tracing::info!(
        user_id = user.user_id,
        task_id = %task.id,
        deleted,
        "Task deleted"
    );

    Ok(Json(DeleteTaskResponse {
        task_id: task.id,
        deleted: deleted as u32,
    }))
}

// ─── Occurrences ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// First candidate date; defaults per task
    pub anchor: Option<String>,
    pub horizon_days: Option<i64>,
    /// IANA zone name; decides which calendar day "today" is
    pub tz: Option<String>,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

async fn generate_task_occurrences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerationReport>> {
    let tz = CallerTz::resolve(body.tz.as_deref(), body.tz_offset_minutes)?;
    let anchor = body.anchor.as_deref().map(parse_date).transpose()?;
    let horizon_days = body
        .horizon_days
        .unwrap_or(state.config.default_horizon_days as i64);

    let task = load_owned_task(&state, &task_id, user.user_id).await?;
    let today = local_date(&tz, Utc::now());
    let report = state
        .occurrences
        .generate(&task, anchor, horizon_days, today)
        .await?;

    Ok(Json(report))
}

/// Generate occurrences for all of the caller's tasks.
///
/// Failures on individual tasks are listed in the response rather than
/// failing the request.
async fn generate_all_occurrences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<BatchGenerationReport>> {
    let tz = CallerTz::resolve(body.tz.as_deref(), body.tz_offset_minutes)?;
    if body.anchor.is_some() {
        return Err(AppError::BadRequest(
            "anchor is only accepted for a single task".to_string(),
        ));
    }
    let horizon_days = body
        .horizon_days
        .unwrap_or(state.config.default_horizon_days as i64);

    let today = local_date(&tz, Utc::now());
    let report = state
        .occurrences
        .generate_for_user(user.user_id, horizon_days, today)
        .await?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct OccurrencesQuery {
    /// Inclusive lower bound, `YYYY-MM-DD`
    from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    to: Option<String>,
}

async fn list_occurrences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Query(query): Query<OccurrencesQuery>,
) -> Result<Json<Vec<Occurrence>>> {
    let from = query.from.as_deref().map(parse_date).transpose()?;
    let to = query.to.as_deref().map(parse_date).transpose()?;

    let task = load_owned_task(&state, &task_id, user.user_id).await?;
    let occurrences = state.occurrences.list(&task.id, from, to).await?;

    Ok(Json(occurrences))
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
    /// Seconds spent; merged with any earlier value by taking the larger
    pub seconds_logged: Option<i64>,
}

async fn set_completion(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((task_id, date)): Path<(String, String)>,
    Json(body): Json<CompletionRequest>,
) -> Result<Json<Occurrence>> {
    let date = parse_date(&date)?;
    let task = load_owned_task(&state, &task_id, user.user_id).await?;

    let occurrence = state
        .occurrences
        .set_completion(&task.id, date, body.completed, body.seconds_logged, Utc::now())
        .await?;

    Ok(Json(occurrence))
}

// ─── Progress ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    /// `minutes` or `count`
    pub kind: String,
    pub value: i64,
    /// RFC 3339 instant; defaults to now
    pub at: Option<String>,
}

async fn record_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Json(body): Json<ProgressRequest>,
) -> Result<(StatusCode, Json<ProgressEvent>)> {
    let kind: ProgressKind = body.kind.parse().map_err(AppError::BadRequest)?;
    let at = body.at.as_deref().map(parse_rfc3339).transpose()?;

    let task = load_owned_task(&state, &task_id, user.user_id).await?;
    let event = state
        .progress
        .record(&task, user.user_id, kind, body.value, at, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}
