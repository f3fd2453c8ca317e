// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak and progress read routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Granularity, ProgressBucket, ProgressSums, Repeat, StreakSummary, WindowProgress};
use crate::routes::TzQuery;
use crate::services::{window_bounds, UserStreaks};
use crate::time_utils::CallerTz;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_BUCKETS: i64 = 7;

/// Stats routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks/{task_id}/streak", get(get_task_streak))
        .route("/api/tasks/{task_id}/window", get(get_window_progress))
        .route("/api/streaks", get(get_user_streaks))
        .route("/api/stats/progress", get(get_progress_series))
}

/// Current and best streak for one task.
///
/// Unknown tasks report zeros rather than 404 so dashboards can render
/// placeholders for tasks that were just deleted.
async fn get_task_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Query(query): Query<TzQuery>,
) -> Result<Json<StreakSummary>> {
    let tz = query.zone()?;
    let summary = state
        .streaks
        .task_streak_by_id(&task_id, user.user_id, &tz, Utc::now())
        .await?;
    Ok(Json(summary))
}

/// Progress toward the target in the current window.
async fn get_window_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Query(query): Query<TzQuery>,
) -> Result<Json<WindowProgress>> {
    let tz = query.zone()?;
    let now = Utc::now();

    match state.store.get_task(&task_id).await? {
        Some(task) if task.owner_user_id == user.user_id => {
            let progress = state
                .stats
                .window_progress(&task, user.user_id, &tz, now)
                .await?;
            Ok(Json(progress))
        }
        _ => {
            let window = window_bounds(Repeat::Daily, None, now, &tz);
            Ok(Json(WindowProgress {
                task_id,
                window_start: window.start,
                window_end: window.end,
                sums: ProgressSums::default(),
                percent: 0.0,
                success: false,
            }))
        }
    }
}

/// Streaks for every task plus the cross-task daily streak.
async fn get_user_streaks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TzQuery>,
) -> Result<Json<UserStreaks>> {
    let tz = query.zone()?;
    let streaks = state
        .streaks
        .user_streaks(user.user_id, &tz, Utc::now())
        .await?;
    Ok(Json(streaks))
}

#[derive(Debug, Deserialize)]
struct ProgressSeriesQuery {
    /// daily, weekly or monthly
    granularity: Option<String>,
    buckets: Option<i64>,
    tz: Option<String>,
    #[serde(default)]
    tz_offset_minutes: i32,
}

/// Response for the completion chart.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProgressSeriesResponse {
    pub granularity: Granularity,
    pub buckets: Vec<ProgressBucket>,
}

async fn get_progress_series(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ProgressSeriesQuery>,
) -> Result<Json<ProgressSeriesResponse>> {
    let tz = CallerTz::resolve(query.tz.as_deref(), query.tz_offset_minutes)?;
    let granularity = match query.granularity.as_deref() {
        Some(raw) => raw.parse::<Granularity>().map_err(AppError::BadRequest)?,
        None => Granularity::default(),
    };
    let buckets = query.buckets.unwrap_or(DEFAULT_BUCKETS);

    let series = state
        .stats
        .completion_series(user.user_id, granularity, buckets, &tz, Utc::now())
        .await?;

    Ok(Json(ProgressSeriesResponse {
        granularity,
        buckets: series,
    }))
}
