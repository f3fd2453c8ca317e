// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Occurrence generation and completion recording.
//!
//! Generation expands a task's repeat rule into calendar dates (pure date
//! arithmetic, one function per repeat kind) and inserts them through the
//! store's insert-if-absent primitive, so re-running it never duplicates or
//! modifies existing rows.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::SharedStore;
use crate::error::{AppError, Result};
use crate::models::{Occurrence, Repeat, Task};

const MAX_CONCURRENT_DB_OPS: usize = 50;
/// Yearly tasks always get at least this many candidates.
const MIN_YEARLY_CANDIDATES: u32 = 2;

fn ceil_div(n: u32, d: u32) -> u32 {
    n.div_ceil(d)
}

fn daily_dates(anchor: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    (0..=horizon_days as u64)
        .filter_map(|i| anchor.checked_add_days(Days::new(i)))
        .collect()
}

fn weekly_dates(anchor: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    let candidates = ceil_div(horizon_days, 7) + 1;
    (0..candidates as u64)
        .filter_map(|i| anchor.checked_add_days(Days::new(i * 7)))
        .collect()
}

/// Offsets are always applied to the original anchor, so a day-31 anchor
/// clamps to short months without drifting (Jan 31 → Feb 29 → Mar 31).
fn monthly_dates(anchor: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    let candidates = ceil_div(horizon_days, 30) + 1;
    (0..candidates)
        .filter_map(|i| anchor.checked_add_months(Months::new(i)))
        .collect()
}

/// Feb 29 anchors clamp to Feb 28 in non-leap years.
fn yearly_dates(anchor: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    let candidates = (ceil_div(horizon_days, 365) + 1).max(MIN_YEARLY_CANDIDATES);
    (0..candidates)
        .filter_map(|i| anchor.checked_add_months(Months::new(i.saturating_mul(12))))
        .collect()
}

/// Candidate occurrence dates for a repeat rule, with the deadline applied.
///
/// Never returns a date after `deadline`. Dates are ascending and distinct.
pub fn expand_occurrence_dates(
    repeat: Repeat,
    anchor: NaiveDate,
    horizon_days: u32,
    deadline: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    let mut dates = match repeat {
        Repeat::None => vec![anchor],
        Repeat::Daily => daily_dates(anchor, horizon_days),
        Repeat::Weekly => weekly_dates(anchor, horizon_days),
        Repeat::Monthly => monthly_dates(anchor, horizon_days),
        Repeat::Yearly => yearly_dates(anchor, horizon_days),
    };

    if let Some(deadline) = deadline {
        dates.retain(|d| *d <= deadline);
    }
    dates.dedup();
    dates
}

/// Pick the anchor for a generation pass.
///
/// An explicit anchor wins; a one-off task with a deadline anchors on the
/// deadline; everything else starts from `today`.
pub fn resolve_anchor(task: &Task, anchor: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    match (anchor, task.repeat, task.deadline_date) {
        (Some(anchor), _, _) => anchor,
        (None, Repeat::None, Some(deadline)) => deadline,
        _ => today,
    }
}

/// Outcome of one task's generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenerationReport {
    pub task_id: String,
    /// Dates the repeat rule produced after deadline filtering
    pub candidates: u32,
    /// Rows actually created (the rest already existed)
    pub inserted: u32,
}

/// Outcome of a multi-task generation pass.
#[derive(Debug, Clone, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BatchGenerationReport {
    pub reports: Vec<GenerationReport>,
    /// Task IDs whose generation failed; other tasks are unaffected
    pub failed_task_ids: Vec<String>,
}

impl BatchGenerationReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed_task_ids.is_empty()
    }
}

/// Generates occurrences and records completions.
#[derive(Clone)]
pub struct OccurrenceService {
    store: SharedStore,
    max_horizon_days: u32,
}

impl OccurrenceService {
    pub fn new(store: SharedStore, max_horizon_days: u32) -> Self {
        Self {
            store,
            max_horizon_days,
        }
    }

    fn validate_horizon(&self, horizon_days: i64) -> Result<u32> {
        if horizon_days < 0 || horizon_days > self.max_horizon_days as i64 {
            return Err(AppError::BadRequest(format!(
                "horizon_days must be between 0 and {}",
                self.max_horizon_days
            )));
        }
        Ok(horizon_days as u32)
    }

    /// Generate occurrences for one task.
    ///
    /// Inserts run concurrently; the first store failure aborts the batch for
    /// this task and is returned.
    pub async fn generate(
        &self,
        task: &Task,
        anchor: Option<NaiveDate>,
        horizon_days: i64,
        today: NaiveDate,
    ) -> Result<GenerationReport> {
        let horizon_days = self.validate_horizon(horizon_days)?;
        let anchor = resolve_anchor(task, anchor, today);
        let dates = expand_occurrence_dates(task.repeat, anchor, horizon_days, task.deadline_date);

        let store = &self.store;
        let task_id = task.id.as_str();
        let inserted: Vec<bool> = stream::iter(dates.iter().copied())
            .map(|date| async move { store.insert_occurrence_if_absent(task_id, date).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .try_collect()
            .await?;

        let report = GenerationReport {
            task_id: task.id.clone(),
            candidates: dates.len() as u32,
            inserted: inserted.iter().filter(|created| **created).count() as u32,
        };

        tracing::info!(
            task_id = %task.id,
            repeat = %task.repeat,
            %anchor,
            horizon_days,
            candidates = report.candidates,
            inserted = report.inserted,
            "Occurrences generated"
        );

        Ok(report)
    }

    /// Generate occurrences for every task a user owns.
    ///
    /// Each task is independent: a failure is logged and reported, and the
    /// remaining tasks are still processed. Validation errors abort up front.
    pub async fn generate_for_user(
        &self,
        user_id: u64,
        horizon_days: i64,
        today: NaiveDate,
    ) -> Result<BatchGenerationReport> {
        self.validate_horizon(horizon_days)?;
        let tasks = self.store.list_tasks_by_user(user_id).await?;

        let mut batch = BatchGenerationReport::default();
        for task in &tasks {
            match self.generate(task, None, horizon_days, today).await {
                Ok(report) => batch.reports.push(report),
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        task_id = %task.id,
                        error = %e,
                        "Occurrence generation failed for task"
                    );
                    batch.failed_task_ids.push(task.id.clone());
                }
            }
        }

        if batch.is_complete_success() {
            tracing::info!(user_id, tasks = tasks.len(), "Generated occurrences for user");
        } else {
            tracing::warn!(
                user_id,
                failed = batch.failed_task_ids.len(),
                "Partial failure generating occurrences for user"
            );
        }

        Ok(batch)
    }

    /// Mark or unmark an occurrence, creating it if needed.
    ///
    /// `completed_at` is stamped with `now` on every call that marks the
    /// occurrence complete, including redundant ones.
    pub async fn set_completion(
        &self,
        task_id: &str,
        date: NaiveDate,
        completed: bool,
        seconds_logged: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Occurrence> {
        let seconds_logged = seconds_logged
            .map(|s| {
                u64::try_from(s).map_err(|_| {
                    AppError::BadRequest("seconds_logged must not be negative".to_string())
                })
            })
            .transpose()?;

        let completed_at = completed.then_some(now);
        let occurrence = self
            .store
            .upsert_completion(task_id, date, completed, completed_at, seconds_logged)
            .await?;

        tracing::info!(
            task_id,
            %date,
            completed,
            seconds_logged = ?occurrence.seconds_logged,
            "Completion recorded"
        );

        Ok(occurrence)
    }

    /// Occurrences for a task, optionally bounded by date (inclusive).
    pub async fn list(
        &self,
        task_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Occurrence>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::BadRequest(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }
        self.store.list_occurrences(task_id, from, to).await
    }
}
