// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak computation.
//!
//! Two algorithms:
//! - boolean tasks: runs of consecutive completed occurrence days;
//! - accumulative tasks: a walk over repeat windows from the first progress
//!   event to the window containing "now", scoring each window against the
//!   task's target.
//!
//! Every recompute walks the full history and is persisted with a
//! max-merge on the best streak, so concurrent or repeated recomputes are safe.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::SharedStore;
use crate::error::Result;
use crate::models::{StreakSummary, Task};
use crate::services::progress::ProgressLedger;
use crate::services::window::{walk_windows, window_bounds, window_success, Window};
use crate::time_utils::{local_date, parse_rfc3339};

/// Current and best run over a set of "hit" days.
///
/// The current run only counts if its last day is `today` or yesterday.
/// Days after `today` are ignored.
pub fn day_streaks<I>(hit_days: I, today: NaiveDate) -> StreakSummary
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = hit_days.into_iter().filter(|d| *d <= today).collect();

    let mut best = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for day in &days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(*day);
    }

    let last_done = days.last().copied();
    let current = match last_done {
        Some(last) if (today - last).num_days() <= 1 => run,
        _ => 0,
    };

    StreakSummary {
        current,
        best,
        last_done,
    }
}

/// Streak for one task, as returned to dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TaskStreak {
    pub task_id: String,
    pub activity_name: String,
    pub accumulative: bool,
    #[serde(flatten)]
    pub streak: StreakSummary,
}

/// Per-task streaks plus the cross-task streak for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStreaks {
    pub tasks: Vec<TaskStreak>,
    pub overall: StreakSummary,
}

/// Computes and persists streaks.
#[derive(Clone)]
pub struct StreakEngine {
    store: SharedStore,
    progress: ProgressLedger,
    threshold: f64,
}

impl StreakEngine {
    pub fn new(store: SharedStore, threshold: f64) -> Self {
        Self {
            progress: ProgressLedger::new(store.clone()),
            store,
            threshold,
        }
    }

    /// Recompute the windowed streak of an accumulative task from scratch.
    pub async fn recompute_accumulative<Tz: TimeZone>(
        &self,
        task: &Task,
        user_id: u64,
        tz: &Tz,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let current_window = window_bounds(task.repeat, task.deadline_date, now, tz);
        let created = parse_rfc3339(&task.created_at).ok();

        // The walk starts no earlier than the task and never after the
        // window containing `now`.
        let first = self
            .store
            .earliest_progress_timestamp(&task.id, user_id)
            .await?
            .map(|at| created.map_or(at, |created| at.max(created)))
            .filter(|at| *at < current_window.end);

        let Some(first) = first else {
            // No history: reset current, keep whatever best was stored.
            let state = self.store.upsert_streak_state(&task.id, 0, 0, None).await?;
            return Ok(StreakSummary {
                current: 0,
                best: state.best_streak,
                last_done: None,
            });
        };

        let windows: Vec<Window> =
            walk_windows(task.repeat, task.deadline_date, first, now, tz).collect();
        let sums = self.progress.window_sums(&task.id, user_id, &windows).await?;

        let mut current = 0u32;
        let mut best = 0u32;
        let mut last_done = None;

        for (window, sums) in windows.iter().zip(&sums) {
            if window_success(&task.metric, sums, threshold) {
                current += 1;
                best = best.max(current);
                last_done = Some(local_date(tz, window.last_instant()));
            } else {
                current = 0;
            }
        }

        let state = self
            .store
            .upsert_streak_state(&task.id, current, best, last_done)
            .await?;

        tracing::debug!(
            task_id = %task.id,
            user_id,
            windows = windows.len(),
            current,
            best = state.best_streak,
            "Accumulative streak recomputed"
        );

        Ok(StreakSummary {
            current,
            best: state.best_streak,
            last_done,
        })
    }

    /// Recompute the day-run streak of a boolean task from its occurrences.
    pub async fn recompute_boolean<Tz: TimeZone>(
        &self,
        task: &Task,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let today = local_date(tz, now);
        let occurrences = self.store.list_occurrences(&task.id, None, None).await?;
        let computed = day_streaks(
            occurrences
                .iter()
                .filter(|o| o.completed)
                .map(|o| o.occurred_on),
            today,
        );

        let state = self
            .store
            .upsert_streak_state(&task.id, computed.current, computed.best, computed.last_done)
            .await?;

        Ok(StreakSummary {
            best: state.best_streak,
            ..computed
        })
    }

    /// Streak for a task, picking the algorithm from its metric.
    pub async fn task_streak<Tz: TimeZone>(
        &self,
        task: &Task,
        user_id: u64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        if task.is_accumulative() {
            self.recompute_accumulative(task, user_id, tz, self.threshold, now)
                .await
        } else {
            self.recompute_boolean(task, tz, now).await
        }
    }

    /// Streak for a task by id; unknown or foreign tasks report zeros.
    pub async fn task_streak_by_id<Tz: TimeZone>(
        &self,
        task_id: &str,
        user_id: u64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        match self.store.get_task(task_id).await? {
            Some(task) if task.owner_user_id == user_id => {
                self.task_streak(&task, user_id, tz, now).await
            }
            _ => {
                tracing::debug!(task_id, user_id, "Streak requested for unknown task");
                Ok(StreakSummary::default())
            }
        }
    }

    /// Consecutive days on which the user completed at least one task.
    pub async fn overall_streak<Tz: TimeZone>(
        &self,
        user_id: u64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let tasks = self.store.list_tasks_by_user(user_id).await?;
        self.overall_for_tasks(&tasks, tz, now).await
    }

    async fn overall_for_tasks<Tz: TimeZone>(
        &self,
        tasks: &[Task],
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let mut hit_days = BTreeSet::new();
        for task in tasks {
            let occurrences = self.store.list_occurrences(&task.id, None, None).await?;
            hit_days.extend(
                occurrences
                    .iter()
                    .filter(|o| o.completed)
                    .map(|o| o.occurred_on),
            );
        }
        Ok(day_streaks(hit_days, local_date(tz, now)))
    }

    /// Every task's streak plus the overall streak.
    pub async fn user_streaks<Tz: TimeZone>(
        &self,
        user_id: u64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<UserStreaks> {
        let tasks = self.store.list_tasks_by_user(user_id).await?;

        let mut streaks = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let streak = self.task_streak(task, user_id, tz, now).await?;
            streaks.push(TaskStreak {
                task_id: task.id.clone(),
                activity_name: task.activity_name.clone(),
                accumulative: task.is_accumulative(),
                streak,
            });
        }

        let overall = self.overall_for_tasks(&tasks, tz, now).await?;

        Ok(UserStreaks {
            tasks: streaks,
            overall,
        })
    }
}
