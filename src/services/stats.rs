// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side rollups for dashboard charts.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::db::SharedStore;
use crate::error::{AppError, Result};
use crate::models::stats::percent;
use crate::models::{Granularity, Occurrence, ProgressBucket, Task, WindowProgress};
use crate::services::progress::ProgressLedger;
use crate::services::window::{window_bounds, window_success, Window};
use crate::time_utils::{local_date, local_midnight};

/// Largest number of buckets a chart query may request.
pub const MAX_BUCKETS: i64 = 366;

/// Builds completion and progress aggregates.
#[derive(Clone)]
pub struct StatsAggregator {
    store: SharedStore,
    progress: ProgressLedger,
    threshold: f64,
}

impl StatsAggregator {
    pub fn new(store: SharedStore, threshold: f64) -> Self {
        Self {
            progress: ProgressLedger::new(store.clone()),
            store,
            threshold,
        }
    }

    /// Completion percentage per bucket for all of a user's tasks.
    ///
    /// Returns `buckets` consecutive buckets, oldest first, the last one
    /// containing the user's local today. Each occurrence counts once. An
    /// accumulative task's occurrence is also done when the progress logged in
    /// its repeat window met the target.
    pub async fn completion_series<Tz: TimeZone>(
        &self,
        user_id: u64,
        granularity: Granularity,
        buckets: i64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressBucket>> {
        if !(1..=MAX_BUCKETS).contains(&buckets) {
            return Err(AppError::BadRequest(format!(
                "buckets must be between 1 and {}",
                MAX_BUCKETS
            )));
        }

        let today = local_date(tz, now);
        let series = build_buckets(granularity, buckets, today)?;
        let (Some(from), Some(to)) = (
            series.first().map(|b| b.start_date),
            series.last().map(|b| b.end_date),
        ) else {
            return Ok(series);
        };

        let tasks = self.store.list_tasks_by_user(user_id).await?;
        let mut series = series;
        let index: BTreeMap<NaiveDate, usize> = series
            .iter()
            .enumerate()
            .map(|(i, b)| (b.start_date, i))
            .collect();

        for task in &tasks {
            let occurrences = self
                .store
                .list_occurrences(&task.id, Some(from), Some(to))
                .await?;
            let done = self.occurrences_done(task, user_id, &occurrences, tz).await?;
            for (occ, done) in occurrences.iter().zip(done) {
                let start = granularity.bucket_start(occ.occurred_on);
                if let Some(&i) = index.get(&start) {
                    series[i].record(done);
                }
            }
        }

        tracing::debug!(
            user_id,
            granularity = ?granularity,
            buckets,
            tasks = tasks.len(),
            "Completion series built"
        );

        Ok(series)
    }

    /// Whether each occurrence counts as done, in the same order.
    async fn occurrences_done<Tz: TimeZone>(
        &self,
        task: &Task,
        user_id: u64,
        occurrences: &[Occurrence],
        tz: &Tz,
    ) -> Result<Vec<bool>> {
        if !task.is_accumulative() {
            return Ok(occurrences.iter().map(|o| o.completed).collect());
        }

        let windows: Vec<Window> = occurrences
            .iter()
            .map(|o| {
                window_bounds(
                    task.repeat,
                    task.deadline_date,
                    local_midnight(tz, o.occurred_on),
                    tz,
                )
            })
            .collect();
        let sums = self.progress.window_sums(&task.id, user_id, &windows).await?;

        Ok(occurrences
            .iter()
            .zip(&sums)
            .map(|(o, sums)| o.completed || window_success(&task.metric, sums, self.threshold))
            .collect())
    }

    /// Progress in the window containing `now`.
    ///
    /// Accumulative tasks report the best fraction of any set target (capped
    /// at 100%). Boolean tasks report 100% once any occurrence inside the
    /// window is done.
    pub async fn window_progress<Tz: TimeZone>(
        &self,
        task: &Task,
        user_id: u64,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<WindowProgress> {
        let window = window_bounds(task.repeat, task.deadline_date, now, tz);

        if !task.is_accumulative() {
            let first_day = local_date(tz, window.start);
            let last_day = local_date(tz, window.last_instant());
            let done = self
                .store
                .list_occurrences(&task.id, Some(first_day), Some(last_day))
                .await?
                .iter()
                .any(|o| o.completed);
            return Ok(WindowProgress {
                task_id: task.id.clone(),
                window_start: window.start,
                window_end: window.end,
                sums: Default::default(),
                percent: if done { 100.0 } else { 0.0 },
                success: done,
            });
        }

        let sums = self
            .progress
            .sum(&task.id, user_id, window.start, window.end)
            .await?;

        let minutes_pct = task
            .metric
            .timer_minutes
            .map(|target| percent(sums.minutes as f64, target as f64));
        let count_pct = task
            .metric
            .counter
            .map(|target| percent(sums.count as f64, target as f64));
        let best_pct = minutes_pct
            .into_iter()
            .chain(count_pct)
            .fold(0.0f64, f64::max)
            .min(100.0);

        Ok(WindowProgress {
            task_id: task.id.clone(),
            window_start: window.start,
            window_end: window.end,
            sums,
            percent: best_pct,
            success: window_success(&task.metric, &sums, self.threshold),
        })
    }
}

/// Empty buckets ending with the one that contains `today`.
fn build_buckets(
    granularity: Granularity,
    buckets: i64,
    today: NaiveDate,
) -> Result<Vec<ProgressBucket>> {
    let out_of_range = || AppError::BadRequest("Requested range is out of bounds".to_string());

    let last_start = granularity.bucket_start(today);
    let first_start = granularity
        .shift(last_start, -(buckets - 1))
        .ok_or_else(out_of_range)?;

    let mut series = Vec::with_capacity(buckets as usize);
    for i in 0..buckets {
        let start = granularity.shift(first_start, i).ok_or_else(out_of_range)?;
        let end = granularity
            .shift(start, 1)
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .ok_or_else(out_of_range)?;
        series.push(ProgressBucket::new(granularity.label(start), start, end));
    }
    Ok(series)
}
