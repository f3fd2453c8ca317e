// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress ledger: append-only minutes/count events for accumulative tasks.

use chrono::{DateTime, Duration, Utc};

use crate::db::SharedStore;
use crate::error::{AppError, Result};
use crate::models::{ProgressEvent, ProgressKind, ProgressSums, Task};
use crate::services::window::Window;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};

/// How far past the server clock a client-supplied timestamp may be.
pub const MAX_CLOCK_SKEW_SECONDS: i64 = 300;

/// Records and aggregates progress events.
#[derive(Clone)]
pub struct ProgressLedger {
    store: SharedStore,
}

impl ProgressLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Append one event for `task`.
    ///
    /// `at` defaults to `now`. Events for a metric the task does not track
    /// are rejected, as are timestamps before the task was created or more
    /// than [`MAX_CLOCK_SKEW_SECONDS`] in the future.
    pub async fn record(
        &self,
        task: &Task,
        user_id: u64,
        kind: ProgressKind,
        value: i64,
        at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ProgressEvent> {
        let value = u64::try_from(value)
            .map_err(|_| AppError::BadRequest("Progress value must not be negative".to_string()))?;

        let tracked = match kind {
            ProgressKind::Minutes => task.metric.timer_minutes.is_some(),
            ProgressKind::Count => task.metric.counter.is_some(),
        };
        if !tracked {
            return Err(AppError::BadRequest(format!(
                "Task {} does not track {:?} progress",
                task.id, kind
            )));
        }

        let at = at.unwrap_or(now);
        if at > now + Duration::seconds(MAX_CLOCK_SKEW_SECONDS) {
            return Err(AppError::BadRequest(format!(
                "Progress timestamp {} is in the future",
                format_utc_rfc3339(at)
            )));
        }
        let created = parse_rfc3339(&task.created_at)?;
        if at < created {
            return Err(AppError::BadRequest(format!(
                "Progress timestamp {} is before task {} was created",
                format_utc_rfc3339(at),
                task.id
            )));
        }

        let event = ProgressEvent {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            user_id,
            kind,
            value,
            at,
        };

        self.store.append_progress(&event).await?;

        tracing::debug!(
            task_id = %task.id,
            user_id,
            kind = ?kind,
            value,
            "Progress recorded"
        );

        Ok(event)
    }

    /// Sum of progress with `at` in `[start, end)`.
    pub async fn sum(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ProgressSums> {
        if end <= start {
            return Ok(ProgressSums::default());
        }
        self.store.sum_progress(task_id, user_id, start, end).await
    }

    /// Sums for each of `windows`, in the same order.
    ///
    /// Loads the events spanning all windows with a single store query and
    /// buckets them in memory. Windows may overlap.
    pub async fn window_sums(
        &self,
        task_id: &str,
        user_id: u64,
        windows: &[Window],
    ) -> Result<Vec<ProgressSums>> {
        let start = windows.iter().map(|w| w.start).min();
        let end = windows.iter().map(|w| w.end).max();
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(Vec::new());
        };
        if end <= start {
            return Ok(vec![ProgressSums::default(); windows.len()]);
        }

        let mut events = self.store.list_progress(task_id, user_id, start, end).await?;
        events.sort_by_key(|e| e.at);

        // prefix[i] holds the totals of events[..i]
        let mut prefix = Vec::with_capacity(events.len() + 1);
        let mut running = ProgressSums::default();
        prefix.push(running);
        for event in &events {
            running.add(event.kind, event.value);
            prefix.push(running);
        }

        Ok(windows
            .iter()
            .map(|window| {
                let lo = events.partition_point(|e| e.at < window.start);
                let hi = events.partition_point(|e| e.at < window.end).max(lo);
                ProgressSums {
                    minutes: prefix[hi].minutes.saturating_sub(prefix[lo].minutes),
                    count: prefix[hi].count.saturating_sub(prefix[lo].count),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Repeat, TaskMetric};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn counter_task() -> Task {
        Task {
            id: "pushups".to_string(),
            owner_user_id: 3,
            activity_name: "Push-ups".to_string(),
            metric: TaskMetric::counter(20),
            deadline_date: None,
            repeat: Repeat::Daily,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_and_sum() {
        let ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        let task = counter_task();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        ledger.record(&task, 3, ProgressKind::Count, 12, None, now).await.unwrap();
        ledger
            .record(&task, 3, ProgressKind::Count, 8, Some(now - chrono::Duration::hours(2)), now)
            .await
            .unwrap();

        let sums = ledger
            .sum(&task.id, 3, now - chrono::Duration::days(1), now + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(sums.count, 20);
        assert_eq!(sums.minutes, 0);
    }

    #[tokio::test]
    async fn test_rejects_negative_and_untracked() {
        let ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        let task = counter_task();
        let now = Utc::now();

        let err = ledger
            .record(&task, 3, ProgressKind::Count, -1, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = ledger
            .record(&task, 3, ProgressKind::Minutes, 5, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_rejects_future_and_pre_creation_timestamps() {
        let ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        let task = counter_task();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        let err = ledger
            .record(&task, 3, ProgressKind::Count, 5, Some(now + chrono::Duration::days(30)), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let ancient = Utc.with_ymd_and_hms(1000, 1, 1, 0, 0, 0).unwrap();
        let err = ledger
            .record(&task, 3, ProgressKind::Count, 5, Some(ancient), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Small clock skew is tolerated
        ledger
            .record(&task, 3, ProgressKind::Count, 5, Some(now + chrono::Duration::seconds(30)), now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_window_sums_buckets_one_query() {
        let ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        let task = counter_task();
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap();
        let midnight = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();

        for (d, h, value) in [(1, 9, 4), (1, 23, 1), (3, 0, 7), (4, 10, 2)] {
            let at = Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap();
            ledger
                .record(&task, 3, ProgressKind::Count, value, Some(at), now)
                .await
                .unwrap();
        }

        let windows: Vec<Window> = (1..=3)
            .map(|d| Window {
                start: midnight(d),
                end: midnight(d + 1),
            })
            .chain([Window {
                start: midnight(2),
                end: midnight(5),
            }])
            .collect();

        let sums = ledger.window_sums(&task.id, 3, &windows).await.unwrap();
        let counts: Vec<u64> = sums.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![5, 0, 7, 9]);
    }

    #[tokio::test]
    async fn test_empty_interval_sums_to_zero() {
        let ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let sums = ledger.sum("any", 1, now, now).await.unwrap();
        assert_eq!(sums, ProgressSums::default());
    }
}
