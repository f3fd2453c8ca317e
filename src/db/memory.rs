// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Per-row
//! atomicity comes from DashMap's entry locks, mirroring the document-level
//! guarantees of the Firestore store.

use crate::db::HabitStore;
use crate::error::AppError;
use crate::models::{Occurrence, ProgressEvent, ProgressSums, StreakState, Task};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    tasks: DashMap<String, Task>,
    /// Keyed by `Occurrence::document_id`
    occurrences: DashMap<String, Occurrence>,
    /// Ledger per task_id, in append order
    progress: DashMap<String, Vec<ProgressEvent>>,
    streaks: DashMap<String, StreakState>,
    unavailable: AtomicBool,
    /// Tasks whose occurrence writes fail while the rest of the store works
    failing_tasks: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make occurrence writes for one task fail until cleared.
    pub fn set_task_failing(&self, task_id: &str, failing: bool) {
        if failing {
            self.failing_tasks.insert(task_id.to_string());
        } else {
            self.failing_tasks.remove(task_id);
        }
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "Store unavailable (memory store offline)".to_string(),
            ));
        }
        Ok(())
    }

    fn check_task_writable(&self, task_id: &str) -> Result<(), AppError> {
        self.check_available()?;
        if self.failing_tasks.contains(task_id) {
            return Err(AppError::Database(format!(
                "Occurrence write failed for task {}",
                task_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HabitStore for MemoryStore {
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, AppError> {
        self.check_available()?;
        Ok(self.tasks.get(task_id).map(|t| t.clone()))
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), AppError> {
        self.check_available()?;
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<usize, AppError> {
        self.check_available()?;
        let mut deleted = 0;

        let before = self.occurrences.len();
        self.occurrences.retain(|_, occ| occ.task_id != task_id);
        deleted += before - self.occurrences.len();

        if self.streaks.remove(task_id).is_some() {
            deleted += 1;
        }
        if self.tasks.remove(task_id).is_some() {
            deleted += 1;
        }

        tracing::debug!(task_id, deleted, "Deleted task (memory store)");
        Ok(deleted)
    }

    async fn list_tasks_by_user(&self, user_id: u64) -> Result<Vec<Task>, AppError> {
        self.check_available()?;
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.owner_user_id == user_id)
            .map(|t| t.clone())
            .collect();
        tasks.sort_by(Task::display_order);
        Ok(tasks)
    }

    async fn insert_occurrence_if_absent(
        &self,
        task_id: &str,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        self.check_task_writable(task_id)?;
        match self.occurrences.entry(Occurrence::document_id(task_id, date)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Occurrence::pending(task_id, date));
                Ok(true)
            }
        }
    }

    async fn upsert_completion(
        &self,
        task_id: &str,
        date: NaiveDate,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        seconds_logged: Option<u64>,
    ) -> Result<Occurrence, AppError> {
        self.check_task_writable(task_id)?;
        let mut row = self
            .occurrences
            .entry(Occurrence::document_id(task_id, date))
            .or_insert_with(|| Occurrence::pending(task_id, date));
        row.apply_completion(completed, completed_at, seconds_logged);
        Ok(row.clone())
    }

    async fn list_occurrences(
        &self,
        task_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Occurrence>, AppError> {
        self.check_available()?;
        let mut rows: Vec<Occurrence> = self
            .occurrences
            .iter()
            .filter(|occ| occ.task_id == task_id)
            .filter(|occ| from.map_or(true, |f| occ.occurred_on >= f))
            .filter(|occ| to.map_or(true, |t| occ.occurred_on <= t))
            .map(|occ| occ.clone())
            .collect();
        rows.sort_by_key(|occ| occ.occurred_on);
        Ok(rows)
    }

    async fn append_progress(&self, event: &ProgressEvent) -> Result<(), AppError> {
        self.check_available()?;
        self.progress
            .entry(event.task_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn list_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProgressEvent>, AppError> {
        self.check_available()?;
        Ok(self
            .progress
            .get(task_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.user_id == user_id && e.at >= start && e.at < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn sum_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ProgressSums, AppError> {
        let mut sums = ProgressSums::default();
        for event in self.list_progress(task_id, user_id, start, end).await? {
            sums.add(event.kind, event.value);
        }
        Ok(sums)
    }

    async fn earliest_progress_timestamp(
        &self,
        task_id: &str,
        user_id: u64,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        self.check_available()?;
        Ok(self.progress.get(task_id).and_then(|events| {
            events
                .iter()
                .filter(|e| e.user_id == user_id)
                .map(|e| e.at)
                .min()
        }))
    }

    async fn get_streak_state(&self, task_id: &str) -> Result<Option<StreakState>, AppError> {
        self.check_available()?;
        Ok(self.streaks.get(task_id).map(|s| s.clone()))
    }

    async fn upsert_streak_state(
        &self,
        task_id: &str,
        current: u32,
        best: u32,
        last_done_day: Option<NaiveDate>,
    ) -> Result<StreakState, AppError> {
        self.check_available()?;
        let now = crate::time_utils::format_utc_rfc3339(Utc::now());
        let mut state = self
            .streaks
            .entry(task_id.to_string())
            .or_insert_with(|| StreakState::empty(task_id));
        state.merge(current, best, last_done_day, &now);
        Ok(state.clone())
    }
}
