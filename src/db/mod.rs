//! Persistence layer.
//!
//! Everything the engine needs from storage goes through [`HabitStore`].
//! Production uses Firestore; [`MemoryStore`] backs local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Occurrence, ProgressEvent, ProgressSums, StreakState, Task};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const TASKS: &str = "tasks";
    /// Keyed by `{task_id}_{YYYY-MM-DD}`
    pub const OCCURRENCES: &str = "occurrences";
    pub const PROGRESS_EVENTS: &str = "progress_events";
    /// Streak aggregates (keyed by task_id)
    pub const STREAK_STATES: &str = "streak_states";
}

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn HabitStore>;

/// Store operations used by the recurrence and streak engine.
///
/// Implementations must make `insert_occurrence_if_absent` and
/// `upsert_completion` safe under concurrent calls for the same
/// `(task_id, date)` without caller-side locking.
#[async_trait]
pub trait HabitStore: Send + Sync {
    // ─── Tasks ───────────────────────────────────────────────────

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, AppError>;

    /// Create or replace a task definition. Never touches occurrences.
    async fn upsert_task(&self, task: &Task) -> Result<(), AppError>;

    /// Delete a task with its occurrences and streak state.
    ///
    /// Progress events are left in place. Returns the number of documents deleted.
    async fn delete_task(&self, task_id: &str) -> Result<usize, AppError>;

    /// All tasks owned by a user, in [`Task::display_order`].
    async fn list_tasks_by_user(&self, user_id: u64) -> Result<Vec<Task>, AppError>;

    // ─── Occurrences ─────────────────────────────────────────────

    /// Insert a pending occurrence unless one already exists for the day.
    ///
    /// Returns `true` if a row was created. An existing row is left untouched
    /// and is not an error.
    async fn insert_occurrence_if_absent(
        &self,
        task_id: &str,
        date: NaiveDate,
    ) -> Result<bool, AppError>;

    /// Create the occurrence if needed, then apply a completion update via
    /// [`Occurrence::apply_completion`]. Returns the resulting row.
    async fn upsert_completion(
        &self,
        task_id: &str,
        date: NaiveDate,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        seconds_logged: Option<u64>,
    ) -> Result<Occurrence, AppError>;

    /// Occurrences for a task ordered by date, optionally bounded (inclusive).
    async fn list_occurrences(
        &self,
        task_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Occurrence>, AppError>;

    // ─── Progress Ledger ─────────────────────────────────────────

    async fn append_progress(&self, event: &ProgressEvent) -> Result<(), AppError>;

    /// Events with `at` in `[start, end)`, in no particular order.
    async fn list_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProgressEvent>, AppError>;

    /// Sum events with `at` in `[start, end)`, by kind.
    async fn sum_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ProgressSums, AppError>;

    async fn earliest_progress_timestamp(
        &self,
        task_id: &str,
        user_id: u64,
    ) -> Result<Option<DateTime<Utc>>, AppError>;

    // ─── Streak State ────────────────────────────────────────────

    async fn get_streak_state(&self, task_id: &str) -> Result<Option<StreakState>, AppError>;

    /// Persist a recompute; the stored best becomes `max(stored, best)`.
    async fn upsert_streak_state(
        &self,
        task_id: &str,
        current: u32,
        best: u32,
        last_done_day: Option<NaiveDate>,
    ) -> Result<StreakState, AppError>;
}
