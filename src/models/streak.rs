// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cached streak state per task.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored streak aggregate (keyed by task_id).
///
/// Rewritten wholesale on every recompute. `best_streak` only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub task_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub last_done_day: Option<NaiveDate>,
    /// Last recompute timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl StreakState {
    pub fn empty(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            current_streak: 0,
            best_streak: 0,
            last_done_day: None,
            updated_at: String::new(),
        }
    }

    /// Merge a fresh recompute into the stored state.
    pub fn merge(
        &mut self,
        current: u32,
        best: u32,
        last_done_day: Option<NaiveDate>,
        now: &str,
    ) {
        self.current_streak = current;
        self.best_streak = self.best_streak.max(best).max(current);
        self.last_done_day = last_done_day;
        self.updated_at = now.to_string();
    }
}

/// Result of a streak computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
    pub last_done: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_best_monotonic() {
        let mut state = StreakState::empty("t");
        state.merge(4, 7, None, "now");
        assert_eq!(state.best_streak, 7);

        // A truncated walk can report a smaller best
        state.merge(1, 3, None, "later");
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.best_streak, 7);
    }

    #[test]
    fn test_merge_best_at_least_current() {
        let mut state = StreakState::empty("t");
        state.merge(5, 2, None, "now");
        assert!(state.best_streak >= state.current_streak);
    }
}
