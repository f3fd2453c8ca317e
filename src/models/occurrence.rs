// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Occurrence model: one expected instance of a task on one calendar day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stored occurrence record.
///
/// Identity is `(task_id, occurred_on)`; see [`Occurrence::document_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub task_id: String,
    /// Calendar day this occurrence is due (YYYY-MM-DD)
    pub occurred_on: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    /// Set by the server when the occurrence is marked complete
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Tracked seconds; never decreases
    #[serde(default)]
    pub seconds_logged: Option<u64>,
}

impl Occurrence {
    /// A fresh, not-yet-completed occurrence.
    pub fn pending(task_id: &str, occurred_on: NaiveDate) -> Self {
        Self {
            task_id: task_id.to_string(),
            occurred_on,
            completed: false,
            completed_at: None,
            seconds_logged: None,
        }
    }

    /// Document ID enforcing one occurrence per task per day.
    pub fn document_id(task_id: &str, occurred_on: NaiveDate) -> String {
        format!("{}_{}", task_id, occurred_on.format("%Y-%m-%d"))
    }

    /// Apply a completion update in place.
    ///
    /// `completed_at` follows `completed` (set to `now` on every call with
    /// `completed = true`, cleared otherwise). `seconds_logged` merges by max.
    pub fn apply_completion(
        &mut self,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        seconds_logged: Option<u64>,
    ) {
        self.completed = completed;
        self.completed_at = if completed { completed_at } else { None };
        self.seconds_logged = match (self.seconds_logged, seconds_logged) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => old.or(new),
        };
    }
}
