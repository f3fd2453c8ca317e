// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task (habit) definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How often a task recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// One-off task
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Repeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repeat::None => "none",
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Monthly => "monthly",
            Repeat::Yearly => "yearly",
        }
    }

    pub fn is_repeating(&self) -> bool {
        !matches!(self, Repeat::None)
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a repeat rule string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown repeat value: {0}")]
pub struct UnknownRepeat(pub String);

impl FromStr for Repeat {
    type Err = UnknownRepeat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Repeat::None),
            "daily" => Ok(Repeat::Daily),
            "weekly" => Ok(Repeat::Weekly),
            "monthly" => Ok(Repeat::Monthly),
            "yearly" => Ok(Repeat::Yearly),
            other => Err(UnknownRepeat(other.to_string())),
        }
    }
}

/// Target a task is measured against.
///
/// Both fields unset means a plain boolean (checkbox) habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TaskMetric {
    /// Minutes of tracked time per window
    #[serde(default)]
    pub timer_minutes: Option<u32>,
    /// Number of repetitions per window
    #[serde(default)]
    pub counter: Option<u32>,
}

impl TaskMetric {
    pub fn boolean() -> Self {
        Self::default()
    }

    pub fn timer(minutes: u32) -> Self {
        Self {
            timer_minutes: Some(minutes),
            counter: None,
        }
    }

    pub fn counter(target: u32) -> Self {
        Self {
            timer_minutes: None,
            counter: Some(target),
        }
    }

    pub fn is_accumulative(&self) -> bool {
        self.timer_minutes.is_some() || self.counter.is_some()
    }
}

/// Stored task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task ID (also used as document ID)
    pub id: String,
    /// Owning user
    pub owner_user_id: u64,
    pub activity_name: String,
    #[serde(default)]
    pub metric: TaskMetric,
    /// No occurrence is generated after this date
    #[serde(default)]
    pub deadline_date: Option<NaiveDate>,
    #[serde(default)]
    pub repeat: Repeat,
    /// When this task was created (ISO 8601)
    pub created_at: String,
}

impl Task {
    pub fn is_accumulative(&self) -> bool {
        self.metric.is_accumulative()
    }

    /// Total order used when listing tasks: earliest deadline first, tasks
    /// without a deadline last, ties broken by id.
    pub fn display_order(a: &Task, b: &Task) -> Ordering {
        let by_deadline = match (a.deadline_date, b.deadline_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_deadline.then_with(|| a.id.cmp(&b.id))
    }
}
