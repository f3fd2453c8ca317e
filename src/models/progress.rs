// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress ledger entries for accumulative tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Unit of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Minutes,
    Count,
}

impl FromStr for ProgressKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutes" | "timer" => Ok(ProgressKind::Minutes),
            "count" | "counter" => Ok(ProgressKind::Count),
            other => Err(format!("Unknown progress kind: {}", other)),
        }
    }
}

/// Append-only progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event ID (also used as document ID)
    pub id: String,
    pub task_id: String,
    pub user_id: u64,
    pub kind: ProgressKind,
    pub value: u64,
    /// Real time of the event, stored as epoch milliseconds for range queries
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

/// Progress totals over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProgressSums {
    pub minutes: u64,
    pub count: u64,
}

impl ProgressSums {
    /// Fold one event into the totals.
    pub fn add(&mut self, kind: ProgressKind, value: u64) {
        match kind {
            ProgressKind::Minutes => self.minutes = self.minutes.saturating_add(value),
            ProgressKind::Count => self.count = self.count.saturating_add(value),
        }
    }
}
