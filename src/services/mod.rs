// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - recurrence and streak engine.

pub mod occurrences;
pub mod progress;
pub mod stats;
pub mod streak;
pub mod window;

pub use occurrences::{BatchGenerationReport, GenerationReport, OccurrenceService};
pub use progress::ProgressLedger;
pub use stats::StatsAggregator;
pub use streak::{StreakEngine, TaskStreak, UserStreaks};
pub use window::{window_bounds, window_success, Window};
