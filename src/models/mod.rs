// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod occurrence;
pub mod progress;
pub mod stats;
pub mod streak;
pub mod task;

pub use occurrence::Occurrence;
pub use progress::{ProgressEvent, ProgressKind, ProgressSums};
pub use stats::{Granularity, ProgressBucket, WindowProgress};
pub use streak::{StreakState, StreakSummary};
pub use task::{Repeat, Task, TaskMetric};
