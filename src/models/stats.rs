//! Chart aggregates for dashboard queries.
//!
//! These are computed on read from occurrences and the progress ledger;
//! nothing here is persisted.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ProgressSums;

/// Bucket size for completion charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Granularity::Daily),
            "weekly" | "week" => Ok(Granularity::Weekly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            other => Err(format!("Unknown granularity: {}", other)),
        }
    }
}

impl Granularity {
    /// First day of the bucket containing `day`.
    pub fn bucket_start(&self, day: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => day,
            Granularity::Weekly => {
                day - chrono::Duration::days(day.weekday().num_days_from_monday() as i64)
            }
            Granularity::Monthly => day.with_day(1).unwrap_or(day),
        }
    }

    /// First day of the bucket `steps` buckets after the one starting at `start`.
    /// Negative steps move backwards.
    pub fn shift(&self, start: NaiveDate, steps: i64) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => start.checked_add_signed(chrono::Duration::days(steps)),
            Granularity::Weekly => start.checked_add_signed(chrono::Duration::weeks(steps)),
            Granularity::Monthly => {
                let months = Months::new(steps.unsigned_abs() as u32);
                if steps >= 0 {
                    start.checked_add_months(months)
                } else {
                    start.checked_sub_months(months)
                }
            }
        }
    }

    /// Human label for a bucket ("2024-01-15", "2024-W03", "2024-01").
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            Granularity::Daily => start.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => start.format("%Y-%m").to_string(),
        }
    }
}

/// Completion rollup for one chart bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProgressBucket {
    pub label: String,
    /// First day in the bucket (inclusive)
    pub start_date: NaiveDate,
    /// Last day in the bucket (inclusive)
    pub end_date: NaiveDate,
    pub completed: u32,
    pub total: u32,
    /// Percent complete, one decimal place
    pub percent: f64,
}

impl ProgressBucket {
    pub fn new(label: String, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            label,
            start_date,
            end_date,
            completed: 0,
            total: 0,
            percent: 0.0,
        }
    }

    /// Count one occurrence falling into this bucket.
    pub fn record(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
        self.percent = percent(self.completed as f64, self.total as f64);
    }
}

/// Progress towards the target in the window containing "now".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WindowProgress {
    pub task_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub sums: ProgressSums,
    pub percent: f64,
    pub success: bool,
}

/// `part / whole` as a percentage rounded to one decimal, 0 for an empty whole.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    ((part / whole) * 1000.0).round() / 10.0
}
