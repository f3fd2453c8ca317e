// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Window calculation for accumulative tasks.
//!
//! A window is the half-open span `[start, end)` over which progress is
//! summed for one repeat cycle. Boundaries are local midnights in the
//! caller's time zone, stored as UTC instants.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::{ProgressSums, Repeat, TaskMetric};
use crate::time_utils::{local_date, local_midnight};

/// Half-open time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The last millisecond inside the window.
    pub fn last_instant(&self) -> DateTime<Utc> {
        self.end - chrono::Duration::milliseconds(1)
    }
}

fn add_days(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// Local calendar days `[first, next)` covered by the window around `today`.
fn window_days(repeat: Repeat, deadline: Option<NaiveDate>, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match repeat {
        Repeat::Daily => (today, add_days(today, 1)),
        Repeat::Weekly => {
            let monday = today - Days::new(today.weekday().num_days_from_monday() as u64);
            (monday, add_days(monday, 7))
        }
        Repeat::Monthly => {
            let first = today.with_day(1).unwrap_or(today);
            let next = first.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
            (first, next)
        }
        Repeat::Yearly => {
            let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            let next = first.checked_add_months(Months::new(12)).unwrap_or(NaiveDate::MAX);
            (first, next)
        }
        // Runs from today through the deadline inclusive. A passed or missing
        // deadline degrades to a single-day window.
        Repeat::None => match deadline {
            Some(deadline) if deadline >= today => (today, add_days(deadline, 1)),
            _ => (today, add_days(today, 1)),
        },
    }
}

/// Window containing `reference` for a task with the given repeat rule.
pub fn window_bounds<Tz: TimeZone>(
    repeat: Repeat,
    deadline: Option<NaiveDate>,
    reference: DateTime<Utc>,
    tz: &Tz,
) -> Window {
    let today = local_date(tz, reference);
    let (first, next) = window_days(repeat, deadline, today);
    Window {
        start: local_midnight(tz, first),
        end: local_midnight(tz, next),
    }
}

/// The window following `window`.
///
/// Repeating tasks advance by one cycle. Non-repeating tasks advance the
/// window start by one local day.
pub fn next_window<Tz: TimeZone>(
    repeat: Repeat,
    deadline: Option<NaiveDate>,
    window: &Window,
    tz: &Tz,
) -> Window {
    let reference = if repeat.is_repeating() {
        window.end
    } else {
        local_midnight(tz, add_days(local_date(tz, window.start), 1))
    };
    window_bounds(repeat, deadline, reference, tz)
}

/// Did the sums in one window meet the task's target?
///
/// With both a timer and a counter target, meeting either one is enough.
/// Tasks without any target never succeed here.
pub fn window_success(metric: &TaskMetric, sums: &ProgressSums, threshold: f64) -> bool {
    let minutes_ok = metric
        .timer_minutes
        .map(|target| sums.minutes as f64 >= threshold * target as f64);
    let count_ok = metric
        .counter
        .map(|target| sums.count as f64 >= threshold * target as f64);

    match (minutes_ok, count_ok) {
        (None, None) => false,
        (a, b) => a.unwrap_or(false) || b.unwrap_or(false),
    }
}

/// Sequence of windows from the one containing `first` through the one
/// containing `now`, inclusive.
///
/// For non-repeating tasks with a deadline the walk never goes past the
/// deadline day.
pub struct WindowWalk<'a, Tz: TimeZone> {
    repeat: Repeat,
    deadline: Option<NaiveDate>,
    tz: &'a Tz,
    next: Option<Window>,
    last_start: DateTime<Utc>,
}

pub fn walk_windows<Tz: TimeZone>(
    repeat: Repeat,
    deadline: Option<NaiveDate>,
    first: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> WindowWalk<'_, Tz> {
    WindowWalk {
        repeat,
        deadline,
        tz,
        next: Some(window_bounds(repeat, deadline, first, tz)),
        last_start: window_bounds(repeat, deadline, now, tz).start,
    }
}

impl<Tz: TimeZone> Iterator for WindowWalk<'_, Tz> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let window = self.next.take()?;

        if !self.repeat.is_repeating() {
            if let Some(deadline) = self.deadline {
                if local_date(self.tz, window.start) > deadline {
                    return None;
                }
            }
        }

        if window.start < self.last_start {
            let following = next_window(self.repeat, self.deadline, &window, self.tz);
            if following.start > window.start {
                self.next = Some(following);
            }
        }

        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::offset_from_minutes;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_daily_window() {
        let w = window_bounds(Repeat::Daily, None, utc(2024, 3, 5, 15), &Utc);
        assert_eq!(w.start, utc(2024, 3, 5, 0));
        assert_eq!(w.end, utc(2024, 3, 6, 0));
    }

    #[test]
    fn test_weekly_window_starts_monday() {
        // 2024-01-10 is a Wednesday
        let w = window_bounds(Repeat::Weekly, None, utc(2024, 1, 10, 12), &Utc);
        assert_eq!(w.start, utc(2024, 1, 8, 0));
        assert_eq!(w.end, utc(2024, 1, 15, 0));

        // Sunday belongs to the week that started the previous Monday
        let w = window_bounds(Repeat::Weekly, None, utc(2024, 1, 14, 23), &Utc);
        assert_eq!(w.start, utc(2024, 1, 8, 0));
    }

    #[test]
    fn test_monthly_and_yearly_windows() {
        let w = window_bounds(Repeat::Monthly, None, utc(2024, 2, 29, 8), &Utc);
        assert_eq!(w.start, utc(2024, 2, 1, 0));
        assert_eq!(w.end, utc(2024, 3, 1, 0));

        let w = window_bounds(Repeat::Yearly, None, utc(2024, 12, 31, 23), &Utc);
        assert_eq!(w.start, utc(2024, 1, 1, 0));
        assert_eq!(w.end, utc(2025, 1, 1, 0));
    }

    #[test]
    fn test_one_off_window_runs_through_deadline() {
        let w = window_bounds(Repeat::None, Some(day("2024-03-10")), utc(2024, 3, 5, 9), &Utc);
        assert_eq!(w.start, utc(2024, 3, 5, 0));
        assert_eq!(w.end, utc(2024, 3, 11, 0));
        assert_eq!(
            w.last_instant(),
            Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()
                + chrono::Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_one_off_window_without_deadline_is_single_day() {
        let w = window_bounds(Repeat::None, None, utc(2024, 3, 5, 9), &Utc);
        assert_eq!(w.start, utc(2024, 3, 5, 0));
        assert_eq!(w.end, utc(2024, 3, 6, 0));

        // Deadline already passed
        let w = window_bounds(Repeat::None, Some(day("2024-03-01")), utc(2024, 3, 5, 9), &Utc);
        assert_eq!(w.end, utc(2024, 3, 6, 0));
    }

    #[test]
    fn test_window_respects_time_zone() {
        // 03:00 UTC on Jan 2 is still Jan 1 in UTC-8
        let tz = offset_from_minutes(-8 * 60).unwrap();
        let w = window_bounds(Repeat::Daily, None, utc(2024, 1, 2, 3), &tz);
        assert_eq!(w.start, utc(2024, 1, 1, 8));
        assert_eq!(w.end, utc(2024, 1, 2, 8));
    }

    #[test]
    fn test_next_window_advances_by_calendar_month() {
        let w = window_bounds(Repeat::Monthly, None, utc(2024, 1, 31, 12), &Utc);
        let next = next_window(Repeat::Monthly, None, &w, &Utc);
        assert_eq!(next.start, utc(2024, 2, 1, 0));
        assert_eq!(next.end, utc(2024, 3, 1, 0));
    }

    #[test]
    fn test_window_success_or_semantics() {
        let metric = TaskMetric {
            timer_minutes: Some(30),
            counter: Some(10),
        };
        assert!(window_success(&metric, &ProgressSums { minutes: 35, count: 0 }, 1.0));
        assert!(!window_success(&metric, &ProgressSums { minutes: 0, count: 0 }, 1.0));
        assert!(window_success(&metric, &ProgressSums { minutes: 0, count: 11 }, 1.0));
    }

    #[test]
    fn test_window_success_single_metric_and_threshold() {
        let metric = TaskMetric::counter(10);
        assert!(!window_success(&metric, &ProgressSums { minutes: 500, count: 9 }, 1.0));
        assert!(window_success(&metric, &ProgressSums { minutes: 0, count: 8 }, 0.8));

        let metric = TaskMetric::timer(20);
        assert!(window_success(&metric, &ProgressSums { minutes: 20, count: 0 }, 1.0));
    }

    #[test]
    fn test_window_success_boolean_task_is_false() {
        let sums = ProgressSums { minutes: 100, count: 100 };
        assert!(!window_success(&TaskMetric::boolean(), &sums, 1.0));
    }

    #[test]
    fn test_walk_daily_inclusive_of_current() {
        let windows: Vec<Window> =
            walk_windows(Repeat::Daily, None, utc(2024, 1, 1, 18), utc(2024, 1, 4, 2), &Utc)
                .collect();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].start, utc(2024, 1, 1, 0));
        assert_eq!(windows[3].start, utc(2024, 1, 4, 0));
    }

    #[test]
    fn test_walk_weekly_windows_are_contiguous() {
        let windows: Vec<Window> =
            walk_windows(Repeat::Weekly, None, utc(2024, 1, 3, 0), utc(2024, 1, 24, 0), &Utc)
                .collect();
        assert_eq!(windows.len(), 4);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_walk_one_off_stops_at_deadline() {
        let windows: Vec<Window> = walk_windows(
            Repeat::None,
            Some(day("2024-01-03")),
            utc(2024, 1, 1, 10),
            utc(2024, 1, 20, 10),
            &Utc,
        )
        .collect();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, utc(2024, 1, 1, 0));
        assert_eq!(windows[2].start, utc(2024, 1, 3, 0));
        assert!(windows.iter().all(|w| w.end == utc(2024, 1, 4, 0)));
    }

    #[test]
    fn test_walk_single_window_when_first_is_now() {
        let now = utc(2024, 5, 5, 5);
        let windows: Vec<Window> = walk_windows(Repeat::Yearly, None, now, now, &Utc).collect();
        assert_eq!(windows.len(), 1);
    }
}
