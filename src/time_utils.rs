// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and local calendar math.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    SecondsFormat, TimeZone, Utc,
};

use crate::error::AppError;

/// Largest accepted UTC offset, in minutes (UTC+14:00).
pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest(format!("Invalid timestamp '{}': expected RFC3339", raw)))
}

/// Build a fixed-offset time zone from minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, AppError> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(AppError::BadRequest(format!(
            "Time zone offset {} out of range (±{} minutes)",
            minutes, MAX_OFFSET_MINUTES
        )));
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid time zone offset {}", minutes)))
}

/// A caller's time zone: an IANA zone with DST rules, or a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallerTz {
    Fixed(FixedOffset),
    Named(chrono_tz::Tz),
}

/// Offset in effect for a [`CallerTz`] at some instant.
#[derive(Debug, Clone, Copy)]
pub enum CallerOffset {
    Fixed(FixedOffset),
    Named(chrono_tz::TzOffset),
}

impl CallerTz {
    /// Resolve a zone from an IANA name, falling back to a fixed offset.
    ///
    /// The name wins when both are given.
    pub fn resolve(name: Option<&str>, offset_minutes: i32) -> Result<Self, AppError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name
                .parse::<chrono_tz::Tz>()
                .map(CallerTz::Named)
                .map_err(|_| AppError::BadRequest(format!("Unknown time zone '{}'", name))),
            None => offset_from_minutes(offset_minutes).map(CallerTz::Fixed),
        }
    }
}

impl Offset for CallerOffset {
    fn fix(&self) -> FixedOffset {
        match self {
            CallerOffset::Fixed(offset) => *offset,
            CallerOffset::Named(offset) => offset.fix(),
        }
    }
}

impl TimeZone for CallerTz {
    type Offset = CallerOffset;

    fn from_offset(offset: &CallerOffset) -> Self {
        match offset {
            CallerOffset::Fixed(offset) => CallerTz::Fixed(*offset),
            CallerOffset::Named(offset) => CallerTz::Named(chrono_tz::Tz::from_offset(offset)),
        }
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<CallerOffset> {
        match self {
            CallerTz::Fixed(tz) => tz.offset_from_local_date(local).map(CallerOffset::Fixed),
            CallerTz::Named(tz) => tz.offset_from_local_date(local).map(CallerOffset::Named),
        }
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<CallerOffset> {
        match self {
            CallerTz::Fixed(tz) => tz.offset_from_local_datetime(local).map(CallerOffset::Fixed),
            CallerTz::Named(tz) => tz.offset_from_local_datetime(local).map(CallerOffset::Named),
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> CallerOffset {
        match self {
            CallerTz::Fixed(tz) => CallerOffset::Fixed(tz.offset_from_utc_date(utc)),
            CallerTz::Named(tz) => CallerOffset::Named(tz.offset_from_utc_date(utc)),
        }
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> CallerOffset {
        match self {
            CallerTz::Fixed(tz) => CallerOffset::Fixed(tz.offset_from_utc_datetime(utc)),
            CallerTz::Named(tz) => CallerOffset::Named(tz.offset_from_utc_datetime(utc)),
        }
    }
}

/// Calendar date of `instant` as seen in `tz`.
pub fn local_date<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// The instant local midnight begins on `date` in `tz`.
///
/// Ambiguous midnights take the earlier instant. A midnight skipped by a DST
/// transition resolves to the first valid local minute after it.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Gaps are at most a few hours; scan forward minute by minute.
            let mut candidate = midnight;
            for _ in 0..(24 * 60) {
                candidate += chrono::Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&midnight)
        }
    }
}
