// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling primitives: delay arithmetic and timezone-aware send windows.
//!
//! `add_delay` is exact wall-clock addition in UTC with no DST adjustment;
//! `next_time_of_day` / `next_weekday` / `next_send_window` are DST-aware via
//! the workflow's timezone.

use chrono::{DateTime, Datelike, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time of day (expected HH:MM): {0}")]
    InvalidTimeOfDay(String),
    #[error("unknown timezone: {0}")]
    UnknownZone(String),
}

/// Delay unit for wait steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

crate::simple_display! {
    DelayUnit {
        Minutes => "minutes",
        Hours => "hours",
        Days => "days",
        Weeks => "weeks",
    }
}

/// Wall-clock dispatch window restricting when send_email steps fire.
///
/// `start_hour <= hour < end_hour` in the workflow's zone, on the listed days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    #[serde(default = "every_day")]
    pub days: Vec<Weekday>,
}

fn every_day() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}

impl SendWindow {
    /// True when the given local wall-clock time is inside the window
    pub fn contains(&self, local: &DateTime<Tz>) -> bool {
        self.days.contains(&local.weekday())
            && u32::from(self.start_hour) <= local.hour()
            && local.hour() < u32::from(self.end_hour)
    }
}

/// Parse an IANA zone name ("America/Chicago")
pub fn parse_zone(name: &str) -> Result<Tz, ScheduleError> {
    name.parse().map_err(|_| ScheduleError::UnknownZone(name.to_string()))
}

/// Exact UTC delay addition. No DST adjustment: "1 day" is always 24 hours.
pub fn add_delay(from: DateTime<Utc>, value: u32, unit: DelayUnit) -> DateTime<Utc> {
    let delta = match unit {
        DelayUnit::Minutes => Duration::minutes(i64::from(value)),
        DelayUnit::Hours => Duration::hours(i64::from(value)),
        DelayUnit::Days => Duration::days(i64::from(value)),
        DelayUnit::Weeks => Duration::weeks(i64::from(value)),
    };
    from + delta
}

/// Parse "HH:MM" into a NaiveTime
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| ScheduleError::InvalidTimeOfDay(s.to_string()))
}

/// Resolve a local naive datetime in `zone` to a UTC instant.
///
/// DST fall-back ambiguity resolves to the earlier instant; spring-forward
/// gaps walk forward in 30 minute increments until a valid local time exists.
fn resolve_local(zone: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = naive;
    loop {
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earlier, _) => return earlier.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(30),
        }
    }
}

/// Least instant `>= from` whose wall clock in `zone` reads `time` ("HH:MM").
pub fn next_time_of_day(
    from: DateTime<Utc>,
    time: &str,
    zone: Tz,
) -> Result<DateTime<Utc>, ScheduleError> {
    let tod = parse_time_of_day(time)?;
    let local = from.with_timezone(&zone);
    let mut date = local.date_naive();
    if local.time() > tod {
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }
    Ok(resolve_local(zone, date.and_time(tod)))
}

/// Least instant `>= from` falling on `day` in `zone`.
///
/// Returns `from` unchanged when it already falls on that weekday; otherwise
/// the next local midnight of that weekday.
pub fn next_weekday(from: DateTime<Utc>, day: Weekday, zone: Tz) -> DateTime<Utc> {
    let local = from.with_timezone(&zone);
    if local.weekday() == day {
        return from;
    }
    let ahead =
        (day.num_days_from_monday() + 7 - local.weekday().num_days_from_monday()) % 7;
    let date = local
        .date_naive()
        .checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or_else(|| local.date_naive());
    resolve_local(zone, date.and_time(NaiveTime::MIN))
}

/// Least instant `>= from` inside the send window; `from` unchanged when it
/// already satisfies the window.
///
/// A window with an empty day list never opens; `from` is returned unchanged
/// so a misconfigured workflow degrades to unwindowed sends rather than
/// scheduling into the infinite future.
pub fn next_send_window(zone: Tz, window: &SendWindow, from: DateTime<Utc>) -> DateTime<Utc> {
    if window.days.is_empty() {
        return from;
    }
    let local = from.with_timezone(&zone);
    if window.contains(&local) {
        return from;
    }
    let open = NaiveTime::from_hms_opt(u32::from(window.start_hour), 0, 0)
        .unwrap_or(NaiveTime::MIN);
    let today = local.date_naive();
    for offset in 0..=7u64 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            continue;
        };
        if !window.days.contains(&date.weekday()) {
            continue;
        }
        let candidate = resolve_local(zone, date.and_time(open));
        // A DST gap can push the resolved open time past the window close
        // (e.g. a 02:00-03:00 window on spring-forward day); skip such days.
        if candidate >= from && window.contains(&candidate.with_timezone(&zone)) {
            return candidate;
        }
    }
    from
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
