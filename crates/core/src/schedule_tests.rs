// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use chrono_tz::America::Chicago;
use chrono_tz::UTC;
use proptest::prelude::*;
use yare::parameterized;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn weekdays() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
}

#[parameterized(
    minutes = { 30, DelayUnit::Minutes, 30 * 60 },
    hours = { 2, DelayUnit::Hours, 2 * 3600 },
    days = { 2, DelayUnit::Days, 2 * 86400 },
    weeks = { 1, DelayUnit::Weeks, 7 * 86400 },
)]
fn add_delay_is_exact_utc(value: u32, unit: DelayUnit, expected_secs: i64) {
    let from = utc(2024, 1, 1, 10, 0);
    let result = add_delay(from, value, unit);
    assert_eq!((result - from).num_seconds(), expected_secs);
}

#[test]
fn add_delay_ignores_dst() {
    // US spring-forward on 2024-03-10: a "1 day" delay is still 24h of UTC
    let from = utc(2024, 3, 9, 18, 0);
    let result = add_delay(from, 1, DelayUnit::Days);
    assert_eq!((result - from).num_hours(), 24);
}

#[test]
fn parse_zone_accepts_iana_names() {
    assert!(parse_zone("America/Chicago").is_ok());
    assert!(parse_zone("not/a-zone").is_err());
}

#[test]
fn parse_time_of_day_rejects_garbage() {
    assert!(parse_time_of_day("09:30").is_ok());
    assert!(parse_time_of_day("25:00").is_err());
    assert!(parse_time_of_day("morning").is_err());
}

#[test]
fn next_time_of_day_same_day_when_ahead() {
    // 10:00 UTC = 04:00 Chicago (CST); 09:00 local is later the same day
    let from = utc(2024, 1, 15, 10, 0);
    let at = next_time_of_day(from, "09:00", Chicago).unwrap();
    let local = at.with_timezone(&Chicago);
    assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 09:00");
}

#[test]
fn next_time_of_day_rolls_to_tomorrow() {
    // 20:00 Chicago has passed 09:00; schedule for tomorrow
    let from = Chicago
        .with_ymd_and_hms(2024, 1, 15, 20, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let at = next_time_of_day(from, "09:00", Chicago).unwrap();
    let local = at.with_timezone(&Chicago);
    assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-01-16 09:00");
}

#[test]
fn next_weekday_returns_from_when_already_on_day() {
    // 2024-01-15 is a Monday
    let from = utc(2024, 1, 15, 14, 0);
    assert_eq!(next_weekday(from, Weekday::Mon, UTC), from);
}

#[test]
fn next_weekday_advances_to_midnight_of_day() {
    // Monday → next Thursday at local midnight
    let from = utc(2024, 1, 15, 14, 0);
    let at = next_weekday(from, Weekday::Thu, UTC);
    assert_eq!(at, utc(2024, 1, 18, 0, 0));
}

#[test]
fn send_window_inside_is_unchanged() {
    let window = SendWindow { start_hour: 9, end_hour: 17, days: weekdays() };
    // Wed 2024-01-17 10:30 Chicago
    let from = Chicago
        .with_ymd_and_hms(2024, 1, 17, 10, 30, 0)
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(next_send_window(Chicago, &window, from), from);
}

#[test]
fn send_window_friday_evening_rolls_to_monday() {
    let window = SendWindow { start_hour: 9, end_hour: 17, days: weekdays() };
    // Fri 2024-01-19 17:01 local, one minute past close
    let from = Chicago
        .with_ymd_and_hms(2024, 1, 19, 17, 1, 0)
        .unwrap()
        .with_timezone(&Utc);
    let at = next_send_window(Chicago, &window, from);
    let local = at.with_timezone(&Chicago);
    assert_eq!(local.format("%a %H:%M").to_string(), "Mon 09:00");
}

#[test]
fn send_window_early_morning_waits_for_open() {
    let window = SendWindow { start_hour: 9, end_hour: 17, days: weekdays() };
    let from = Chicago
        .with_ymd_and_hms(2024, 1, 17, 6, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let at = next_send_window(Chicago, &window, from);
    let local = at.with_timezone(&Chicago);
    assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-01-17 09:00");
}

#[test]
fn send_window_empty_days_degrades_to_passthrough() {
    let window = SendWindow { start_hour: 9, end_hour: 17, days: vec![] };
    let from = utc(2024, 1, 17, 3, 0);
    assert_eq!(next_send_window(UTC, &window, from), from);
}

proptest! {
    #[test]
    fn next_send_window_result_is_never_before_from(
        day in 1u32..28,
        hour in 0u32..24,
        start in 0u8..12,
        len in 1u8..12,
    ) {
        let window = SendWindow {
            start_hour: start,
            end_hour: start + len,
            days: weekdays(),
        };
        let from = utc(2024, 3, day, hour, 0);
        let at = next_send_window(Chicago, &window, from);
        prop_assert!(at >= from);
        // And the result actually satisfies the window
        let local = at.with_timezone(&Chicago);
        prop_assert!(window.contains(&local));
    }
}
