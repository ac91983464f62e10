// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

#[test]
fn unlimited_always_allows() {
    let throttle = Throttle::default();
    let mut counters = ThrottleCounters::default();
    counters.hour_count = 1_000_000;
    assert_eq!(counters.check(&throttle, at(10, 0)), ThrottleVerdict::Allow);
}

#[test]
fn hourly_cap_defers_to_hour_boundary() {
    let throttle = Throttle { max_sends_per_hour: 2, max_sends_per_day: 0 };
    let mut counters = ThrottleCounters::default();
    let now = at(10, 0);
    assert_eq!(counters.check(&throttle, now), ThrottleVerdict::Allow);
    counters.record_send();
    counters.record_send();
    match counters.check(&throttle, at(10, 30)) {
        ThrottleVerdict::Defer(boundary) => assert_eq!(boundary, at(11, 0)),
        ThrottleVerdict::Allow => panic!("expected deferral"),
    }
}

#[test]
fn hour_window_rolls_over() {
    let throttle = Throttle { max_sends_per_hour: 1, max_sends_per_day: 0 };
    let mut counters = ThrottleCounters::default();
    assert_eq!(counters.check(&throttle, at(10, 0)), ThrottleVerdict::Allow);
    counters.record_send();
    // Next hour: counter resets
    assert_eq!(counters.check(&throttle, at(11, 5)), ThrottleVerdict::Allow);
    assert_eq!(counters.hour_count, 0);
}

#[test]
fn day_cap_wins_when_later_than_hour_cap() {
    let throttle = Throttle { max_sends_per_hour: 1, max_sends_per_day: 1 };
    let mut counters = ThrottleCounters::default();
    let now = at(10, 0);
    assert_eq!(counters.check(&throttle, now), ThrottleVerdict::Allow);
    counters.record_send();
    match counters.check(&throttle, at(10, 1)) {
        ThrottleVerdict::Defer(boundary) => {
            // Day boundary (next day 10:00) is later than hour boundary
            assert_eq!(boundary, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
        }
        ThrottleVerdict::Allow => panic!("expected deferral"),
    }
}

#[test]
fn day_counter_survives_hour_rollover() {
    let throttle = Throttle { max_sends_per_hour: 0, max_sends_per_day: 2 };
    let mut counters = ThrottleCounters::default();
    assert_eq!(counters.check(&throttle, at(8, 0)), ThrottleVerdict::Allow);
    counters.record_send();
    assert_eq!(counters.check(&throttle, at(12, 0)), ThrottleVerdict::Allow);
    counters.record_send();
    assert!(matches!(counters.check(&throttle, at(14, 0)), ThrottleVerdict::Defer(_)));
}
