// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workflow send throttle.
//!
//! Token buckets over rolling hour and day windows, applied only to
//! send_email dispatch. Counters are persisted state, reset on window
//! rollover; a capped lease defers the item to the window boundary instead
//! of blocking non-email step kinds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Throttle configuration on a workflow. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throttle {
    #[serde(default)]
    pub max_sends_per_hour: u32,
    #[serde(default)]
    pub max_sends_per_day: u32,
}

impl Throttle {
    pub fn is_unlimited(&self) -> bool {
        self.max_sends_per_hour == 0 && self.max_sends_per_day == 0
    }
}

/// Persisted send counters for one workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleCounters {
    pub hour_start: Option<DateTime<Utc>>,
    pub hour_count: u32,
    pub day_start: Option<DateTime<Utc>>,
    pub day_count: u32,
}

/// Outcome of a throttle check at lease time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleVerdict {
    Allow,
    /// Capped; push `scheduled_for` to this window boundary
    Defer(DateTime<Utc>),
}

impl ThrottleCounters {
    /// Reset any window that has rolled past its duration
    pub fn roll(&mut self, now: DateTime<Utc>) {
        match self.hour_start {
            Some(start) if now - start < Duration::hours(1) => {}
            _ => {
                self.hour_start = Some(now);
                self.hour_count = 0;
            }
        }
        match self.day_start {
            Some(start) if now - start < Duration::days(1) => {}
            _ => {
                self.day_start = Some(now);
                self.day_count = 0;
            }
        }
    }

    /// Check caps after rolling windows. Does not consume a token.
    pub fn check(&mut self, throttle: &Throttle, now: DateTime<Utc>) -> ThrottleVerdict {
        if throttle.is_unlimited() {
            return ThrottleVerdict::Allow;
        }
        self.roll(now);
        let mut defer_until: Option<DateTime<Utc>> = None;
        if throttle.max_sends_per_hour > 0 && self.hour_count >= throttle.max_sends_per_hour {
            let boundary = self.hour_start.unwrap_or(now) + Duration::hours(1);
            defer_until = Some(boundary);
        }
        if throttle.max_sends_per_day > 0 && self.day_count >= throttle.max_sends_per_day {
            let boundary = self.day_start.unwrap_or(now) + Duration::days(1);
            defer_until = Some(defer_until.map_or(boundary, |h| h.max(boundary)));
        }
        match defer_until {
            Some(at) => ThrottleVerdict::Defer(at),
            None => ThrottleVerdict::Allow,
        }
    }

    /// Consume one send token from both windows
    pub fn record_send(&mut self) {
        self.hour_count = self.hour_count.saturating_add(1);
        self.day_count = self.day_count.saturating_add(1);
    }
}

#[cfg(test)]
#[path = "throttle_tests.rs"]
mod tests;
