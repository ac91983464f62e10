// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch planning: wait materialization and successor scheduling.
//!
//! Waits never dispatch. Advancing into a wait records it in history as
//! immediately completed and pushes the accumulated delay onto the next
//! executable step's due time; chains of waits accumulate. Send windows
//! apply to the due time of send_email steps.

use chrono::{DateTime, Duration, Utc};
use drip_core::{
    add_delay, next_send_window, next_time_of_day, next_weekday, parse_zone, ExitReason,
    HistoryEntry, StepId, StepKind, StepKindTag, StepOutcome, Subscriber, WaitConfig, Workflow,
};
use std::collections::HashSet;

/// The next executable step and its due time
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedTarget {
    pub step_id: StepId,
    pub kind: StepKindTag,
    pub scheduled_for: DateTime<Utc>,
}

/// Result of planning from a step: waits folded into history, then either an
/// executable target or a terminal exit
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Planned {
    pub waits: Vec<HistoryEntry>,
    pub target: Option<PlannedTarget>,
    pub exit: Option<ExitReason>,
}

impl Planned {
    fn exit(waits: Vec<HistoryEntry>, reason: ExitReason) -> Self {
        Self { waits, target: None, exit: Some(reason) }
    }
}

/// When a wait step fires, measured from `from` in the workflow's zone
fn wait_fire_time(workflow: &Workflow, config: &WaitConfig, from: DateTime<Utc>) -> DateTime<Utc> {
    let zone = workflow.tz();
    match config {
        WaitConfig::Delay { value, unit } => add_delay(from, *value, *unit),
        WaitConfig::UntilTime { time } => next_time_of_day(from, time, zone).unwrap_or(from),
        WaitConfig::UntilDay { day, time } => {
            let at_day = next_weekday(from, *day, zone);
            match time {
                Some(time) => next_time_of_day(at_day, time, zone).unwrap_or(at_day),
                None => at_day,
            }
        }
    }
}

/// Plan the journey from `start`, following linear succession through any
/// run of wait steps.
///
/// `visited` carries the step ids already in this subscriber's history; a
/// repeat is a cycle. Wait history entries get strictly increasing
/// `completed_at` stamps so the history ordering invariant holds.
pub(crate) fn plan_from_step(
    workflow: &Workflow,
    visited: &HashSet<StepId>,
    start: &StepId,
    now: DateTime<Utc>,
) -> Planned {
    let mut waits = Vec::new();
    let mut seen: HashSet<StepId> = HashSet::new();
    let mut cursor = now;
    let mut current = match workflow.step(start) {
        Some(step) => step,
        None => return Planned::exit(waits, ExitReason::DanglingBranch),
    };

    loop {
        if visited.contains(&current.id) || !seen.insert(current.id.clone()) {
            return Planned::exit(waits, ExitReason::Cycle);
        }
        match &current.kind {
            StepKind::Wait(config) => {
                let fire = wait_fire_time(workflow, config, cursor);
                waits.push(HistoryEntry {
                    step_id: current.id.clone(),
                    kind: StepKindTag::Wait,
                    entered_at: now,
                    completed_at: now + Duration::microseconds(waits.len() as i64 + 1),
                    outcome: StepOutcome::Completed,
                    detail: Some(serde_json::json!({ "resumes_at": fire })),
                });
                cursor = fire;
                match workflow.step_after(&current.id) {
                    Some(next) => current = next,
                    None => return Planned::exit(waits, ExitReason::ReachedEnd),
                }
            }
            kind => {
                let mut scheduled_for = cursor;
                if StepKindTag::from(kind) == StepKindTag::SendEmail {
                    if let Some(window) = &workflow.send_window {
                        if let Ok(zone) = parse_zone(&workflow.timezone) {
                            scheduled_for = next_send_window(zone, window, scheduled_for);
                        }
                    }
                }
                return Planned {
                    waits,
                    target: Some(PlannedTarget {
                        step_id: current.id.clone(),
                        kind: current.kind_tag(),
                        scheduled_for,
                    }),
                    exit: None,
                };
            }
        }
    }
}

/// Step ids already executed in this enrollment
pub(crate) fn visited_steps(subscriber: &Subscriber) -> HashSet<StepId> {
    subscriber.history.iter().map(|h| h.step_id.clone()).collect()
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
