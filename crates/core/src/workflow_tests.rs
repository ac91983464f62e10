// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{email_step, wait_step};
use crate::schedule::DelayUnit;

fn three_step_workflow() -> Workflow {
    Workflow::builder()
        .step(email_step("s1", 0, "Welcome"))
        .step(wait_step("s2", 1, 2, DelayUnit::Days))
        .step(email_step("s3", 2, "Guide"))
        .build()
}

#[test]
fn step_lookup_by_id() {
    let wf = three_step_workflow();
    assert!(wf.step(&"s2".into()).is_some());
    assert!(wf.step(&"missing".into()).is_none());
}

#[test]
fn entry_step_defaults_to_lowest_order() {
    let wf = three_step_workflow();
    assert_eq!(wf.entry_step().map(|s| s.id.as_str()), Some("s1"));
}

#[test]
fn explicit_entry_marker_wins() {
    let mut wf = three_step_workflow();
    wf.steps[1].entry = true;
    assert_eq!(wf.entry_step().map(|s| s.id.as_str()), Some("s2"));
}

#[test]
fn step_after_follows_order_not_position() {
    let mut wf = three_step_workflow();
    // Shuffle vec order; linear succession must follow `order`
    wf.steps.reverse();
    assert_eq!(wf.step_after(&"s1".into()).map(|s| s.id.as_str()), Some("s2"));
    assert_eq!(wf.step_after(&"s3".into()), None);
}

#[test]
fn editable_only_in_draft_or_paused() {
    let mut wf = three_step_workflow();
    wf.status = WorkflowStatus::Draft;
    assert!(wf.is_editable());
    wf.status = WorkflowStatus::Paused;
    assert!(wf.is_editable());
    wf.status = WorkflowStatus::Active;
    assert!(!wf.is_editable());
    wf.status = WorkflowStatus::Archived;
    assert!(!wf.is_editable());
}

#[test]
fn unknown_timezone_falls_back_to_utc() {
    let mut wf = three_step_workflow();
    wf.timezone = "Mars/Olympus_Mons".to_string();
    assert_eq!(wf.tz(), chrono_tz::UTC);
}

#[test]
fn workflow_round_trips_through_json() {
    let wf = three_step_workflow();
    let json = serde_json::to_string(&wf).unwrap();
    let back: Workflow = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wf);
}
