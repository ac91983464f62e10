// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_carry_prefix() {
    let id = WorkflowId::new();
    assert!(id.as_str().starts_with("wfl-"));
    assert!(SubscriberId::new().as_str().starts_with("sub-"));
    assert!(QueueItemId::new().as_str().starts_with("qit-"));
}

#[test]
fn generated_ids_are_unique() {
    let a = SubscriberId::new();
    let b = SubscriberId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = WorkflowId::from_string("wfl-abc123");
    assert_eq!(id.as_str(), "wfl-abc123");
    assert_eq!(id, *"wfl-abc123");
}

#[test]
fn serde_is_transparent() {
    let id = SubscriberId::from_string("sub-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"sub-xyz\"");
    let back: SubscriberId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn step_id_compares_with_str() {
    let id = StepId::new("step-1");
    assert_eq!(id, "step-1");
    assert_eq!(id.to_string(), "step-1");
}

#[test]
fn tenant_id_display() {
    assert_eq!(TenantId::new("acme").to_string(), "acme");
}
