// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn step_kind_serializes_with_kind_tag() {
    let step = Step::new("s1", 0, StepKind::TagAdd { tags: vec!["vip".to_string()] });
    let json = serde_json::to_value(&step).unwrap();
    assert_eq!(json["kind"], "tag_add");
    assert_eq!(json["id"], "s1");
    assert_eq!(json["tags"][0], "vip");
}

#[test]
fn wait_config_nests_under_mode() {
    let step = Step::new(
        "s2",
        1,
        StepKind::Wait(WaitConfig::Delay { value: 2, unit: DelayUnit::Days }),
    );
    let json = serde_json::to_value(&step).unwrap();
    assert_eq!(json["kind"], "wait");
    assert_eq!(json["mode"], "delay");
    assert_eq!(json["value"], 2);
    let back: Step = serde_json::from_value(json).unwrap();
    assert_eq!(back, step);
}

#[test]
fn unknown_kind_deserializes_to_unsupported() {
    let json = serde_json::json!({
        "id": "s9",
        "order": 9,
        "kind": "quantum_teleport",
    });
    let step: Step = serde_json::from_value(json).unwrap();
    assert_eq!(step.kind, StepKind::Unsupported);
    assert_eq!(step.kind_tag(), StepKindTag::Unsupported);
}

#[test]
fn condition_branches_round_trip() {
    let step = Step::new(
        "s3",
        2,
        StepKind::Condition(ConditionConfig {
            predicate: Predicate::HasTag { tag: "purchased".to_string() },
            true_branch: None,
            false_branch: Some("s5".into()),
        }),
    );
    let json = serde_json::to_string(&step).unwrap();
    let back: Step = serde_json::from_str(&json).unwrap();
    assert_eq!(back, step);
}

#[test]
fn split_config_validates_percentages() {
    let valid = SplitConfig {
        variants: vec![
            SplitVariant { name: "a".into(), percentage: 60, next_step_id: Some("s1".into()) },
            SplitVariant { name: "b".into(), percentage: 40, next_step_id: Some("s2".into()) },
        ],
    };
    assert!(valid.is_valid());

    let short = SplitConfig {
        variants: vec![SplitVariant { name: "a".into(), percentage: 99, next_step_id: None }],
    };
    assert!(!short.is_valid());

    let empty = SplitConfig { variants: vec![] };
    assert!(!empty.is_valid());
}

#[test]
fn webhook_method_defaults_to_post() {
    let json = serde_json::json!({
        "id": "s4",
        "order": 3,
        "kind": "webhook",
        "url": "https://hooks.test/x",
    });
    let step: Step = serde_json::from_value(json).unwrap();
    match step.kind {
        StepKind::Webhook(config) => assert_eq!(config.method, "POST"),
        other => panic!("expected webhook, got {other:?}"),
    }
}

#[test]
fn kind_tag_displays_snake_case() {
    assert_eq!(StepKindTag::SendEmail.to_string(), "send_email");
    assert_eq!(StepKindTag::SplitTest.to_string(), "split_test");
}
