// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::setup;
use drip_core::test_support::{email_step, t0, ContactBuilder, WorkflowBuilder};
use drip_core::{EntryConditions, TriggerKind, TriggerSpec};
use serde_json::json;

fn list_trigger_event(email: &str) -> TriggerEvent {
    TriggerEvent::new(TriggerKind::ListSubscribe, "acme", email, t0())
        .with_payload(json!({"list_id": "L1"}))
}

fn list_workflow(entry: EntryConditions) -> Workflow {
    WorkflowBuilder::default()
        .trigger(TriggerSpec::ListSubscribe { list_id: "L1".to_string() })
        .entry_conditions(entry)
        .step(email_step("s1", 0, "Welcome"))
        .build()
}

#[tokio::test]
async fn matching_event_enrolls_subscriber() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions::default());
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("alice@x.test").build());

    let enrolled = ctx.engine.handle_trigger(&list_trigger_event("alice@x.test")).await.unwrap();
    assert_eq!(enrolled.len(), 1);

    let subscriber = ctx.engine.store().subscriber(&enrolled[0]).unwrap();
    assert_eq!(subscriber.email, "alice@x.test");
    assert!(subscriber.next_action.is_some());
    assert!(ctx.engine.store().live_item_for(&subscriber.id).is_some());
    assert_eq!(ctx.engine.store().workflow(&workflow.id).unwrap().stats.total_entered, 1);
}

#[tokio::test]
async fn non_matching_list_id_is_ignored() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions::default());
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("alice@x.test").build());

    let event = TriggerEvent::new(TriggerKind::ListSubscribe, "acme", "alice@x.test", t0())
        .with_payload(json!({"list_id": "other"}));
    assert!(ctx.engine.handle_trigger(&event).await.unwrap().is_empty());
}

#[tokio::test]
async fn reentry_denied_when_disallowed() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions { allow_reentry: false, ..Default::default() });
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("bob@x.test").build());

    let first = ctx.engine.handle_trigger(&list_trigger_event("bob@x.test")).await.unwrap();
    assert_eq!(first.len(), 1);
    // Finish the journey so the active-uniqueness gate is not what denies
    let sub = ctx.engine.store().subscriber(&first[0]).unwrap();
    let item = ctx.engine.store().live_item_for(&sub.id).unwrap();
    ctx.engine
        .store()
        .commit(&[
            drip_core::Event::QueueCancelled { id: item.id },
            drip_core::Event::SubscriberExited {
                id: sub.id.clone(),
                workflow_id: workflow.id.clone(),
                status: drip_core::TerminalStatus::Completed,
                reason: drip_core::ExitReason::ReachedEnd,
            },
        ])
        .unwrap();

    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "bob@x.test", None)
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::ReentryNotAllowed));

    let second = ctx.engine.handle_trigger(&list_trigger_event("bob@x.test")).await.unwrap();
    assert!(second.is_empty());
    // No second subscriber row
    assert_eq!(ctx.engine.store().entry_count(&workflow.id, "bob@x.test"), 1);
}

#[tokio::test]
async fn active_subscriber_blocks_duplicate_enrollment() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions::default());
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("carol@x.test").build());

    ctx.engine.handle_trigger(&list_trigger_event("carol@x.test")).await.unwrap();
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "carol@x.test", None)
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::AlreadyActive));
}

#[tokio::test]
async fn max_entries_caps_enrollments() {
    let ctx = setup();
    let workflow =
        list_workflow(EntryConditions { max_entries_per_contact: 1, ..Default::default() });
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("dave@x.test").build());

    let first = ctx.engine.handle_trigger(&list_trigger_event("dave@x.test")).await.unwrap();
    assert_eq!(first.len(), 1);
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "dave@x.test", None)
        .await
        .unwrap();
    // Max-entries outranks the active-uniqueness denial ordering here
    assert!(matches!(decision, EntryDecision::Denied(_)));
}

#[tokio::test]
async fn cooldown_denies_within_wait_window() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions {
        allow_reentry: true,
        reentry_wait_days: 7,
        ..Default::default()
    });
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("erin@x.test").build());

    let first = ctx.engine.handle_trigger(&list_trigger_event("erin@x.test")).await.unwrap();
    let sub = ctx.engine.store().subscriber(&first[0]).unwrap();
    let item = ctx.engine.store().live_item_for(&sub.id).unwrap();
    ctx.engine
        .store()
        .commit(&[
            drip_core::Event::QueueCancelled { id: item.id },
            drip_core::Event::SubscriberExited {
                id: sub.id,
                workflow_id: workflow.id.clone(),
                status: drip_core::TerminalStatus::Completed,
                reason: drip_core::ExitReason::ReachedEnd,
            },
        ])
        .unwrap();

    ctx.clock.advance(chrono::Duration::days(3));
    let decision =
        ctx.engine.check_entry_conditions(&workflow, "erin@x.test", None).await.unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::Cooldown));

    ctx.clock.advance(chrono::Duration::days(5));
    let decision =
        ctx.engine.check_entry_conditions(&workflow, "erin@x.test", None).await.unwrap();
    assert_eq!(decision, EntryDecision::Allowed);
}

#[tokio::test]
async fn tag_filters_gate_entry() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions {
        filter_tags: vec!["customer".to_string()],
        exclude_tags: vec!["banned".to_string()],
        ..Default::default()
    });
    ctx.add_workflow(&workflow);

    let banned = ContactBuilder::new("f@x.test").tag("customer").tag("banned").build();
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "f@x.test", Some(&banned))
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::ExcludedTag));

    let untagged = ContactBuilder::new("g@x.test").build();
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "g@x.test", Some(&untagged))
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::MissingRequiredTag));

    let customer = ContactBuilder::new("h@x.test").tag("customer").build();
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "h@x.test", Some(&customer))
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Allowed);
}

#[tokio::test]
async fn segment_filter_gates_entry() {
    let ctx = setup();
    let workflow = list_workflow(EntryConditions {
        filter_segment: Some("seg-1".to_string()),
        ..Default::default()
    });
    ctx.add_workflow(&workflow);
    let contact = ContactBuilder::new("i@x.test").build();
    ctx.seed_contact(&workflow, contact.clone());

    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "i@x.test", Some(&contact))
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Denied(DenyReason::NotInSegment));

    ctx.contacts.add_to_segment("seg-1", "i@x.test");
    let decision = ctx
        .engine
        .check_entry_conditions(&workflow, "i@x.test", Some(&contact))
        .await
        .unwrap();
    assert_eq!(decision, EntryDecision::Allowed);
}

#[tokio::test]
async fn paused_workflows_do_not_match() {
    let ctx = setup();
    let mut workflow = list_workflow(EntryConditions::default());
    workflow.status = drip_core::WorkflowStatus::Paused;
    ctx.add_workflow(&workflow);
    ctx.seed_contact(&workflow, ContactBuilder::new("j@x.test").build());

    assert!(ctx.engine.handle_trigger(&list_trigger_event("j@x.test")).await.unwrap().is_empty());
}
