// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::setup;
use drip_core::test_support::{email_step, split_step, t0, wait_step, ContactBuilder, WorkflowBuilder};
use drip_core::{DelayUnit, QueueItemStatus, TriggerKind};

async fn enroll(ctx: &crate::test_helpers::TestContext, workflow: &Workflow, email: &str) {
    ctx.seed_contact(workflow, ContactBuilder::new(email).build());
    let event = drip_core::TriggerEvent::new(TriggerKind::Manual, "acme", email, t0());
    ctx.engine.handle_trigger(&event).await.unwrap();
}

#[test]
fn activation_requires_steps() {
    let ctx = setup();
    let workflow =
        WorkflowBuilder::default().status(drip_core::WorkflowStatus::Draft).build();
    ctx.add_workflow(&workflow);
    let err = ctx.engine.activate(&workflow.id).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn activation_rejects_bad_split() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .status(drip_core::WorkflowStatus::Draft)
        .step(split_step("s1", 0, &[("a", 50, None), ("b", 30, None)]))
        .build();
    ctx.add_workflow(&workflow);
    assert!(ctx.engine.activate(&workflow.id).is_err());
}

#[test]
fn activation_rejects_unknown_zone() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .status(drip_core::WorkflowStatus::Draft)
        .timezone("Nowhere/Nothing")
        .step(email_step("s1", 0, "Hi"))
        .build();
    ctx.add_workflow(&workflow);
    assert!(ctx.engine.activate(&workflow.id).is_err());
}

#[test]
fn activation_stamps_activated_at_and_flips_status() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .status(drip_core::WorkflowStatus::Draft)
        .step(email_step("s1", 0, "Hi"))
        .build();
    ctx.add_workflow(&workflow);
    ctx.engine.activate(&workflow.id).unwrap();

    let loaded = ctx.engine.store().workflow(&workflow.id).unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Active);
    assert_eq!(loaded.activated_at, Some(t0()));
}

#[tokio::test]
async fn pause_cancels_pending_and_preserves_next_action() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(email_step("s1", 0, "Hi"))
        .step(wait_step("w1", 1, 2, DelayUnit::Days))
        .step(email_step("s2", 2, "Later"))
        .build();
    ctx.add_workflow(&workflow);
    enroll(&ctx, &workflow, "alice@x.test").await;
    ctx.drain().await;

    // Subscriber now sits on s2, scheduled +2d
    ctx.engine.pause(&workflow.id).unwrap();

    let subscribers = ctx.engine.store().subscribers_for_workflow(&workflow.id);
    let subscriber = &subscribers[0];
    assert_eq!(subscriber.status, drip_core::SubscriberStatus::Active);
    let next_action = subscriber.next_action.clone().unwrap();
    assert_eq!(next_action.step_id, "s2");
    // No live queue item remains
    assert!(ctx.engine.store().live_item_for(&subscriber.id).is_none());

    // Nothing dispatches while paused, even past the due time
    ctx.clock.advance(chrono::Duration::days(3));
    assert_eq!(ctx.drain().await, 0);
    assert_eq!(ctx.email.delivery_count(), 1);
}

#[tokio::test]
async fn resume_reenqueues_with_original_due_time() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(email_step("s1", 0, "Hi"))
        .step(wait_step("w1", 1, 2, DelayUnit::Days))
        .step(email_step("s2", 2, "Later"))
        .build();
    ctx.add_workflow(&workflow);
    enroll(&ctx, &workflow, "alice@x.test").await;
    ctx.drain().await;
    ctx.engine.pause(&workflow.id).unwrap();

    ctx.engine.resume(&workflow.id).unwrap();
    let subscribers = ctx.engine.store().subscribers_for_workflow(&workflow.id);
    let item = ctx.engine.store().live_item_for(&subscribers[0].id).unwrap();
    assert_eq!(item.status, QueueItemStatus::Pending);
    assert_eq!(item.scheduled_for, t0() + chrono::Duration::days(2));

    // The remaining step dispatches once due
    ctx.clock.advance(chrono::Duration::days(2));
    ctx.drain().await;
    assert_eq!(ctx.email.delivery_count(), 2);
}

#[tokio::test]
async fn archive_terminates_active_subscribers() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(email_step("s1", 0, "Hi"))
        .step(wait_step("w1", 1, 30, DelayUnit::Days))
        .step(email_step("s2", 2, "Much later"))
        .build();
    ctx.add_workflow(&workflow);
    enroll(&ctx, &workflow, "a@x.test").await;
    enroll(&ctx, &workflow, "b@x.test").await;
    ctx.drain().await;

    ctx.engine.archive(&workflow.id).unwrap();

    let loaded = ctx.engine.store().workflow(&workflow.id).unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Archived);
    assert_eq!(loaded.stats.currently_active, 0);
    for subscriber in ctx.engine.store().subscribers_for_workflow(&workflow.id) {
        assert_eq!(subscriber.status, drip_core::SubscriberStatus::Exited);
        assert_eq!(
            subscriber.exit_reason,
            Some(drip_core::ExitReason::AutomationArchived)
        );
        assert!(ctx.engine.store().live_item_for(&subscriber.id).is_none());
    }
}

#[tokio::test]
async fn archived_workflow_stops_matching_triggers() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default().step(email_step("s1", 0, "Hi")).build();
    ctx.add_workflow(&workflow);
    ctx.engine.archive(&workflow.id).unwrap();

    ctx.seed_contact(&workflow, ContactBuilder::new("late@x.test").build());
    let event = drip_core::TriggerEvent::new(TriggerKind::Manual, "acme", "late@x.test", t0());
    assert!(ctx.engine.handle_trigger(&event).await.unwrap().is_empty());
}
