// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::setup;
use drip_core::test_support::{t0, wait_step, ContactBuilder, WorkflowBuilder};
use drip_core::{
    DelayUnit, NextStep, SendEmailConfig, StepKind, Subscriber, TenantId,
};
use drip_store::Engagement;
use serde_json::json;

#[tokio::test]
async fn unsupported_kind_exits_subscriber() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(Step::new("s1", 0, StepKind::Unsupported))
        .build();
    let subscriber =
        Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "a@x.test", 1, t0());
    let engagement = Engagement::default();
    let step_ctx = StepContext {
        workflow: &workflow,
        subscriber: &subscriber,
        step: &workflow.steps[0],
        contact: None,
        engagement: &engagement,
        attempt_epoch: 0,
        now: t0(),
    };

    let transition = ctx.engine.execute_step(&step_ctx).await;
    assert_eq!(transition.next, NextStep::Terminate(ExitReason::UnsupportedStep));
}

#[tokio::test]
async fn wait_is_a_non_executing_marker() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(wait_step("s1", 0, 1, DelayUnit::Days))
        .build();
    let subscriber =
        Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "a@x.test", 1, t0());
    let engagement = Engagement::default();
    let step_ctx = StepContext {
        workflow: &workflow,
        subscriber: &subscriber,
        step: &workflow.steps[0],
        contact: None,
        engagement: &engagement,
        attempt_epoch: 0,
        now: t0(),
    };

    let transition = ctx.engine.execute_step(&step_ctx).await;
    assert_eq!(transition.outcome, Outcome::Completed);
    assert_eq!(transition.next, NextStep::Linear);
    assert!(transition.side_effects.is_empty());
}

#[tokio::test]
async fn send_email_renders_and_tracks() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(Step::new(
            "s1",
            0,
            StepKind::SendEmail(SendEmailConfig {
                template_id: None,
                subject: Some("Hi {{first_name}}".to_string()),
                html: Some(
                    r#"<html><body><a href="https://shop.test/x">Go</a></body></html>"#.to_string(),
                ),
                text: Some("Hi {{first_name}}".to_string()),
                from: None,
            }),
        ))
        .build();
    let mut contact = ContactBuilder::new("alice@x.test").build();
    contact.first_name = "Alice".to_string();
    let subscriber =
        Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "alice@x.test", 1, t0());
    let engagement = Engagement::default();
    let step_ctx = StepContext {
        workflow: &workflow,
        subscriber: &subscriber,
        step: &workflow.steps[0],
        contact: Some(&contact),
        engagement: &engagement,
        attempt_epoch: 0,
        now: t0(),
    };

    let transition = ctx.engine.execute_step(&step_ctx).await;
    assert_eq!(transition.outcome, Outcome::Completed);

    let deliveries = ctx.email.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].subject, "Hi Alice");
    assert_eq!(deliveries[0].from, ctx.engine.config().default_from);
    // Links rewritten, pixel injected
    assert!(!deliveries[0].html.contains("https://shop.test/x\""));
    assert!(deliveries[0].html.contains("/o/"));
    assert_eq!(deliveries[0].idempotency_key, transition.idempotency_key);
}

#[tokio::test]
async fn send_email_missing_template_is_permanent() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(Step::new(
            "s1",
            0,
            StepKind::SendEmail(SendEmailConfig {
                template_id: Some("ghost".to_string()),
                ..SendEmailConfig::default()
            }),
        ))
        .build();
    let contact = ContactBuilder::new("alice@x.test").build();
    let subscriber =
        Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "alice@x.test", 1, t0());
    let engagement = Engagement::default();
    let step_ctx = StepContext {
        workflow: &workflow,
        subscriber: &subscriber,
        step: &workflow.steps[0],
        contact: Some(&contact),
        engagement: &engagement,
        attempt_epoch: 0,
        now: t0(),
    };

    let transition = ctx.engine.execute_step(&step_ctx).await;
    match transition.outcome {
        Outcome::Failed(error) => assert!(!error.is_transient()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(transition.next, NextStep::Terminate(ExitReason::DeliveryFailed));
    assert_eq!(ctx.email.delivery_count(), 0);
}

#[tokio::test]
async fn split_test_records_variant_detail() {
    let ctx = setup();
    let workflow = WorkflowBuilder::default()
        .step(drip_core::test_support::split_step(
            "s1",
            0,
            &[("a", 50, Some("sa")), ("b", 50, Some("sb"))],
        ))
        .build();
    let subscriber =
        Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "alice@x.test", 1, t0());
    let engagement = Engagement::default();
    let step_ctx = StepContext {
        workflow: &workflow,
        subscriber: &subscriber,
        step: &workflow.steps[0],
        contact: None,
        engagement: &engagement,
        attempt_epoch: 0,
        now: t0(),
    };

    let transition = ctx.engine.execute_step(&step_ctx).await;
    let detail = transition.detail.clone().unwrap();
    let variant = detail["variant"].as_str().unwrap().to_string();
    assert!(variant == "a" || variant == "b");
    let expected_target = if variant == "a" { "sa" } else { "sb" };
    assert_eq!(transition.next, NextStep::GoTo(expected_target.into()));

    // Re-execution picks the same variant (stable seed)
    let again = ctx.engine.execute_step(&step_ctx).await;
    assert_eq!(again.detail.unwrap()["variant"], json!(variant));
}
