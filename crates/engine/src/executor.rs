// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor: polymorphic dispatch by step kind.
//!
//! Handlers never propagate errors upward; every execution folds into a
//! [`Transition`]. Wait steps are non-executing markers (the planner
//! materializes their delay at enqueue time), so their handler is a no-op
//! completion for items enqueued before a workflow edit changed the step.

use crate::seed;
use crate::{Collaborators, Engine};
use chrono::{DateTime, Utc};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    Clock, Contact, ExitReason, Outcome, Step, StepKind, Subscriber, Transition, Workflow,
};
use drip_store::Engagement;

/// Everything a step handler may consult
pub struct StepContext<'a> {
    pub workflow: &'a Workflow,
    pub subscriber: &'a Subscriber,
    pub step: &'a Step,
    pub contact: Option<&'a Contact>,
    pub engagement: &'a Engagement,
    /// Count of prior non-transient-retry attempts; part of the idempotency
    /// key so retries reuse it
    pub attempt_epoch: u32,
    pub now: DateTime<Utc>,
}

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) fn collaborators(&self) -> &Collaborators<E, K, W, N, T> {
        &self.collaborators
    }

    /// Execute one step and produce its transition
    pub async fn execute_step(&self, ctx: &StepContext<'_>) -> Transition {
        let key = seed::idempotency_key(&ctx.subscriber.id, &ctx.step.id, ctx.attempt_epoch);
        let started = std::time::Instant::now();

        let transition = match &ctx.step.kind {
            StepKind::SendEmail(config) => self.exec_send_email(ctx, config, key).await,
            StepKind::Wait(_) => Transition::completed(key),
            StepKind::Condition(config) => self.exec_condition(ctx, config, key).await,
            StepKind::TagAdd { tags } => self.exec_tags(ctx, tags, true, key).await,
            StepKind::TagRemove { tags } => self.exec_tags(ctx, tags, false, key).await,
            StepKind::ListAdd { list_id } => self.exec_lists(ctx, list_id, true, key).await,
            StepKind::ListRemove { list_id } => self.exec_lists(ctx, list_id, false, key).await,
            StepKind::Webhook(config) => self.exec_webhook(ctx, config, key).await,
            StepKind::Notification(config) => self.exec_notification(ctx, config, key).await,
            StepKind::ContactUpdate { fields } => self.exec_contact_update(ctx, fields, key).await,
            StepKind::GoalCheck(config) => self.exec_goal_check(ctx, config, key).await,
            StepKind::SplitTest(config) => self.exec_split_test(ctx, config, key),
            StepKind::Unsupported => Transition::terminate(ExitReason::UnsupportedStep, key),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &transition.outcome {
            Outcome::Failed(error) => tracing::warn!(
                subscriber = %ctx.subscriber.id,
                step = %ctx.step.id,
                kind = %ctx.step.kind_tag(),
                error = %error,
                elapsed_ms,
                "step failed"
            ),
            _ => tracing::info!(
                subscriber = %ctx.subscriber.id,
                step = %ctx.step.id,
                kind = %ctx.step.kind_tag(),
                elapsed_ms,
                "step executed"
            ),
        }
        transition
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
