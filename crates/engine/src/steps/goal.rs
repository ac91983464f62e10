// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! goal_check handler.
//!
//! A met goal bumps the workflow counter via `goal:reached`; with
//! `exit_on_goal` the subscriber leaves as completed, otherwise the journey
//! continues linearly.

use crate::executor::StepContext;
use crate::Engine;
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, Event, ExitReason, GoalConfig, Transition};
use serde_json::json;

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) async fn exec_goal_check(
        &self,
        ctx: &StepContext<'_>,
        config: &GoalConfig,
        key: String,
    ) -> Transition {
        let met = match self.eval_predicate(ctx, &config.predicate).await {
            Ok(met) => met,
            Err(error) => return Transition::failed(error, key),
        };
        if !met {
            return Transition::completed(key).with_detail(json!({ "goal_met": false }));
        }
        let reached = Event::GoalReached {
            workflow_id: ctx.workflow.id.clone(),
            subscriber_id: ctx.subscriber.id.clone(),
            step_id: Some(ctx.step.id.clone()),
        };
        let transition = if config.exit_on_goal {
            Transition::terminate(ExitReason::GoalReached, key)
        } else {
            Transition::completed(key)
        };
        transition.with_side_effect(reached).with_detail(json!({ "goal_met": true }))
    }
}
