// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! split_test handler: weighted variant selection.
//!
//! The draw uses the same per-subscriber stable seed as `random`, so crash
//! re-execution picks the same variant, and the chosen variant is persisted
//! in history for attribution.

use crate::executor::StepContext;
use crate::{seed, Engine};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, Event, ExitReason, SplitConfig, Transition};
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
    pub(crate) fn exec_split_test(
        &self,
        ctx: &StepContext<'_>,
        config: &SplitConfig,
        key: String,
    ) -> Transition {
        if !config.is_valid() {
            // Activation validates this; a bad config at runtime means the
            // workflow was edited out from under us
            return Transition::terminate(ExitReason::UnsupportedStep, key).with_side_effect(
                Event::EngineError {
                    workflow_id: ctx.workflow.id.clone(),
                    subscriber_id: Some(ctx.subscriber.id.clone()),
                    step_id: Some(ctx.step.id.clone()),
                    message: "split_test percentages must sum to 100".to_string(),
                },
            );
        }

        let draw = seed::stable_draw(&ctx.subscriber.id, &ctx.step.id);
        let mut cumulative = 0u32;
        let mut selected = None;
        for variant in &config.variants {
            cumulative += u32::from(variant.percentage) * 100;
            if draw < cumulative {
                selected = Some(variant);
                break;
            }
        }
        let Some(chosen) = selected.or_else(|| config.variants.last()) else {
            return Transition::terminate(ExitReason::UnsupportedStep, key);
        };

        let transition = match &chosen.next_step_id {
            Some(step_id) => Transition::goto(step_id.clone(), key),
            // A target-less variant converges onto the linear successor
            None => Transition::completed(key),
        };
        transition.with_detail(json!({ "variant": chosen.name, "draw": draw }))
    }
}
