// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! condition handler and predicate evaluation.
//!
//! `random(percent)` draws from the per-subscriber stable seed so a
//! re-executed condition (after crash recovery) chooses the same branch.

use crate::executor::StepContext;
use crate::{seed, Engine};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    Clock, ConditionConfig, Event, ExitReason, FieldOp, FieldValue, Predicate, StepError,
    Transition,
};
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
    pub(crate) async fn exec_condition(
        &self,
        ctx: &StepContext<'_>,
        config: &ConditionConfig,
        key: String,
    ) -> Transition {
        let result = match self.eval_predicate(ctx, &config.predicate).await {
            Ok(result) => result,
            Err(error) => return Transition::failed(error, key),
        };
        let branch = if result { &config.true_branch } else { &config.false_branch };
        let transition = match branch {
            Some(step_id) => Transition::goto(step_id.clone(), key),
            // A null branch means the journey ends here, successfully
            None => Transition::terminate(ExitReason::ReachedEnd, key),
        };
        transition
            .with_side_effect(Event::ConditionEvaluated {
                workflow_id: ctx.workflow.id.clone(),
                subscriber_id: ctx.subscriber.id.clone(),
                step_id: ctx.step.id.clone(),
                result,
            })
            .with_detail(json!({ "result": result }))
    }

    /// Evaluate a predicate over subscriber / contact / engagement
    pub(crate) async fn eval_predicate(
        &self,
        ctx: &StepContext<'_>,
        predicate: &Predicate,
    ) -> Result<bool, StepError> {
        match predicate {
            Predicate::OpenedEmail { step_id } => Ok(ctx.engagement.opened.contains(step_id)),
            Predicate::ClickedLink { step_id, url } => Ok(match (step_id, url) {
                (Some(step_id), _) => ctx.engagement.clicked_steps.contains(step_id),
                (None, Some(url)) => ctx.engagement.clicked_urls.contains(url),
                (None, None) => {
                    !ctx.engagement.clicked_steps.is_empty()
                        || !ctx.engagement.clicked_urls.is_empty()
                }
            }),
            Predicate::HasTag { tag } => Ok(ctx.contact.is_some_and(|c| c.has_tag(tag))),
            Predicate::InSegment { segment_id } => {
                let lookup = tokio::time::timeout(
                    self.config().step_timeout(),
                    self.collaborators().contacts.in_segment(
                        &ctx.workflow.tenant,
                        &ctx.subscriber.email,
                        segment_id,
                    ),
                )
                .await;
                match lookup {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(error)) => Err(StepError::transient(error.to_string())),
                    Err(_) => Err(StepError::transient("contact store timed out")),
                }
            }
            Predicate::CustomField { field, op, value } => Ok(compare_field(
                ctx.contact.and_then(|c| c.custom_fields.get(field)),
                *op,
                value,
            )),
            Predicate::Random { percent } => {
                Ok(seed::stable_draw(&ctx.subscriber.id, &ctx.step.id)
                    < u32::from(*percent) * 100)
            }
        }
    }
}

fn values_equal(actual: &FieldValue, expected: &FieldValue) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual.render() == expected.render(),
    }
}

fn numeric_pair(actual: Option<&FieldValue>, expected: &FieldValue) -> Option<(f64, f64)> {
    Some((actual?.as_f64()?, expected.as_f64()?))
}

fn compare_field(actual: Option<&FieldValue>, op: FieldOp, expected: &FieldValue) -> bool {
    match op {
        FieldOp::Equals => actual.is_some_and(|a| values_equal(a, expected)),
        FieldOp::NotEquals => !actual.is_some_and(|a| values_equal(a, expected)),
        FieldOp::Contains => actual.is_some_and(|a| a.contains_text(&expected.render())),
        FieldOp::GreaterThan => numeric_pair(actual, expected).is_some_and(|(a, b)| a > b),
        FieldOp::LessThan => numeric_pair(actual, expected).is_some_and(|(a, b)| a < b),
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
