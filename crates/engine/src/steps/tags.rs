// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tag_add / tag_remove / list_add / list_remove handlers.
//!
//! All four are set-level mutations on the contact store, idempotent by
//! construction: retries cannot double-apply.

use crate::executor::StepContext;
use crate::Engine;
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, Event, StepError, Transition};

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) async fn exec_tags(
        &self,
        ctx: &StepContext<'_>,
        tags: &[String],
        add: bool,
        key: String,
    ) -> Transition {
        let (to_add, to_remove): (&[String], &[String]) =
            if add { (tags, &[]) } else { (&[], tags) };
        let update = tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().contacts.update_tags(
                &ctx.workflow.tenant,
                &ctx.subscriber.email,
                to_add,
                to_remove,
            ),
        )
        .await;
        match update {
            Ok(Ok(())) => {
                let event = if add {
                    Event::TagAdded {
                        workflow_id: ctx.workflow.id.clone(),
                        subscriber_id: ctx.subscriber.id.clone(),
                        email: ctx.subscriber.email.clone(),
                        tags: tags.to_vec(),
                    }
                } else {
                    Event::TagRemoved {
                        workflow_id: ctx.workflow.id.clone(),
                        subscriber_id: ctx.subscriber.id.clone(),
                        email: ctx.subscriber.email.clone(),
                        tags: tags.to_vec(),
                    }
                };
                Transition::completed(key).with_side_effect(event)
            }
            Ok(Err(error)) => Transition::failed(StepError::transient(error.to_string()), key),
            Err(_) => Transition::failed(StepError::transient("contact store timed out"), key),
        }
    }

    pub(crate) async fn exec_lists(
        &self,
        ctx: &StepContext<'_>,
        list_id: &str,
        add: bool,
        key: String,
    ) -> Transition {
        let lists = [list_id.to_string()];
        let (to_add, to_remove): (&[String], &[String]) =
            if add { (&lists, &[]) } else { (&[], &lists) };
        let update = tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().contacts.update_lists(
                &ctx.workflow.tenant,
                &ctx.subscriber.email,
                to_add,
                to_remove,
            ),
        )
        .await;
        match update {
            Ok(Ok(())) => Transition::completed(key),
            Ok(Err(error)) => Transition::failed(StepError::transient(error.to_string()), key),
            Err(_) => Transition::failed(StepError::transient("contact store timed out"), key),
        }
    }
}
