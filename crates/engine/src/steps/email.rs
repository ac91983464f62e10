// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! send_email handler: template resolution, merge tags, tracking
//! instrumentation, transport invocation.

use crate::executor::StepContext;
use crate::tracking::{instrument_html, TrackingContext};
use crate::{template, Engine};
use drip_adapters::{
    ContactStore, EmailMessage, EmailTransport, Notifier, TemplateStore, TransportError,
    WebhookClient,
};
use drip_core::{
    Clock, Event, ExitReason, NextStep, Outcome, SendEmailConfig, StepError, Transition,
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
    pub(crate) async fn exec_send_email(
        &self,
        ctx: &StepContext<'_>,
        config: &SendEmailConfig,
        key: String,
    ) -> Transition {
        let Some(contact) = ctx.contact else {
            return Transition::terminate(ExitReason::ContactMissing, key);
        };

        // Step-level subject/body override the template's
        let mut subject = config.subject.clone();
        let mut html = config.html.clone();
        let mut text = config.text.clone();
        if let Some(template_id) = &config.template_id {
            let lookup = tokio::time::timeout(
                self.config().step_timeout(),
                self.collaborators().templates.get(&ctx.workflow.tenant, template_id),
            )
            .await;
            match lookup {
                Ok(Ok(Some(template))) => {
                    subject = subject.or(template.subject);
                    html = html.or(template.html);
                    text = text.or(template.text);
                }
                Ok(Ok(None)) => {
                    let error = StepError::permanent(format!("template {template_id} not found"));
                    return Transition {
                        outcome: Outcome::Failed(error),
                        next: NextStep::Terminate(ExitReason::DeliveryFailed),
                        side_effects: Vec::new(),
                        idempotency_key: key,
                        detail: None,
                    };
                }
                Ok(Err(error)) => {
                    return Transition::failed(StepError::transient(error.to_string()), key)
                }
                Err(_) => {
                    return Transition::failed(StepError::transient("template store timed out"), key)
                }
            }
        }

        let unsubscribe_url = format!(
            "{}/{}",
            self.config().unsubscribe_base_url.trim_end_matches('/'),
            ctx.subscriber.id
        );
        let vars = contact.merge_vars(&unsubscribe_url);
        let subject = template::render(&subject.unwrap_or_default(), &vars);
        let text = template::render(&text.unwrap_or_default(), &vars);
        let html = template::render(&html.unwrap_or_default(), &vars);

        let tracking = TrackingContext {
            base_url: self.config().tracking_base_url.trim_end_matches('/'),
            workflow_id: &ctx.workflow.id,
            subscriber_id: &ctx.subscriber.id,
            step_id: &ctx.step.id,
        };
        let html = instrument_html(&html, &tracking);

        let message = EmailMessage {
            to: contact.email.clone(),
            from: config.from.clone().unwrap_or_else(|| self.config().default_from.clone()),
            subject,
            html,
            text,
            headers: Vec::new(),
            idempotency_key: key.clone(),
        };

        let sent = tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().email.send(&message),
        )
        .await;
        match sent {
            Ok(Ok(receipt)) => Transition::completed(key.clone())
                .with_side_effect(Event::EmailSent {
                    workflow_id: ctx.workflow.id.clone(),
                    subscriber_id: ctx.subscriber.id.clone(),
                    step_id: ctx.step.id.clone(),
                    email: contact.email.clone(),
                    message_id: receipt.message_id.clone(),
                    idempotency_key: key,
                })
                .with_detail(json!({ "message_id": receipt.message_id })),
            Ok(Err(TransportError::Transient(error))) => {
                Transition::failed(StepError::transient(error), key)
            }
            Ok(Err(TransportError::Permanent(error))) => Transition {
                outcome: Outcome::Failed(StepError::permanent(error)),
                next: NextStep::Terminate(ExitReason::DeliveryFailed),
                side_effects: Vec::new(),
                idempotency_key: key,
                detail: None,
            },
            Err(_) => Transition::failed(StepError::transient("email transport timed out"), key),
        }
    }
}
