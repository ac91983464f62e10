// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! notification handler: out-of-band operator alert.
//!
//! Same failure taxonomy as webhooks: permanent delivery problems record the
//! failure and advance linearly.

use crate::executor::StepContext;
use crate::{template, Engine};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, NextStep, NotificationConfig, Outcome, StepError, Transition};
use std::collections::HashMap;

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) async fn exec_notification(
        &self,
        ctx: &StepContext<'_>,
        config: &NotificationConfig,
        key: String,
    ) -> Transition {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("email".to_string(), ctx.subscriber.email.clone());
        vars.insert("workflow".to_string(), ctx.workflow.name.clone());
        if let Some(contact) = ctx.contact {
            vars.insert("name".to_string(), contact.name.clone());
        }
        let message = template::render(&config.message, &vars);
        let subject = config
            .subject
            .clone()
            .unwrap_or_else(|| format!("[{}] automation alert", ctx.workflow.name));

        let sent = tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().notifier.notify(&config.recipient, &subject, &message),
        )
        .await;
        match sent {
            Ok(Ok(())) => Transition::completed(key),
            Ok(Err(error)) if error.is_transient() => {
                Transition::failed(StepError::transient(error.to_string()), key)
            }
            Ok(Err(error)) => Transition {
                outcome: Outcome::Failed(StepError::permanent(error.to_string())),
                next: NextStep::Linear,
                side_effects: Vec::new(),
                idempotency_key: key,
                detail: None,
            },
            Err(_) => Transition::failed(StepError::transient("notifier timed out"), key),
        }
    }
}
