// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! webhook handler.
//!
//! 2xx completes; 408/429/5xx and transport errors are transient; any other
//! 4xx is a permanent failure that records step_failed but advances the
//! subscriber linearly rather than terminating.

use crate::executor::StepContext;
use crate::Engine;
use drip_adapters::{
    ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient, WebhookError,
    WebhookRequest,
};
use drip_core::{Clock, Event, NextStep, Outcome, StepError, Transition, WebhookConfig};
use serde_json::{json, Value};

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) async fn exec_webhook(
        &self,
        ctx: &StepContext<'_>,
        config: &WebhookConfig,
        key: String,
    ) -> Transition {
        let mut body = match &config.payload {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        body.insert("email".to_string(), json!(ctx.subscriber.email));
        body.insert(
            "name".to_string(),
            json!(ctx.contact.map(|c| c.name.clone()).unwrap_or_default()),
        );
        body.insert("subscriber_id".to_string(), json!(ctx.subscriber.id));
        body.insert("workflow_id".to_string(), json!(ctx.workflow.id));
        body.insert("timestamp".to_string(), json!(ctx.now.to_rfc3339()));

        let request = WebhookRequest {
            url: config.url.clone(),
            method: config.method.clone(),
            headers: config.headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            body: Value::Object(body),
            timeout: config
                .timeout_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| self.config().webhook_timeout()),
        };

        match self.collaborators().webhooks.call(&request).await {
            Ok(response) => {
                let called = Event::WebhookCalled {
                    workflow_id: ctx.workflow.id.clone(),
                    subscriber_id: ctx.subscriber.id.clone(),
                    step_id: ctx.step.id.clone(),
                    url: config.url.clone(),
                    status: response.status,
                };
                match response.status {
                    200..=299 => Transition::completed(key).with_side_effect(called),
                    408 | 429 | 500..=599 => Transition::failed(
                        StepError::transient(format!("webhook status {}", response.status)),
                        key,
                    ),
                    status => Transition {
                        outcome: Outcome::Failed(StepError::permanent(format!(
                            "webhook status {status}"
                        ))),
                        next: NextStep::Linear,
                        side_effects: vec![called],
                        idempotency_key: key,
                        detail: Some(json!({ "status": status })),
                    },
                }
            }
            Err(WebhookError::Timeout(timeout)) => Transition::failed(
                StepError::transient(format!("webhook timed out after {timeout:?}")),
                key,
            ),
            Err(WebhookError::Network(error)) => {
                Transition::failed(StepError::transient(error), key)
            }
        }
    }
}
