// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery webhook ingestion.
//!
//! ESP events are resolved back to the originating `(workflow, subscriber,
//! step)` through the message-id mapping recorded at send time, folded into
//! the audit log and engagement sets, and re-emitted as `email_opened` /
//! `link_clicked` trigger events for workflows listening on them.

use crate::{Engine, EngineError};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    Clock, DeliveryEvent, DeliveryKind, Event, ExitReason, TriggerEvent, TriggerKind,
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
    /// Consume one delivery-bus event
    pub async fn handle_delivery(&self, event: &DeliveryEvent) -> Result<(), EngineError> {
        let Some(origin) = self.store().message_ref(&event.message_id) else {
            tracing::debug!(message_id = %event.message_id, "delivery event for unknown message");
            return Ok(());
        };
        let workflow = self.store().workflow(&origin.workflow_id)?;

        match event.event {
            DeliveryKind::Delivered => Ok(()),

            DeliveryKind::Opened => {
                self.store().commit(&[Event::EmailOpened {
                    workflow_id: origin.workflow_id.clone(),
                    subscriber_id: origin.subscriber_id.clone(),
                    step_id: origin.step_id.clone(),
                    email: origin.email.clone(),
                }])?;
                let trigger = TriggerEvent::new(
                    TriggerKind::EmailOpened,
                    workflow.tenant.clone(),
                    origin.email.clone(),
                    event.occurred_at,
                );
                self.handle_trigger(&trigger).await?;
                Ok(())
            }

            DeliveryKind::Clicked => {
                let url = event.url.clone().unwrap_or_default();
                self.store().commit(&[Event::EmailClicked {
                    workflow_id: origin.workflow_id.clone(),
                    subscriber_id: origin.subscriber_id.clone(),
                    step_id: origin.step_id.clone(),
                    email: origin.email.clone(),
                    url: url.clone(),
                }])?;
                let trigger = TriggerEvent::new(
                    TriggerKind::LinkClicked,
                    workflow.tenant.clone(),
                    origin.email.clone(),
                    event.occurred_at,
                )
                .with_payload(json!({ "url": url }));
                self.handle_trigger(&trigger).await?;
                Ok(())
            }

            DeliveryKind::Bounced => {
                // Hard bounce: the address is undeliverable
                let mut events = Vec::new();
                if let Some(live) = self.store().live_item_for(&origin.subscriber_id) {
                    events.push(Event::QueueCancelled { id: live.id });
                }
                events.push(Event::SubscriberExited {
                    id: origin.subscriber_id.clone(),
                    workflow_id: origin.workflow_id.clone(),
                    status: ExitReason::DeliveryFailed.terminal_status(),
                    reason: ExitReason::DeliveryFailed,
                });
                self.store().commit(&events)?;
                Ok(())
            }

            DeliveryKind::Complained => {
                self.collaborators()
                    .contacts
                    .set_unsubscribed(&workflow.tenant, &origin.email)
                    .await?;
                let mut events = vec![Event::SubscriberUnsubscribed {
                    workflow_id: origin.workflow_id.clone(),
                    subscriber_id: Some(origin.subscriber_id.clone()),
                    email: origin.email.clone(),
                }];
                if workflow.exit.exit_on_unsubscribe {
                    if let Some(live) = self.store().live_item_for(&origin.subscriber_id) {
                        events.push(Event::QueueCancelled { id: live.id });
                    }
                    events.push(Event::SubscriberExited {
                        id: origin.subscriber_id.clone(),
                        workflow_id: origin.workflow_id.clone(),
                        status: ExitReason::Unsubscribed.terminal_status(),
                        reason: ExitReason::Unsubscribed,
                    });
                }
                self.store().commit(&events)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
