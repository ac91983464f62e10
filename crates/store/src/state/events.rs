// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit log, engagement sets, message resolution, and send dedupe.

use super::{MaterializedState, MessageRef, StoredEvent};
use chrono::{DateTime, Utc};
use drip_core::Event;

pub(crate) fn apply(state: &mut MaterializedState, seq: u64, at: DateTime<Utc>, event: &Event) {
    // Counter and set maintenance for audit-bearing side effects
    match event {
        Event::EmailSent { workflow_id, subscriber_id, step_id, email, message_id, idempotency_key } => {
            // Dedupe by idempotency key: a reclaimed retry that already sent
            // contributes exactly one audit entry and one counter bump
            if state.sent_keys.contains(idempotency_key) {
                return;
            }
            state.sent_keys.insert(idempotency_key.clone());
            state.messages.insert(
                message_id.clone(),
                MessageRef {
                    workflow_id: workflow_id.clone(),
                    subscriber_id: subscriber_id.clone(),
                    step_id: step_id.clone(),
                    email: email.clone(),
                },
            );
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.emails_sent += 1;
            }
        }

        Event::EmailOpened { workflow_id, subscriber_id, step_id, .. } => {
            let engagement = state.engagement.entry(subscriber_id.clone()).or_default();
            // First open per (subscriber, step) counts
            if !engagement.opened.insert(step_id.clone()) {
                return;
            }
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.emails_opened += 1;
            }
        }

        Event::EmailClicked { workflow_id, subscriber_id, step_id, url, .. } => {
            let engagement = state.engagement.entry(subscriber_id.clone()).or_default();
            engagement.clicked_steps.insert(step_id.clone());
            // First click per (subscriber, url) counts
            if !engagement.clicked_urls.insert(url.clone()) {
                return;
            }
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.emails_clicked += 1;
            }
        }

        Event::SubscriberUnsubscribed { workflow_id, email, .. } => {
            let key = format!("{}|{}", workflow_id, email.to_ascii_lowercase());
            if !state.unsub_keys.insert(key) {
                return;
            }
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.unsubscribed += 1;
            }
        }

        Event::GoalReached { workflow_id, subscriber_id, .. } => {
            let key = format!("{workflow_id}|{subscriber_id}");
            if !state.goal_keys.insert(key) {
                return;
            }
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.goal_reached += 1;
            }
        }

        _ => {}
    }

    if !event.is_audit() {
        return;
    }
    // Replay guard: the log is strictly seq-ordered
    if state.events.last().is_some_and(|last| last.seq >= seq) {
        return;
    }
    state.events.push(StoredEvent { seq, at, event: event.clone() });
}
