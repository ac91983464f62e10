// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber event handlers: enrollment, advance, termination.

use super::{subscriber_key, MaterializedState};
use chrono::{DateTime, Utc};
use drip_core::{Event, StepOutcome, SubscriberStatus, TerminalStatus};

pub(crate) fn apply(state: &mut MaterializedState, at: DateTime<Utc>, event: &Event) {
    match event {
        Event::SubscriberEntered { subscriber, sweep_key } => {
            // Idempotency: skip if this enrollment already exists
            if state.subscribers.contains_key(&subscriber.id) {
                return;
            }
            state.subscribers.insert(subscriber.id.clone(), (**subscriber).clone());
            state
                .active_by_key
                .insert(subscriber_key(&subscriber.workflow_id, &subscriber.email), subscriber.id.clone());
            if let Some(key) = sweep_key {
                state.sweep_keys.insert(key.clone());
            }
            if let Some(wf) = state.workflows.get_mut(&subscriber.workflow_id) {
                wf.stats.total_entered += 1;
                wf.stats.currently_active += 1;
                if let Some(current) = &subscriber.current_step {
                    wf.step_stats_mut(&current.step_id).entered += 1;
                }
            }
        }

        Event::SubscriberAdvanced { id, workflow_id, entries, current, next_action } => {
            let Some(sub) = state.subscribers.get_mut(id) else {
                return;
            };
            // Idempotency: within one enrollment a step id appears at most
            // once in history, so re-applied entries are no-ops
            let mut advanced = false;
            for entry in entries {
                if sub.has_visited(&entry.step_id) {
                    continue;
                }
                sub.history.push(entry.clone());
                advanced = true;
                if let Some(wf) = state.workflows.get_mut(workflow_id) {
                    let stats = wf.step_stats_mut(&entry.step_id);
                    match &entry.outcome {
                        StepOutcome::Failed(_) => stats.failed += 1,
                        StepOutcome::Completed | StepOutcome::Skipped => stats.completed += 1,
                    }
                }
            }
            if !advanced {
                return;
            }
            sub.current_step = current.clone();
            sub.next_action = next_action.clone();
            if let (Some(next), Some(wf)) = (current, state.workflows.get_mut(workflow_id)) {
                wf.step_stats_mut(&next.step_id).entered += 1;
            }
        }

        Event::SubscriberExited { id, workflow_id, status, reason } => {
            let Some(sub) = state.subscribers.get_mut(id) else {
                return;
            };
            // Idempotency: count the terminal transition once
            if sub.status.is_terminal() {
                return;
            }
            sub.status = SubscriberStatus::from(*status);
            sub.current_step = None;
            sub.next_action = None;
            sub.exit_reason = Some(reason.clone());
            sub.exited_at = Some(at);
            state.active_by_key.remove(&subscriber_key(workflow_id, &sub.email));
            if let Some(wf) = state.workflows.get_mut(workflow_id) {
                wf.stats.currently_active = wf.stats.currently_active.saturating_sub(1);
                match status {
                    TerminalStatus::Completed => wf.stats.completed += 1,
                    TerminalStatus::Exited => wf.stats.exited += 1,
                    TerminalStatus::Failed => wf.stats.exited += 1,
                }
            }
        }

        _ => {}
    }
}
