// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue event handlers.
//!
//! Index maintenance (due index, live-item-per-subscriber) happens here so
//! the indexes stay consistent under WAL replay as well as live commits.

use super::MaterializedState;
use chrono::{DateTime, Utc};
use drip_core::{Event, QueueItemStatus, StepKindTag};

pub(crate) fn apply(state: &mut MaterializedState, at: DateTime<Utc>, event: &Event) {
    match event {
        Event::QueuePushed { item } => {
            // Idempotency: skip if item already exists
            if state.queue.contains_key(&item.id) {
                return;
            }
            // Creation order is assigned here so replay is deterministic
            let mut stored = (**item).clone();
            if stored.seq == 0 {
                stored.seq = state.next_seq.max(1);
            }
            state.next_seq = stored.seq + 1;
            state
                .live_item_by_subscriber
                .insert(stored.subscriber_id.clone(), stored.id.clone());
            state
                .due_index
                .insert((stored.scheduled_for, stored.seq), stored.id.clone());
            state.queue.insert(stored.id.clone(), stored);
        }

        Event::QueueLeased { id, worker, lease_expires_at } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            // Idempotency: attempts increment only on the pending→processing
            // transition
            if item.status != QueueItemStatus::Pending {
                return;
            }
            state.due_index.remove(&(item.scheduled_for, item.seq));
            item.status = QueueItemStatus::Processing;
            item.attempts += 1;
            item.last_attempt_at = Some(at);
            item.lease_owner = Some(worker.clone());
            item.lease_expires_at = Some(*lease_expires_at);
            // Send throttle consumes a token at lease time
            if item.step_kind == StepKindTag::SendEmail {
                if let Some(wf) = state.workflows.get(&item.workflow_id) {
                    if !wf.throttle.is_unlimited() {
                        let counters = state.throttle.entry(item.workflow_id.clone()).or_default();
                        counters.roll(at);
                        counters.record_send();
                    }
                }
            }
        }

        Event::QueueCompleted { id, result } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            if item.status == QueueItemStatus::Completed {
                return;
            }
            state.due_index.remove(&(item.scheduled_for, item.seq));
            item.status = QueueItemStatus::Completed;
            item.result = result.clone();
            item.lease_owner = None;
            item.lease_expires_at = None;
            remove_live(state, id);
        }

        Event::QueueFailed { id, error, retry_at, dead } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            item.error = Some(error.clone());
            match retry_at {
                Some(retry_at) if !dead => {
                    state.due_index.remove(&(item.scheduled_for, item.seq));
                    item.status = QueueItemStatus::Pending;
                    item.scheduled_for = *retry_at;
                    item.lease_owner = None;
                    item.lease_expires_at = None;
                    state.due_index.insert((item.scheduled_for, item.seq), item.id.clone());
                }
                _ => {
                    state.due_index.remove(&(item.scheduled_for, item.seq));
                    item.status = QueueItemStatus::Failed;
                    item.lease_owner = None;
                    item.lease_expires_at = None;
                    remove_live(state, id);
                }
            }
        }

        Event::QueueCancelled { id } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            if !item.status.is_live() {
                return;
            }
            state.due_index.remove(&(item.scheduled_for, item.seq));
            item.status = QueueItemStatus::Cancelled;
            item.lease_owner = None;
            item.lease_expires_at = None;
            remove_live(state, id);
        }

        Event::QueueReclaimed { id } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            // Crash recovery: expired processing lease returns to pending
            if item.status != QueueItemStatus::Processing {
                return;
            }
            item.status = QueueItemStatus::Pending;
            item.lease_owner = None;
            item.lease_expires_at = None;
            state.due_index.insert((item.scheduled_for, item.seq), item.id.clone());
        }

        Event::QueueDeferred { id, scheduled_for } => {
            let Some(item) = state.queue.get_mut(id) else {
                return;
            };
            if item.status != QueueItemStatus::Pending {
                return;
            }
            state.due_index.remove(&(item.scheduled_for, item.seq));
            item.scheduled_for = *scheduled_for;
            state.due_index.insert((item.scheduled_for, item.seq), item.id.clone());
        }

        _ => {}
    }
}

fn remove_live(state: &mut MaterializedState, id: &drip_core::QueueItemId) {
    let subscriber = state
        .queue
        .get(id)
        .map(|item| item.subscriber_id.clone());
    if let Some(subscriber_id) = subscriber {
        if state.live_item_by_subscriber.get(&subscriber_id) == Some(id) {
            state.live_item_by_subscriber.remove(&subscriber_id);
        }
    }
}
