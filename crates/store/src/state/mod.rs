// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.
//!
//! # Idempotency requirement
//!
//! **All event handlers MUST be idempotent.** Applying the same event twice
//! must produce the same state as applying it once: the same events are
//! replayed after a crash between a WAL flush and a snapshot. Guidelines:
//!
//! - use assignment (`=`) instead of mutation (`+=`, `-=`)
//! - guard inserts with existence checks
//! - guard counter increments with status-transition checks
//! - dedupe side-effect records by idempotency key

mod events;
mod queue;
mod subscribers;
mod workflows;

use chrono::{DateTime, Utc};
use drip_core::{
    Event, QueueItem, QueueItemId, StepId, Subscriber, SubscriberId, SubscriberStatus,
    ThrottleCounters, Workflow, WorkflowId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// An audit-log entry: a committed event with its commit metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: Event,
}

/// Per-subscriber email engagement, the input to `opened_email` /
/// `clicked_link` conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub opened: HashSet<StepId>,
    pub clicked_steps: HashSet<StepId>,
    pub clicked_urls: HashSet<String>,
}

/// Resolution record from provider message id back to the originating send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRef {
    pub workflow_id: WorkflowId,
    pub subscriber_id: SubscriberId,
    pub step_id: StepId,
    pub email: String,
}

/// Materialized state built from WAL events
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub workflows: HashMap<WorkflowId, Workflow>,
    pub subscribers: HashMap<SubscriberId, Subscriber>,
    pub queue: HashMap<QueueItemId, QueueItem>,
    /// Append-only audit log (spec event kinds only)
    pub events: Vec<StoredEvent>,
    /// email:sent idempotency keys already recorded
    pub sent_keys: HashSet<String>,
    /// Sweeper enrollment dedupe keys
    pub sweep_keys: HashSet<String>,
    /// Unsubscribe dedupe keys: `workflow|email`
    pub unsub_keys: HashSet<String>,
    /// Goal dedupe keys: `workflow|subscriber`
    pub goal_keys: HashSet<String>,
    pub engagement: HashMap<SubscriberId, Engagement>,
    pub messages: HashMap<String, MessageRef>,
    pub throttle: HashMap<WorkflowId, ThrottleCounters>,
    /// Monotonic queue-item creation counter (lease tie-break)
    pub next_seq: u64,

    /// `workflow|email` → the single active subscriber. Rebuilt on load.
    #[serde(skip)]
    pub active_by_key: HashMap<String, SubscriberId>,
    /// Subscriber → its one live (pending|processing) queue item. Rebuilt.
    #[serde(skip)]
    pub live_item_by_subscriber: HashMap<SubscriberId, QueueItemId>,
    /// `(scheduled_for, seq)` → pending item, the lease scan order. Rebuilt.
    #[serde(skip)]
    pub due_index: BTreeMap<(DateTime<Utc>, u64), QueueItemId>,
}

/// Index key for the one-active-subscriber-per-(workflow, email) constraint
pub fn subscriber_key(workflow_id: &WorkflowId, email: &str) -> String {
    format!("{}|{}", workflow_id, email.to_ascii_lowercase())
}

impl MaterializedState {
    /// Apply an event to derive state changes.
    ///
    /// Events are facts about what happened; state is derived from them.
    pub fn apply_event(&mut self, seq: u64, at: DateTime<Utc>, event: &Event) {
        match event {
            Event::WorkflowCreated { .. }
            | Event::WorkflowUpdated { .. }
            | Event::WorkflowActivated { .. }
            | Event::WorkflowPaused { .. }
            | Event::WorkflowResumed { .. }
            | Event::WorkflowCompleted { .. }
            | Event::WorkflowArchived { .. } => workflows::apply(self, at, event),

            Event::SubscriberEntered { .. }
            | Event::SubscriberAdvanced { .. }
            | Event::SubscriberExited { .. } => subscribers::apply(self, at, event),

            Event::QueuePushed { .. }
            | Event::QueueLeased { .. }
            | Event::QueueCompleted { .. }
            | Event::QueueFailed { .. }
            | Event::QueueCancelled { .. }
            | Event::QueueReclaimed { .. }
            | Event::QueueDeferred { .. } => queue::apply(self, at, event),

            // Audit-bearing side effects (email, tags, webhooks, goals, ...)
            _ => {}
        }
        events::apply(self, seq, at, event);
    }

    /// Rebuild the runtime indexes after snapshot load or WAL replay
    pub fn rebuild_indexes(&mut self) {
        self.active_by_key.clear();
        self.live_item_by_subscriber.clear();
        self.due_index.clear();
        for sub in self.subscribers.values() {
            if sub.status == SubscriberStatus::Active {
                self.active_by_key
                    .insert(subscriber_key(&sub.workflow_id, &sub.email), sub.id.clone());
            }
        }
        for item in self.queue.values() {
            if item.status.is_live() {
                self.live_item_by_subscriber
                    .insert(item.subscriber_id.clone(), item.id.clone());
            }
            if item.status == drip_core::QueueItemStatus::Pending {
                self.due_index
                    .insert((item.scheduled_for, item.seq), item.id.clone());
            }
        }
    }

    /// Count every enrollment (any status) of `email` into `workflow` —
    /// the max-entries entry gate input
    pub fn entry_count(&self, workflow_id: &WorkflowId, email: &str) -> u32 {
        let email = email.to_ascii_lowercase();
        self.subscribers
            .values()
            .filter(|s| s.workflow_id == *workflow_id && s.email.to_ascii_lowercase() == email)
            .count() as u32
    }

    /// Most recent enrollment time of `email` into `workflow`, if any
    pub fn last_entered(&self, workflow_id: &WorkflowId, email: &str) -> Option<DateTime<Utc>> {
        let email = email.to_ascii_lowercase();
        self.subscribers
            .values()
            .filter(|s| s.workflow_id == *workflow_id && s.email.to_ascii_lowercase() == email)
            .map(|s| s.last_entered_at)
            .max()
    }

    pub fn engagement_for(&self, subscriber_id: &SubscriberId) -> Engagement {
        self.engagement.get(subscriber_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
