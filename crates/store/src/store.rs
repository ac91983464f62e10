// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store façade: one lock over materialized state + WAL.
//!
//! Queue leases, subscriber transitions, and workflow mutations all commit
//! through [`Store::commit`] under a single mutex, which is what makes
//! `lease` and `advance` atomic. External network calls never happen under
//! this lock; workers lease, call out, then commit.

use crate::snapshot;
use crate::state::{Engagement, MaterializedState, StoredEvent};
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Duration, Utc};
use drip_core::{
    Clock, Event, QueueItem, QueueItemId, QueueItemStatus, RetryDecision, RetryPolicy, StepError,
    StepKindTag, Subscriber, SubscriberId, ThrottleVerdict, Workflow, WorkflowId, WorkflowStatus,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),
    #[error("subscriber not found: {0}")]
    SubscriberNotFound(SubscriberId),
    #[error("queue item not found: {0}")]
    QueueItemNotFound(QueueItemId),
    #[error("subscriber {0} already has a live queue item")]
    LiveItemExists(SubscriberId),
    #[error("workflow {workflow_id} already has an active subscriber for {email}")]
    ActiveSubscriberExists { workflow_id: WorkflowId, email: String },
    #[error("enrollment already performed for sweep key {0}")]
    DuplicateEnrollment(String),
    #[error("workflow {0} is not editable in its current status")]
    NotEditable(WorkflowId),
}

/// How a guarded transition commit resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Workflow active: everything committed
    Committed,
    /// Workflow paused: advance recorded, successor not enqueued (resume
    /// re-enqueues from `next_action`)
    Deferred,
    /// Workflow archived or subscriber already terminal: transition dropped,
    /// item cancelled
    Suppressed,
}

/// Lease request parameters
#[derive(Debug, Clone)]
pub struct LeaseOptions {
    pub worker: String,
    pub max_items: usize,
    pub lease_duration: Duration,
}

struct Inner {
    state: MaterializedState,
    wal: Wal,
    snapshot_path: PathBuf,
}

/// Durable engine store
pub struct Store<C: Clock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl<C: Clock> Clone for Store<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), clock: self.clock.clone() }
    }
}

impl<C: Clock> Store<C> {
    /// Open the store in `dir`: load the snapshot if present, replay the WAL
    /// past its watermark, rebuild indexes.
    pub fn open(dir: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let snapshot_path = dir.join("state.snap");
        let wal_path = dir.join("events.wal");

        let (mut state, processed_seq) = match snapshot::load_snapshot(&snapshot_path)? {
            Some((state, seq)) => (state, seq),
            None => (MaterializedState::default(), 0),
        };
        let mut wal = Wal::open(&wal_path, processed_seq)?;
        let mut replayed = 0u64;
        while let Some(entry) = wal.next_unprocessed() {
            state.apply_event(entry.seq, entry.at, &entry.event);
            wal.mark_processed(entry.seq);
            replayed += 1;
        }
        state.rebuild_indexes();
        if replayed > 0 {
            tracing::info!(replayed, "replayed wal into materialized state");
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { state, wal, snapshot_path })),
            clock,
        })
    }

    /// Append events to the WAL and apply them, atomically
    pub fn commit(&self, events: &[Event]) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        for event in events {
            apply_one(&mut inner, now, event)?;
        }
        inner.wal.flush()?;
        Ok(())
    }

    /// Run a closure against the current state under the lock
    pub fn with_state<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    // ---- workflow operations ----

    pub fn insert_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        self.commit(&[Event::WorkflowCreated { workflow: Box::new(workflow) }])
    }

    /// Replace a workflow definition; legal only in draft or paused
    pub fn update_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        {
            let inner = self.inner.lock();
            let existing = inner
                .state
                .workflows
                .get(&workflow.id)
                .ok_or_else(|| StoreError::WorkflowNotFound(workflow.id.clone()))?;
            if !existing.is_editable() {
                return Err(StoreError::NotEditable(workflow.id.clone()));
            }
        }
        self.commit(&[Event::WorkflowUpdated { workflow: Box::new(workflow) }])
    }

    pub fn workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError> {
        self.inner
            .lock()
            .state
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::WorkflowNotFound(id.clone()))
    }

    // ---- subscriber operations ----

    pub fn subscriber(&self, id: &SubscriberId) -> Result<Subscriber, StoreError> {
        self.inner
            .lock()
            .state
            .subscribers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::SubscriberNotFound(id.clone()))
    }

    pub fn active_subscriber(&self, workflow_id: &WorkflowId, email: &str) -> Option<Subscriber> {
        let inner = self.inner.lock();
        let key = crate::state::subscriber_key(workflow_id, email);
        let id = inner.state.active_by_key.get(&key)?;
        inner.state.subscribers.get(id).cloned()
    }

    pub fn subscribers_for_workflow(&self, workflow_id: &WorkflowId) -> Vec<Subscriber> {
        self.inner
            .lock()
            .state
            .subscribers
            .values()
            .filter(|s| s.workflow_id == *workflow_id)
            .cloned()
            .collect()
    }

    /// Atomic enrollment: subscriber row + entry queue item + counters.
    ///
    /// Enforces the one-active-per-(workflow, email) constraint and the
    /// sweeper dedupe key under the same lock that commits.
    pub fn enroll(
        &self,
        subscriber: Subscriber,
        item: QueueItem,
        sweep_key: Option<String>,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let key = crate::state::subscriber_key(&subscriber.workflow_id, &subscriber.email);
        if inner.state.active_by_key.contains_key(&key) {
            return Err(StoreError::ActiveSubscriberExists {
                workflow_id: subscriber.workflow_id.clone(),
                email: subscriber.email.clone(),
            });
        }
        if let Some(sweep) = &sweep_key {
            if inner.state.sweep_keys.contains(sweep) {
                return Err(StoreError::DuplicateEnrollment(sweep.clone()));
            }
        }
        apply_one(
            &mut inner,
            now,
            &Event::SubscriberEntered { subscriber: Box::new(subscriber), sweep_key },
        )?;
        apply_one(&mut inner, now, &Event::QueuePushed { item: Box::new(item) })?;
        inner.wal.flush()?;
        Ok(())
    }

    // ---- queue operations ----

    /// Insert a pending item. At most one live item may exist per subscriber.
    pub fn enqueue(&self, item: QueueItem) -> Result<QueueItemId, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner
            .state
            .live_item_by_subscriber
            .contains_key(&item.subscriber_id)
        {
            return Err(StoreError::LiveItemExists(item.subscriber_id.clone()));
        }
        let id = item.id.clone();
        apply_one(&mut inner, now, &Event::QueuePushed { item: Box::new(item) })?;
        inner.wal.flush()?;
        Ok(id)
    }

    /// Atomically select up to `max_items` due pending items, flip them to
    /// processing, stamp the lease.
    ///
    /// Ordering: ascending `(scheduled_for, seq)`. Items whose workflow is
    /// not active are skipped; send_email items past the workflow's throttle
    /// are deferred to the window boundary instead of leased.
    pub fn lease(&self, opts: &LeaseOptions) -> Result<Vec<QueueItem>, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let due: Vec<QueueItemId> = inner
            .state
            .due_index
            .range(..=(now, u64::MAX))
            .map(|(_, id)| id.clone())
            .collect();

        let mut picked = Vec::new();
        for id in due {
            if picked.len() >= opts.max_items {
                break;
            }
            let (step_kind, workflow_id) = {
                let Some(item) = inner.state.queue.get(&id) else { continue };
                if item.status != QueueItemStatus::Pending {
                    continue;
                }
                (item.step_kind, item.workflow_id.clone())
            };
            match inner.state.workflows.get(&workflow_id).map(|wf| wf.status) {
                Some(WorkflowStatus::Active) => {}
                _ => continue,
            }
            if step_kind == StepKindTag::SendEmail {
                let state = &mut inner.state;
                let throttle = match state.workflows.get(&workflow_id) {
                    Some(wf) => wf.throttle,
                    None => continue,
                };
                if !throttle.is_unlimited() {
                    let counters = state.throttle.entry(workflow_id.clone()).or_default();
                    if let ThrottleVerdict::Defer(boundary) = counters.check(&throttle, now) {
                        apply_one(
                            &mut inner,
                            now,
                            &Event::QueueDeferred { id: id.clone(), scheduled_for: boundary },
                        )?;
                        continue;
                    }
                }
            }
            apply_one(
                &mut inner,
                now,
                &Event::QueueLeased {
                    id: id.clone(),
                    worker: opts.worker.clone(),
                    lease_expires_at: now + opts.lease_duration,
                },
            )?;
            picked.push(id);
        }
        inner.wal.flush()?;

        Ok(picked
            .into_iter()
            .filter_map(|id| inner.state.queue.get(&id).cloned())
            .collect())
    }

    /// Terminal transition from processing to completed
    pub fn complete(
        &self,
        item_id: &QueueItemId,
        result: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.commit(&[Event::QueueCompleted { id: item_id.clone(), result }])
    }

    /// Record a failure; transient errors reschedule with jittered
    /// exponential backoff until `max_attempts`, everything else dead-letters.
    pub fn fail(
        &self,
        item_id: &QueueItemId,
        error: &StepError,
        policy: &RetryPolicy,
    ) -> Result<RetryDecision, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let attempts = inner
            .state
            .queue
            .get(item_id)
            .ok_or_else(|| StoreError::QueueItemNotFound(item_id.clone()))?
            .attempts;
        let frac = rand::random_range(-1.0..=1.0);
        let decision = policy.decide(error, attempts, now, frac);
        apply_one(
            &mut inner,
            now,
            &Event::QueueFailed {
                id: item_id.clone(),
                error: error.to_string(),
                retry_at: decision.retry_at,
                dead: decision.dead,
            },
        )?;
        inner.wal.flush()?;
        Ok(decision)
    }

    /// Cancel all pending items for a workflow (pause/archive fan-out)
    pub fn cancel_pending_for_workflow(&self, workflow_id: &WorkflowId) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let ids: Vec<QueueItemId> = inner
            .state
            .queue
            .values()
            .filter(|i| i.workflow_id == *workflow_id && i.status == QueueItemStatus::Pending)
            .map(|i| i.id.clone())
            .collect();
        for id in &ids {
            apply_one(&mut inner, now, &Event::QueueCancelled { id: id.clone() })?;
        }
        inner.wal.flush()?;
        Ok(ids.len())
    }

    /// Background sweep: processing items with expired leases return to
    /// pending. Idempotency keys inside step execution prevent duplicate
    /// user-visible side effects on the retry.
    pub fn reclaim_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let ids: Vec<QueueItemId> = inner
            .state
            .queue
            .values()
            .filter(|i| i.lease_expired(now))
            .map(|i| i.id.clone())
            .collect();
        for id in &ids {
            tracing::warn!(item = %id, "reclaiming expired lease");
            apply_one(&mut inner, now, &Event::QueueReclaimed { id: id.clone() })?;
        }
        inner.wal.flush()?;
        Ok(ids.len())
    }

    pub fn queue_item(&self, id: &QueueItemId) -> Option<QueueItem> {
        self.inner.lock().state.queue.get(id).cloned()
    }

    pub fn live_item_for(&self, subscriber_id: &SubscriberId) -> Option<QueueItem> {
        let inner = self.inner.lock();
        let id = inner.state.live_item_by_subscriber.get(subscriber_id)?;
        inner.state.queue.get(id).cloned()
    }

    /// Commit a step transition, rechecking workflow and subscriber state
    /// under the lock.
    ///
    /// The external side effect may already have landed; this guard decides
    /// whether the *state transition* lands with it.
    pub fn commit_transition(
        &self,
        workflow_id: &WorkflowId,
        subscriber_id: &SubscriberId,
        item_id: &QueueItemId,
        events: &[Event],
    ) -> Result<CommitOutcome, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let workflow_status = inner.state.workflows.get(workflow_id).map(|wf| wf.status);
        let subscriber_terminal = inner
            .state
            .subscribers
            .get(subscriber_id)
            .map(|s| s.status.is_terminal())
            .unwrap_or(true);

        let outcome = match workflow_status {
            Some(WorkflowStatus::Active) if !subscriber_terminal => CommitOutcome::Committed,
            Some(WorkflowStatus::Paused | WorkflowStatus::Completed) if !subscriber_terminal => {
                CommitOutcome::Deferred
            }
            _ => CommitOutcome::Suppressed,
        };

        match outcome {
            CommitOutcome::Committed => {
                for event in events {
                    apply_one(&mut inner, now, event)?;
                }
            }
            CommitOutcome::Deferred => {
                // Advance is recorded; the successor is not enqueued. Resume
                // re-enqueues from next_action with the original due time.
                for event in events {
                    if matches!(event, Event::QueuePushed { .. }) {
                        continue;
                    }
                    apply_one(&mut inner, now, event)?;
                }
            }
            CommitOutcome::Suppressed => {
                apply_one(&mut inner, now, &Event::QueueCancelled { id: item_id.clone() })?;
            }
        }
        inner.wal.flush()?;
        Ok(outcome)
    }

    // ---- audit & maintenance ----

    /// Audit events for a workflow, newest first
    pub fn audit_events(&self, workflow_id: &WorkflowId, limit: usize) -> Vec<StoredEvent> {
        let inner = self.inner.lock();
        inner
            .state
            .events
            .iter()
            .rev()
            .filter(|e| e.event.workflow_id() == Some(workflow_id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn engagement(&self, subscriber_id: &SubscriberId) -> Engagement {
        self.inner.lock().state.engagement_for(subscriber_id)
    }

    pub fn message_ref(&self, message_id: &str) -> Option<crate::state::MessageRef> {
        self.inner.lock().state.messages.get(message_id).cloned()
    }

    pub fn sweep_key_seen(&self, key: &str) -> bool {
        self.inner.lock().state.sweep_keys.contains(key)
    }

    pub fn entry_count(&self, workflow_id: &WorkflowId, email: &str) -> u32 {
        self.inner.lock().state.entry_count(workflow_id, email)
    }

    pub fn last_entered(&self, workflow_id: &WorkflowId, email: &str) -> Option<DateTime<Utc>> {
        self.inner.lock().state.last_entered(workflow_id, email)
    }

    /// Write a snapshot at the current watermark and truncate the WAL
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let processed = inner.wal.processed_seq();
        snapshot::write_snapshot(&inner.snapshot_path, &inner.state, processed)?;
        inner.wal.truncate()?;
        Ok(())
    }
}

fn apply_one(inner: &mut Inner, now: DateTime<Utc>, event: &Event) -> Result<(), WalError> {
    let seq = inner.wal.append(event, now)?;
    inner.state.apply_event(seq, now, event);
    inner.wal.mark_processed(seq);
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
