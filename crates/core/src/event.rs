// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that drive state transitions and form the audit log.
//!
//! Serializes with `{"type": "domain:action", ...fields}` format. One enum
//! serves three roles: WAL record, materialized-state transition source, and
//! (for the kinds flagged by [`Event::is_audit`]) append-only audit entry.

use crate::id::{QueueItemId, StepId, SubscriberId, WorkflowId};
use crate::queue::QueueItem;
use crate::step::StepKindTag;
use crate::subscriber::{CurrentStep, ExitReason, HistoryEntry, NextAction, Subscriber, TerminalStatus};
use crate::workflow::Workflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- workflow lifecycle --
    #[serde(rename = "workflow:created")]
    WorkflowCreated { workflow: Box<Workflow> },

    /// Full-definition replace; legal only in draft or paused
    #[serde(rename = "workflow:updated")]
    WorkflowUpdated { workflow: Box<Workflow> },

    #[serde(rename = "workflow:activated")]
    WorkflowActivated { id: WorkflowId },

    #[serde(rename = "workflow:paused")]
    WorkflowPaused { id: WorkflowId },

    #[serde(rename = "workflow:resumed")]
    WorkflowResumed { id: WorkflowId },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted { id: WorkflowId },

    #[serde(rename = "workflow:archived")]
    WorkflowArchived { id: WorkflowId },

    // -- subscriber --
    #[serde(rename = "subscriber:entered")]
    SubscriberEntered {
        subscriber: Box<Subscriber>,
        /// Sweeper dedupe key; prevents double-enrollment across sweep retries
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sweep_key: Option<String>,
    },

    /// One committed state advance: history append (the executed step plus
    /// any materialized waits) + step pointer + next_action, applied
    /// atomically with the successor's queue:pushed
    #[serde(rename = "subscriber:advanced")]
    SubscriberAdvanced {
        id: SubscriberId,
        workflow_id: WorkflowId,
        entries: Vec<HistoryEntry>,
        current: Option<CurrentStep>,
        next_action: Option<NextAction>,
    },

    #[serde(rename = "subscriber:exited")]
    SubscriberExited {
        id: SubscriberId,
        workflow_id: WorkflowId,
        status: TerminalStatus,
        reason: ExitReason,
    },

    #[serde(rename = "subscriber:unsubscribed")]
    SubscriberUnsubscribed {
        workflow_id: WorkflowId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscriber_id: Option<SubscriberId>,
        email: String,
    },

    // -- queue --
    #[serde(rename = "queue:pushed")]
    QueuePushed { item: Box<QueueItem> },

    #[serde(rename = "queue:leased")]
    QueueLeased {
        id: QueueItemId,
        worker: String,
        lease_expires_at: DateTime<Utc>,
    },

    #[serde(rename = "queue:completed")]
    QueueCompleted {
        id: QueueItemId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },

    /// `retry_at` reschedules the item; `dead` marks it failed for good
    #[serde(rename = "queue:failed")]
    QueueFailed {
        id: QueueItemId,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_at: Option<DateTime<Utc>>,
        dead: bool,
    },

    #[serde(rename = "queue:cancelled")]
    QueueCancelled { id: QueueItemId },

    /// Expired lease returned to pending (crash recovery)
    #[serde(rename = "queue:reclaimed")]
    QueueReclaimed { id: QueueItemId },

    /// Throttle deferral: scheduled_for pushed to the window boundary
    #[serde(rename = "queue:deferred")]
    QueueDeferred { id: QueueItemId, scheduled_for: DateTime<Utc> },

    // -- step execution --
    #[serde(rename = "step:started")]
    StepStarted {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        kind: StepKindTag,
    },

    #[serde(rename = "step:completed")]
    StepCompleted {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        kind: StepKindTag,
    },

    #[serde(rename = "step:failed")]
    StepFailed {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        kind: StepKindTag,
        error: String,
    },

    // -- email --
    #[serde(rename = "email:sent")]
    EmailSent {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        email: String,
        message_id: String,
        /// Dedupe key: a reclaimed retry that already sent writes no second
        /// audit entry
        idempotency_key: String,
    },

    #[serde(rename = "email:opened")]
    EmailOpened {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        email: String,
    },

    #[serde(rename = "email:clicked")]
    EmailClicked {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        email: String,
        url: String,
    },

    // -- step side effects --
    #[serde(rename = "condition:evaluated")]
    ConditionEvaluated {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        result: bool,
    },

    #[serde(rename = "tag:added")]
    TagAdded {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        email: String,
        tags: Vec<String>,
    },

    #[serde(rename = "tag:removed")]
    TagRemoved {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        email: String,
        tags: Vec<String>,
    },

    #[serde(rename = "webhook:called")]
    WebhookCalled {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        url: String,
        status: u16,
    },

    #[serde(rename = "goal:reached")]
    GoalReached {
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<StepId>,
    },

    // -- errors --
    #[serde(rename = "engine:error")]
    EngineError {
        workflow_id: WorkflowId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscriber_id: Option<SubscriberId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<StepId>,
        message: String,
    },
}

impl Event {
    /// The workflow this event belongs to, for the per-workflow audit index
    pub fn workflow_id(&self) -> Option<&WorkflowId> {
        match self {
            Event::WorkflowCreated { workflow } | Event::WorkflowUpdated { workflow } => {
                Some(&workflow.id)
            }
            Event::WorkflowActivated { id }
            | Event::WorkflowPaused { id }
            | Event::WorkflowResumed { id }
            | Event::WorkflowCompleted { id }
            | Event::WorkflowArchived { id } => Some(id),
            Event::SubscriberEntered { subscriber, .. } => Some(&subscriber.workflow_id),
            Event::SubscriberAdvanced { workflow_id, .. }
            | Event::SubscriberExited { workflow_id, .. }
            | Event::SubscriberUnsubscribed { workflow_id, .. }
            | Event::StepStarted { workflow_id, .. }
            | Event::StepCompleted { workflow_id, .. }
            | Event::StepFailed { workflow_id, .. }
            | Event::EmailSent { workflow_id, .. }
            | Event::EmailOpened { workflow_id, .. }
            | Event::EmailClicked { workflow_id, .. }
            | Event::ConditionEvaluated { workflow_id, .. }
            | Event::TagAdded { workflow_id, .. }
            | Event::TagRemoved { workflow_id, .. }
            | Event::WebhookCalled { workflow_id, .. }
            | Event::GoalReached { workflow_id, .. }
            | Event::EngineError { workflow_id, .. } => Some(workflow_id),
            Event::QueuePushed { item } => Some(&item.workflow_id),
            Event::QueueLeased { .. }
            | Event::QueueCompleted { .. }
            | Event::QueueFailed { .. }
            | Event::QueueCancelled { .. }
            | Event::QueueReclaimed { .. }
            | Event::QueueDeferred { .. } => None,
        }
    }

    /// Whether this event kind belongs in the tenant-visible audit log.
    ///
    /// Queue mechanics and full-row state events are WAL-only.
    pub fn is_audit(&self) -> bool {
        !matches!(
            self,
            Event::WorkflowCreated { .. }
                | Event::WorkflowUpdated { .. }
                | Event::SubscriberAdvanced { .. }
                | Event::QueuePushed { .. }
                | Event::QueueLeased { .. }
                | Event::QueueCompleted { .. }
                | Event::QueueFailed { .. }
                | Event::QueueCancelled { .. }
                | Event::QueueReclaimed { .. }
                | Event::QueueDeferred { .. }
        )
    }

    /// One-line summary for tracing
    pub fn summary(&self) -> String {
        match self {
            Event::WorkflowCreated { workflow } => format!("workflow:created id={}", workflow.id),
            Event::WorkflowUpdated { workflow } => format!("workflow:updated id={}", workflow.id),
            Event::WorkflowActivated { id } => format!("workflow:activated id={id}"),
            Event::WorkflowPaused { id } => format!("workflow:paused id={id}"),
            Event::WorkflowResumed { id } => format!("workflow:resumed id={id}"),
            Event::WorkflowCompleted { id } => format!("workflow:completed id={id}"),
            Event::WorkflowArchived { id } => format!("workflow:archived id={id}"),
            Event::SubscriberEntered { subscriber, .. } => {
                format!("subscriber:entered id={} email={}", subscriber.id, subscriber.email)
            }
            Event::SubscriberAdvanced { id, entries, .. } => {
                let step = entries.first().map(|e| e.step_id.as_str()).unwrap_or("-");
                format!("subscriber:advanced id={id} step={step}")
            }
            Event::SubscriberExited { id, reason, .. } => {
                format!("subscriber:exited id={id} reason={reason}")
            }
            Event::SubscriberUnsubscribed { email, .. } => {
                format!("subscriber:unsubscribed email={email}")
            }
            Event::QueuePushed { item } => {
                format!("queue:pushed id={} step={}", item.id, item.step_id)
            }
            Event::QueueLeased { id, worker, .. } => format!("queue:leased id={id} worker={worker}"),
            Event::QueueCompleted { id, .. } => format!("queue:completed id={id}"),
            Event::QueueFailed { id, dead, .. } => format!("queue:failed id={id} dead={dead}"),
            Event::QueueCancelled { id } => format!("queue:cancelled id={id}"),
            Event::QueueReclaimed { id } => format!("queue:reclaimed id={id}"),
            Event::QueueDeferred { id, .. } => format!("queue:deferred id={id}"),
            Event::StepStarted { step_id, kind, .. } => {
                format!("step:started step={step_id} kind={kind}")
            }
            Event::StepCompleted { step_id, kind, .. } => {
                format!("step:completed step={step_id} kind={kind}")
            }
            Event::StepFailed { step_id, error, .. } => {
                format!("step:failed step={step_id} error={error}")
            }
            Event::EmailSent { email, message_id, .. } => {
                format!("email:sent to={email} message={message_id}")
            }
            Event::EmailOpened { email, .. } => format!("email:opened to={email}"),
            Event::EmailClicked { email, url, .. } => format!("email:clicked to={email} url={url}"),
            Event::ConditionEvaluated { step_id, result, .. } => {
                format!("condition:evaluated step={step_id} result={result}")
            }
            Event::TagAdded { email, tags, .. } => {
                format!("tag:added email={email} tags={}", tags.join(","))
            }
            Event::TagRemoved { email, tags, .. } => {
                format!("tag:removed email={email} tags={}", tags.join(","))
            }
            Event::WebhookCalled { url, status, .. } => {
                format!("webhook:called url={url} status={status}")
            }
            Event::GoalReached { subscriber_id, .. } => {
                format!("goal:reached subscriber={subscriber_id}")
            }
            Event::EngineError { message, .. } => format!("engine:error {message}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
