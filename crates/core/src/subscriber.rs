// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber: the runtime instance of one contact flowing through one
//! workflow.
//!
//! Invariants:
//! - at most one `active` subscriber per `(workflow, email)`
//! - `current_step` is null iff status is terminal
//! - `next_action.scheduled_for` is set iff status is `active` and the
//!   current step has not yet executed
//! - history `completed_at` values strictly increase

use crate::id::{StepId, SubscriberId, TenantId, WorkflowId};
use crate::step::StepKindTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscriber lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Active,
    Completed,
    Exited,
    Failed,
    Paused,
}

crate::simple_display! {
    SubscriberStatus {
        Active => "active",
        Completed => "completed",
        Exited => "exited",
        Failed => "failed",
        Paused => "paused",
    }
}

impl SubscriberStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Exited | Self::Failed)
    }
}

/// Terminal status bucket for a termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Completed,
    Exited,
    Failed,
}

impl From<TerminalStatus> for SubscriberStatus {
    fn from(t: TerminalStatus) -> Self {
        match t {
            TerminalStatus::Completed => SubscriberStatus::Completed,
            TerminalStatus::Exited => SubscriberStatus::Exited,
            TerminalStatus::Failed => SubscriberStatus::Failed,
        }
    }
}

/// Why a subscriber left the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Walked off the end of the graph
    ReachedEnd,
    /// Condition or goal branch terminated the journey
    GoalReached,
    Unsubscribed,
    /// Current step no longer exists in the (re-edited) workflow
    StepRemoved,
    /// A step id would repeat within one enrollment
    Cycle,
    UnsupportedStep,
    /// Branch target step id does not exist
    DanglingBranch,
    AutomationArchived,
    ContactMissing,
    /// Permanent delivery failure (invalid address, hard bounce)
    DeliveryFailed,
    /// Retries exhausted on a transient failure
    RetriesExhausted,
}

crate::simple_display! {
    ExitReason {
        ReachedEnd => "reached_end",
        GoalReached => "goal_reached",
        Unsubscribed => "unsubscribed",
        StepRemoved => "step_removed",
        Cycle => "cycle",
        UnsupportedStep => "unsupported_step",
        DanglingBranch => "dangling_branch",
        AutomationArchived => "automation_archived",
        ContactMissing => "contact_missing",
        DeliveryFailed => "delivery_failed",
        RetriesExhausted => "retries_exhausted",
    }
}

impl ExitReason {
    /// Which terminal status this reason maps to.
    ///
    /// Definition errors that are the tenant's fault exit; integrity-breaking
    /// failures fail.
    pub fn terminal_status(&self) -> TerminalStatus {
        match self {
            ExitReason::ReachedEnd | ExitReason::GoalReached => TerminalStatus::Completed,
            ExitReason::Unsubscribed
            | ExitReason::StepRemoved
            | ExitReason::Cycle
            | ExitReason::UnsupportedStep
            | ExitReason::DanglingBranch
            | ExitReason::AutomationArchived
            | ExitReason::ContactMissing => TerminalStatus::Exited,
            ExitReason::DeliveryFailed | ExitReason::RetriesExhausted => TerminalStatus::Failed,
        }
    }
}

/// Pointer to the step the subscriber currently occupies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStep {
    pub step_id: StepId,
    pub entered_at: DateTime<Utc>,
}

/// The next scheduled execution for this subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub step_id: StepId,
    pub kind: StepKindTag,
    pub scheduled_for: DateTime<Utc>,
}

/// Outcome recorded for an executed (or skipped) step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Completed,
    Skipped,
    Failed(String),
}

crate::simple_display! {
    StepOutcome {
        Completed => "completed",
        Skipped => "skipped",
        Failed(..) => "failed",
    }
}

/// Compact append-only record of one step execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step_id: StepId,
    pub kind: StepKindTag,
    pub entered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcome: StepOutcome,
    /// Outcome payload: chosen branch, split variant, provider message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// One contact's journey through one workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub workflow_id: WorkflowId,
    pub tenant: TenantId,
    /// Denormalized; the stable key for the lifetime of the subscriber
    pub email: String,
    pub status: SubscriberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<CurrentStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub entry_count: u32,
    pub first_entered_at: DateTime<Utc>,
    pub last_entered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn new(
        workflow_id: WorkflowId,
        tenant: TenantId,
        email: impl Into<String>,
        entry_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SubscriberId::new(),
            workflow_id,
            tenant,
            email: email.into(),
            status: SubscriberStatus::Active,
            current_step: None,
            next_action: None,
            history: Vec::new(),
            entry_count,
            first_entered_at: now,
            last_entered_at: now,
            exit_reason: None,
            exited_at: None,
        }
    }

    /// A step id may not appear twice within one enrollment (cycle guard)
    pub fn has_visited(&self, step_id: &StepId) -> bool {
        self.history.iter().any(|h| h.step_id == *step_id)
    }

    /// Apply a terminal transition in place
    pub fn terminate(&mut self, reason: ExitReason, at: DateTime<Utc>) {
        self.status = reason.terminal_status().into();
        self.current_step = None;
        self.next_action = None;
        self.exit_reason = Some(reason);
        self.exited_at = Some(at);
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
