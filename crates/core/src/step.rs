// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow step definitions.
//!
//! Each step is a tagged variant with kind-specific config. Unknown
//! discriminators deserialize to [`StepKind::Unsupported`] and route the
//! subscriber to the `unsupported_step` exit instead of failing the load.

use crate::contact::FieldValue;
use crate::id::StepId;
use crate::schedule::DelayUnit;
use chrono::Weekday;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    /// Monotonic position; the default linear successor is the next order
    pub order: u32,
    /// Explicit entry-step marker; falls back to the lowest order
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub entry: bool,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    pub fn new(id: impl Into<StepId>, order: u32, kind: StepKind) -> Self {
        Self { id: id.into(), order, entry: false, kind }
    }

    pub fn kind_tag(&self) -> StepKindTag {
        StepKindTag::from(&self.kind)
    }
}

/// Kind-specific step configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    SendEmail(SendEmailConfig),
    Wait(WaitConfig),
    Condition(ConditionConfig),
    TagAdd { tags: Vec<String> },
    TagRemove { tags: Vec<String> },
    ListAdd { list_id: String },
    ListRemove { list_id: String },
    Webhook(WebhookConfig),
    Notification(NotificationConfig),
    ContactUpdate { fields: IndexMap<String, FieldValue> },
    GoalCheck(GoalConfig),
    SplitTest(SplitConfig),
    /// Forward-compatibility: unrecognized kinds exit as `unsupported_step`
    #[serde(other)]
    Unsupported,
}

/// Tag-only variant of [`StepKind`] for queue items and history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKindTag {
    SendEmail,
    Wait,
    Condition,
    TagAdd,
    TagRemove,
    ListAdd,
    ListRemove,
    Webhook,
    Notification,
    ContactUpdate,
    GoalCheck,
    SplitTest,
    Unsupported,
}

impl From<&StepKind> for StepKindTag {
    fn from(kind: &StepKind) -> Self {
        match kind {
            StepKind::SendEmail(_) => StepKindTag::SendEmail,
            StepKind::Wait(_) => StepKindTag::Wait,
            StepKind::Condition(_) => StepKindTag::Condition,
            StepKind::TagAdd { .. } => StepKindTag::TagAdd,
            StepKind::TagRemove { .. } => StepKindTag::TagRemove,
            StepKind::ListAdd { .. } => StepKindTag::ListAdd,
            StepKind::ListRemove { .. } => StepKindTag::ListRemove,
            StepKind::Webhook(_) => StepKindTag::Webhook,
            StepKind::Notification(_) => StepKindTag::Notification,
            StepKind::ContactUpdate { .. } => StepKindTag::ContactUpdate,
            StepKind::GoalCheck(_) => StepKindTag::GoalCheck,
            StepKind::SplitTest(_) => StepKindTag::SplitTest,
            StepKind::Unsupported => StepKindTag::Unsupported,
        }
    }
}

crate::simple_display! {
    StepKindTag {
        SendEmail => "send_email",
        Wait => "wait",
        Condition => "condition",
        TagAdd => "tag_add",
        TagRemove => "tag_remove",
        ListAdd => "list_add",
        ListRemove => "list_remove",
        Webhook => "webhook",
        Notification => "notification",
        ContactUpdate => "contact_update",
        GoalCheck => "goal_check",
        SplitTest => "split_test",
        Unsupported => "unsupported",
    }
}

/// send_email step config. Step-level subject overrides the template subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// wait step config. The delay is materialized when the predecessor
/// completes; the wait itself never dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitConfig {
    /// Exact UTC delay
    Delay { value: u32, unit: DelayUnit },
    /// Next wall-clock "HH:MM" in the workflow zone (DST-aware)
    UntilTime { time: String },
    /// Next occurrence of a weekday, optionally at "HH:MM"
    UntilDay {
        day: Weekday,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<String>,
    },
}

/// condition step config. A `None` branch means terminate as completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_branch: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_branch: Option<StepId>,
}

/// Comparison operator for custom-field predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Predicate over subscriber / contact / prior history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Predicate {
    OpenedEmail { step_id: StepId },
    ClickedLink {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<StepId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    HasTag { tag: String },
    InSegment { segment_id: String },
    CustomField { field: String, op: FieldOp, value: FieldValue },
    /// Stable per-subscriber draw: re-execution after crash recovery picks
    /// the same branch
    Random { percent: u8 },
}

/// webhook step config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// notification step config: out-of-band alert to a workflow-configured
/// operator recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub recipient: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// goal_check step config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    pub predicate: Predicate,
    /// Terminate as completed when the goal is met
    #[serde(default)]
    pub exit_on_goal: bool,
}

/// split_test step config: integer percentages summing to 100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub variants: Vec<SplitVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitVariant {
    pub name: String,
    pub percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<StepId>,
}

impl SplitConfig {
    /// Percentages must sum to exactly 100
    pub fn is_valid(&self) -> bool {
        !self.variants.is_empty()
            && self.variants.iter().map(|v| u32::from(v.percentage)).sum::<u32>() == 100
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
