// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definition and lifecycle status.

use crate::id::{StepId, TenantId, WorkflowId};
use crate::schedule::SendWindow;
use crate::step::Step;
use crate::throttle::Throttle;
use crate::trigger::TriggerSpec;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workflow lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

crate::simple_display! {
    WorkflowStatus {
        Draft => "draft",
        Active => "active",
        Paused => "paused",
        Completed => "completed",
        Archived => "archived",
    }
}

/// Entry gates evaluated by the trigger router before enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConditions {
    /// Prior-enrollment cap per contact; 0 = unlimited
    #[serde(default)]
    pub max_entries_per_contact: u32,
    #[serde(default = "default_true")]
    pub allow_reentry: bool,
    /// Minimum days between enrollments of the same contact
    #[serde(default)]
    pub reentry_wait_days: u32,
    /// At least one must match when non-empty
    #[serde(default)]
    pub filter_tags: Vec<String>,
    /// Any match denies entry
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_segment: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for EntryConditions {
    fn default() -> Self {
        Self {
            max_entries_per_contact: 0,
            allow_reentry: true,
            reentry_wait_days: 0,
            filter_tags: Vec::new(),
            exclude_tags: Vec::new(),
            filter_segment: None,
        }
    }
}

/// Exit gates evaluated before each step dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitConditions {
    /// Contact acquiring this tag exits as completed with `goal:reached`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_tag: Option<String>,
    #[serde(default)]
    pub exit_on_unsubscribe: bool,
}

/// Denormalized workflow counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub total_entered: u64,
    pub currently_active: u64,
    pub completed: u64,
    pub goal_reached: u64,
    pub exited: u64,
    pub emails_sent: u64,
    pub emails_opened: u64,
    pub emails_clicked: u64,
    pub unsubscribed: u64,
}

/// Denormalized per-step counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    pub entered: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A workflow definition owned by a tenant.
///
/// Editable only in `draft | paused`; archived workflows are retained for
/// history while subscribers exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub tenant: TenantId,
    pub name: String,
    pub status: WorkflowStatus,
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub entry: EntryConditions,
    #[serde(default)]
    pub exit: ExitConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_window: Option<SendWindow>,
    #[serde(default)]
    pub throttle: Throttle,
    /// IANA zone name for send windows and wall-clock waits
    #[serde(default = "default_zone")]
    pub timezone: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub stats: WorkflowStats,
    #[serde(default)]
    pub step_stats: HashMap<StepId, StepStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_zone() -> String {
    "UTC".to_string()
}

impl Workflow {
    pub fn new(
        tenant: impl Into<TenantId>,
        name: impl Into<String>,
        trigger: TriggerSpec,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkflowId::new(),
            tenant: tenant.into(),
            name: name.into(),
            status: WorkflowStatus::Draft,
            trigger,
            entry: EntryConditions::default(),
            exit: ExitConditions::default(),
            send_window: None,
            throttle: Throttle::default(),
            timezone: default_zone(),
            steps: Vec::new(),
            stats: WorkflowStats::default(),
            step_stats: HashMap::new(),
            activated_at: None,
            created_at,
        }
    }

    /// Look up a step by its stable ID
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == *id)
    }

    /// The entry step: the explicitly marked one, else the lowest order
    pub fn entry_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.entry)
            .or_else(|| self.steps.iter().min_by_key(|s| s.order))
    }

    /// Default linear successor: the step with the next-higher order
    pub fn step_after(&self, id: &StepId) -> Option<&Step> {
        let current = self.step(id)?;
        self.steps
            .iter()
            .filter(|s| s.order > current.order)
            .min_by_key(|s| s.order)
    }

    /// Workflows may be edited only in draft or paused
    pub fn is_editable(&self) -> bool {
        matches!(self.status, WorkflowStatus::Draft | WorkflowStatus::Paused)
    }

    /// Parsed timezone, falling back to UTC for unknown names
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn step_stats_mut(&mut self, id: &StepId) -> &mut StepStats {
        self.step_stats.entry(id.clone()).or_default()
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
