// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and fixtures for tests across the workspace.

use crate::contact::Contact;
use crate::id::TenantId;
use crate::schedule::{DelayUnit, SendWindow};
use crate::step::{
    ConditionConfig, Predicate, SendEmailConfig, SplitConfig, SplitVariant, Step, StepKind,
    WaitConfig,
};
use crate::throttle::Throttle;
use crate::trigger::TriggerSpec;
use crate::workflow::{EntryConditions, ExitConditions, Workflow, WorkflowStatus};
use chrono::{DateTime, TimeZone, Utc};

/// A fixed, readable baseline instant for tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().unwrap_or_default()
}

/// Workflow fixture builder with test defaults
pub struct WorkflowBuilder {
    tenant: TenantId,
    name: String,
    status: WorkflowStatus,
    trigger: TriggerSpec,
    entry: EntryConditions,
    exit: ExitConditions,
    send_window: Option<SendWindow>,
    throttle: Throttle,
    timezone: String,
    steps: Vec<Step>,
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self {
            tenant: TenantId::new("acme"),
            name: "test-workflow".to_string(),
            status: WorkflowStatus::Active,
            trigger: TriggerSpec::Manual,
            entry: EntryConditions::default(),
            exit: ExitConditions::default(),
            send_window: None,
            throttle: Throttle::default(),
            timezone: "UTC".to_string(),
            steps: Vec::new(),
        }
    }
}

impl WorkflowBuilder {
    pub fn tenant(mut self, v: impl Into<TenantId>) -> Self {
        self.tenant = v.into();
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = v.into();
        self
    }

    pub fn status(mut self, v: WorkflowStatus) -> Self {
        self.status = v;
        self
    }

    pub fn trigger(mut self, v: TriggerSpec) -> Self {
        self.trigger = v;
        self
    }

    pub fn entry_conditions(mut self, v: EntryConditions) -> Self {
        self.entry = v;
        self
    }

    pub fn exit_conditions(mut self, v: ExitConditions) -> Self {
        self.exit = v;
        self
    }

    pub fn send_window(mut self, v: SendWindow) -> Self {
        self.send_window = Some(v);
        self
    }

    pub fn throttle(mut self, v: Throttle) -> Self {
        self.throttle = v;
        self
    }

    pub fn timezone(mut self, v: impl Into<String>) -> Self {
        self.timezone = v.into();
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn build(self) -> Workflow {
        let mut wf = Workflow::new(self.tenant, self.name, self.trigger, t0());
        wf.status = self.status;
        wf.entry = self.entry;
        wf.exit = self.exit;
        wf.send_window = self.send_window;
        wf.throttle = self.throttle;
        wf.timezone = self.timezone;
        wf.steps = self.steps;
        if wf.status == WorkflowStatus::Active {
            wf.activated_at = Some(t0());
        }
        wf
    }
}

impl Workflow {
    /// Create a builder with test defaults
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }
}

/// send_email step with inline subject/body
pub fn email_step(id: &str, order: u32, subject: &str) -> Step {
    Step::new(
        id,
        order,
        StepKind::SendEmail(SendEmailConfig {
            template_id: None,
            subject: Some(subject.to_string()),
            html: Some(format!("<html><body><p>{subject}</p></body></html>")),
            text: Some(subject.to_string()),
            from: Some("hello@acme.test".to_string()),
        }),
    )
}

/// wait step with an exact delay
pub fn wait_step(id: &str, order: u32, value: u32, unit: DelayUnit) -> Step {
    Step::new(id, order, StepKind::Wait(WaitConfig::Delay { value, unit }))
}

/// condition step over a predicate
pub fn condition_step(
    id: &str,
    order: u32,
    predicate: Predicate,
    true_branch: Option<&str>,
    false_branch: Option<&str>,
) -> Step {
    Step::new(
        id,
        order,
        StepKind::Condition(ConditionConfig {
            predicate,
            true_branch: true_branch.map(Into::into),
            false_branch: false_branch.map(Into::into),
        }),
    )
}

/// split_test step over (name, percentage, target) variants
pub fn split_step(id: &str, order: u32, variants: &[(&str, u8, Option<&str>)]) -> Step {
    Step::new(
        id,
        order,
        StepKind::SplitTest(SplitConfig {
            variants: variants
                .iter()
                .map(|(name, pct, next)| SplitVariant {
                    name: (*name).to_string(),
                    percentage: *pct,
                    next_step_id: next.map(Into::into),
                })
                .collect(),
        }),
    )
}

/// Contact fixture builder
pub struct ContactBuilder {
    contact: Contact,
}

impl ContactBuilder {
    pub fn new(email: &str) -> Self {
        let mut contact = Contact::new(email);
        contact.name = "Test Person".to_string();
        contact.first_name = "Test".to_string();
        Self { contact }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.contact.tags.insert(tag.to_string());
        self
    }

    pub fn list(mut self, list: &str) -> Self {
        self.contact.lists.insert(list.to_string());
        self
    }

    pub fn field(mut self, key: &str, value: crate::contact::FieldValue) -> Self {
        self.contact.custom_fields.insert(key.to_string(), value);
        self
    }

    pub fn last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.contact.last_activity_at = Some(at);
        self
    }

    pub fn build(self) -> Contact {
        self.contact
    }
}
