// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger router: match inbound events against active workflows, apply
//! entry gates, enroll.

use crate::plan;
use crate::{Engine, EngineError};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    Clock, Contact, CurrentStep, NextAction, QueueItem, Subscriber, SubscriberId, TriggerEvent,
    Workflow, WorkflowStatus,
};
use drip_store::StoreError;
use std::collections::HashSet;

/// Result of the entry gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDecision {
    Allowed,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AlreadyActive,
    MaxEntries,
    ReentryNotAllowed,
    Cooldown,
    ExcludedTag,
    MissingRequiredTag,
    NotInSegment,
}

drip_core::simple_display! {
    DenyReason {
        AlreadyActive => "already_active",
        MaxEntries => "max_entries",
        ReentryNotAllowed => "reentry_not_allowed",
        Cooldown => "cooldown",
        ExcludedTag => "excluded_tag",
        MissingRequiredTag => "missing_required_tag",
        NotInSegment => "not_in_segment",
    }
}

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    /// Route one inbound domain event: enroll into every matching active
    /// workflow that passes its entry gates. Returns the new subscriber ids.
    pub async fn handle_trigger(
        &self,
        event: &TriggerEvent,
    ) -> Result<Vec<SubscriberId>, EngineError> {
        let candidates: Vec<Workflow> = self.store().with_state(|state| {
            state
                .workflows
                .values()
                .filter(|wf| {
                    wf.status == WorkflowStatus::Active
                        && wf.tenant == event.tenant
                        && wf.trigger.matches(event)
                })
                .cloned()
                .collect()
        });

        let mut enrolled = Vec::new();
        for workflow in candidates {
            let contact = self
                .collaborators()
                .contacts
                .get(&workflow.tenant, &event.email)
                .await?;
            match self.check_entry_conditions(&workflow, &event.email, contact.as_ref()).await? {
                EntryDecision::Allowed => {
                    if let Some(id) = self.enroll_subscriber(&workflow, &event.email, None)? {
                        enrolled.push(id);
                    }
                }
                EntryDecision::Denied(reason) => {
                    tracing::info!(
                        workflow = %workflow.id,
                        email = %event.email,
                        reason = %reason,
                        "entry denied"
                    );
                }
            }
        }
        Ok(enrolled)
    }

    /// Entry gates, evaluated in order: active-uniqueness, max entries,
    /// re-entry / cooldown, tag filters, segment filter.
    pub async fn check_entry_conditions(
        &self,
        workflow: &Workflow,
        email: &str,
        contact: Option<&Contact>,
    ) -> Result<EntryDecision, EngineError> {
        if self.store().active_subscriber(&workflow.id, email).is_some() {
            return Ok(EntryDecision::Denied(DenyReason::AlreadyActive));
        }

        let prior = self.store().entry_count(&workflow.id, email);
        let limits = &workflow.entry;
        if limits.max_entries_per_contact > 0 && prior >= limits.max_entries_per_contact {
            return Ok(EntryDecision::Denied(DenyReason::MaxEntries));
        }
        if prior > 0 {
            if !limits.allow_reentry {
                return Ok(EntryDecision::Denied(DenyReason::ReentryNotAllowed));
            }
            if limits.reentry_wait_days > 0 {
                if let Some(last) = self.store().last_entered(&workflow.id, email) {
                    let since = self.clock().now() - last;
                    if since < chrono::Duration::days(i64::from(limits.reentry_wait_days)) {
                        return Ok(EntryDecision::Denied(DenyReason::Cooldown));
                    }
                }
            }
        }

        let tags: HashSet<&String> = contact.map(|c| c.tags.iter().collect()).unwrap_or_default();
        if limits.exclude_tags.iter().any(|tag| tags.contains(tag)) {
            return Ok(EntryDecision::Denied(DenyReason::ExcludedTag));
        }
        if !limits.filter_tags.is_empty() && !limits.filter_tags.iter().any(|tag| tags.contains(tag))
        {
            return Ok(EntryDecision::Denied(DenyReason::MissingRequiredTag));
        }

        if let Some(segment_id) = &limits.filter_segment {
            let member = self
                .collaborators()
                .contacts
                .in_segment(&workflow.tenant, email, segment_id)
                .await?;
            if !member {
                return Ok(EntryDecision::Denied(DenyReason::NotInSegment));
            }
        }

        Ok(EntryDecision::Allowed)
    }

    /// Atomic enrollment: subscriber + entry-step queue item + counters +
    /// `subscriber:entered`. Races with a concurrent enrollment resolve to
    /// `None` rather than an error.
    pub fn enroll_subscriber(
        &self,
        workflow: &Workflow,
        email: &str,
        sweep_key: Option<String>,
    ) -> Result<Option<SubscriberId>, EngineError> {
        let now = self.clock().now();
        let Some(entry_step) = workflow.entry_step() else {
            tracing::warn!(workflow = %workflow.id, "enrollment into workflow with no steps");
            return Ok(None);
        };

        let planned = plan::plan_from_step(workflow, &HashSet::new(), &entry_step.id, now);
        let Some(target) = planned.target else {
            tracing::warn!(
                workflow = %workflow.id,
                reason = ?planned.exit,
                "workflow has no executable entry step"
            );
            return Ok(None);
        };

        let entry_count = self.store().entry_count(&workflow.id, email) + 1;
        let mut subscriber =
            Subscriber::new(workflow.id.clone(), workflow.tenant.clone(), email, entry_count, now);
        subscriber.history = planned.waits;
        subscriber.current_step =
            Some(CurrentStep { step_id: target.step_id.clone(), entered_at: now });
        subscriber.next_action = Some(NextAction {
            step_id: target.step_id.clone(),
            kind: target.kind,
            scheduled_for: target.scheduled_for,
        });

        let item = QueueItem::new(
            workflow.id.clone(),
            subscriber.id.clone(),
            target.step_id,
            target.kind,
            target.scheduled_for,
        );

        let id = subscriber.id.clone();
        match self.store().enroll(subscriber, item, sweep_key) {
            Ok(()) => {
                tracing::info!(workflow = %workflow.id, subscriber = %id, email, "subscriber entered");
                Ok(Some(id))
            }
            Err(StoreError::ActiveSubscriberExists { .. })
            | Err(StoreError::DuplicateEnrollment(_)) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Manual / API enrollment helper for the operator surface
    pub async fn enroll_manual(
        &self,
        workflow: &Workflow,
        email: &str,
    ) -> Result<Option<SubscriberId>, EngineError> {
        let contact = self.collaborators().contacts.get(&workflow.tenant, email).await?;
        match self.check_entry_conditions(workflow, email, contact.as_ref()).await? {
            EntryDecision::Allowed => self.enroll_subscriber(workflow, email, None),
            EntryDecision::Denied(reason) => {
                tracing::info!(workflow = %workflow.id, email, reason = %reason, "entry denied");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
