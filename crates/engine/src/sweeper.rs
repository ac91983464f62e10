// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Date-based and inactivity trigger sweepers.
//!
//! These trigger kinds are not event-driven: a periodic sweep scans contacts
//! whose date-field crossing (or inactivity threshold) falls on the current
//! local day and enrolls them directly. The dedupe key
//! `hash(workflow, contact, anchor_date)` makes sweep retries harmless.

use crate::{seed, Engine, EngineError, EntryDecision};
use chrono::{Datelike, Duration, NaiveDate};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, Contact, TriggerSpec, Workflow, WorkflowStatus};
use sha2::{Digest, Sha256};

fn sweep_key(workflow: &Workflow, email: &str, anchor: NaiveDate) -> String {
    let digest = Sha256::digest(
        format!("{}|{}|{anchor}", workflow.id, email.to_ascii_lowercase()).as_bytes(),
    );
    seed::hex_encode(&digest)
}

/// The date a date-based trigger fires for a given field value.
///
/// A zero offset is an anniversary match (birthday-style: month/day in the
/// current year); a non-zero offset is absolute (`signup_date + N days`).
fn trigger_date(field_value: NaiveDate, offset_days: i32, today: NaiveDate) -> NaiveDate {
    if offset_days == 0 {
        field_value.with_year(today.year()).unwrap_or(field_value)
    } else {
        field_value + Duration::days(i64::from(offset_days))
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
    /// Run both sweeps; returns the number of new enrollments
    pub async fn run_sweeps(&self) -> Result<usize, EngineError> {
        Ok(self.run_date_sweep().await? + self.run_inactivity_sweep().await?)
    }

    fn swept_workflows(&self, pick: impl Fn(&TriggerSpec) -> bool) -> Vec<Workflow> {
        self.store().with_state(|state| {
            state
                .workflows
                .values()
                .filter(|wf| wf.status == WorkflowStatus::Active && pick(&wf.trigger))
                .cloned()
                .collect()
        })
    }

    async fn sweep_contact(
        &self,
        workflow: &Workflow,
        contact: &Contact,
        anchor: NaiveDate,
    ) -> Result<bool, EngineError> {
        let key = sweep_key(workflow, &contact.email, anchor);
        if self.store().sweep_key_seen(&key) {
            return Ok(false);
        }
        match self.check_entry_conditions(workflow, &contact.email, Some(contact)).await? {
            EntryDecision::Allowed => Ok(self
                .enroll_subscriber(workflow, &contact.email, Some(key))?
                .is_some()),
            EntryDecision::Denied(reason) => {
                tracing::debug!(
                    workflow = %workflow.id,
                    email = %contact.email,
                    reason = %reason,
                    "sweep entry denied"
                );
                Ok(false)
            }
        }
    }

    /// Enroll contacts whose date-field crossing falls on the current local
    /// day
    pub async fn run_date_sweep(&self) -> Result<usize, EngineError> {
        let mut enrolled = 0;
        for workflow in self.swept_workflows(|t| matches!(t, TriggerSpec::DateBased { .. })) {
            let TriggerSpec::DateBased { field, offset_days } = &workflow.trigger else {
                continue;
            };
            let today = self.clock().now().with_timezone(&workflow.tz()).date_naive();
            let contacts = self.collaborators().contacts.list(&workflow.tenant).await?;
            for contact in contacts {
                let Some(value) = contact.date_field(field) else {
                    continue;
                };
                if trigger_date(value, *offset_days, today) != today {
                    continue;
                }
                if self.sweep_contact(&workflow, &contact, today).await? {
                    enrolled += 1;
                }
            }
        }
        Ok(enrolled)
    }

    /// Enroll contacts whose last activity is exactly `inactivity_days` old
    pub async fn run_inactivity_sweep(&self) -> Result<usize, EngineError> {
        let mut enrolled = 0;
        for workflow in self.swept_workflows(|t| matches!(t, TriggerSpec::NoActivity { .. })) {
            let TriggerSpec::NoActivity { inactivity_days } = &workflow.trigger else {
                continue;
            };
            let zone = workflow.tz();
            let today = self.clock().now().with_timezone(&zone).date_naive();
            let threshold = today - Duration::days(i64::from(*inactivity_days));
            let contacts = self.collaborators().contacts.list(&workflow.tenant).await?;
            for contact in contacts {
                let Some(last_activity) = contact.last_activity_at else {
                    continue;
                };
                if last_activity.with_timezone(&zone).date_naive() != threshold {
                    continue;
                }
                if self.sweep_contact(&workflow, &contact, threshold).await? {
                    enrolled += 1;
                }
            }
        }
        Ok(enrolled)
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
