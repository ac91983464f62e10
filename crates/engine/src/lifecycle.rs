// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow lifecycle controller: activate, pause, resume, archive.
//!
//! Pause cancels pending queue items but leaves subscribers active with
//! `next_action` intact; resume re-enqueues from those pointers with the
//! original due times. Archive additionally force-terminates every active
//! subscriber.

use crate::{Engine, EngineError};
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{
    parse_zone, Clock, Event, ExitReason, QueueItem, StepKind, SubscriberStatus, Workflow,
    WorkflowId, WorkflowStatus,
};

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    /// Register a new workflow definition (status `draft`)
    pub fn create_workflow(&self, workflow: Workflow) -> Result<WorkflowId, EngineError> {
        let id = workflow.id.clone();
        self.store().insert_workflow(workflow)?;
        Ok(id)
    }

    /// Validate and activate. After activation the trigger router includes
    /// the workflow.
    pub fn activate(&self, id: &WorkflowId) -> Result<(), EngineError> {
        let workflow = self.store().workflow(id)?;
        validate_definition(&workflow)?;
        self.store().commit(&[Event::WorkflowActivated { id: id.clone() }])?;
        tracing::info!(workflow = %id, "workflow activated");
        Ok(())
    }

    /// Pause: cancel pending items; in-flight items finish and their
    /// advances commit, but successors are not enqueued until resume.
    pub fn pause(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.store().workflow(id)?;
        self.store().commit(&[Event::WorkflowPaused { id: id.clone() }])?;
        let cancelled = self.store().cancel_pending_for_workflow(id)?;
        tracing::info!(workflow = %id, cancelled, "workflow paused");
        Ok(())
    }

    /// Resume: re-enqueue every active subscriber's next action. Past-due
    /// actions fire on the next worker tick.
    pub fn resume(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.store().workflow(id)?;
        self.store().commit(&[Event::WorkflowResumed { id: id.clone() }])?;
        let mut requeued = 0;
        for subscriber in self.store().subscribers_for_workflow(id) {
            if subscriber.status != SubscriberStatus::Active {
                continue;
            }
            let Some(next_action) = &subscriber.next_action else {
                continue;
            };
            if self.store().live_item_for(&subscriber.id).is_some() {
                continue;
            }
            let item = QueueItem::new(
                id.clone(),
                subscriber.id.clone(),
                next_action.step_id.clone(),
                next_action.kind,
                next_action.scheduled_for,
            );
            self.store().enqueue(item)?;
            requeued += 1;
        }
        tracing::info!(workflow = %id, requeued, "workflow resumed");
        Ok(())
    }

    /// Archive: pause fan-out plus forced termination of every active
    /// subscriber. The workflow record is retained for history.
    pub fn archive(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.store().workflow(id)?;
        let cancelled = self.store().cancel_pending_for_workflow(id)?;
        let mut terminated = 0;
        for subscriber in self.store().subscribers_for_workflow(id) {
            if subscriber.status.is_terminal() {
                continue;
            }
            let mut events = Vec::new();
            if let Some(live) = self.store().live_item_for(&subscriber.id) {
                events.push(Event::QueueCancelled { id: live.id });
            }
            events.push(Event::SubscriberExited {
                id: subscriber.id.clone(),
                workflow_id: id.clone(),
                status: ExitReason::AutomationArchived.terminal_status(),
                reason: ExitReason::AutomationArchived,
            });
            self.store().commit(&events)?;
            terminated += 1;
        }
        self.store().commit(&[Event::WorkflowArchived { id: id.clone() }])?;
        tracing::info!(workflow = %id, cancelled, terminated, "workflow archived");
        Ok(())
    }

    /// Mark a finished campaign completed (no cancellation fan-out)
    pub fn complete(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.store().workflow(id)?;
        self.store().commit(&[Event::WorkflowCompleted { id: id.clone() }])?;
        Ok(())
    }
}

/// Activation-time definition checks: non-empty steps, resolvable entry
/// step, parseable timezone, valid splits, sane send window.
fn validate_definition(workflow: &Workflow) -> Result<(), EngineError> {
    if workflow.steps.is_empty() {
        return Err(EngineError::Validation("workflow has no steps".to_string()));
    }
    if workflow.entry_step().is_none() {
        return Err(EngineError::Validation("workflow has no entry step".to_string()));
    }
    parse_zone(&workflow.timezone)
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    if let Some(window) = &workflow.send_window {
        if window.start_hour >= window.end_hour || window.end_hour > 24 {
            return Err(EngineError::Validation(format!(
                "invalid send window {}..{}",
                window.start_hour, window.end_hour
            )));
        }
    }
    for step in &workflow.steps {
        if let StepKind::SplitTest(config) = &step.kind {
            if !config.is_valid() {
                return Err(EngineError::Validation(format!(
                    "split_test step {} percentages must sum to 100",
                    step.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
