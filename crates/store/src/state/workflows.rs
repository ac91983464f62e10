// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow lifecycle event handlers.

use super::MaterializedState;
use chrono::{DateTime, Utc};
use drip_core::{Event, WorkflowStatus};

pub(crate) fn apply(state: &mut MaterializedState, at: DateTime<Utc>, event: &Event) {
    match event {
        Event::WorkflowCreated { workflow } => {
            // Idempotency: creation never overwrites later state
            if !state.workflows.contains_key(&workflow.id) {
                state.workflows.insert(workflow.id.clone(), (**workflow).clone());
            }
        }

        Event::WorkflowUpdated { workflow } => {
            state.workflows.insert(workflow.id.clone(), (**workflow).clone());
        }

        Event::WorkflowActivated { id } => {
            if let Some(wf) = state.workflows.get_mut(id) {
                wf.status = WorkflowStatus::Active;
                if wf.activated_at.is_none() {
                    wf.activated_at = Some(at);
                }
            }
        }

        Event::WorkflowPaused { id } => {
            if let Some(wf) = state.workflows.get_mut(id) {
                wf.status = WorkflowStatus::Paused;
            }
        }

        Event::WorkflowResumed { id } => {
            if let Some(wf) = state.workflows.get_mut(id) {
                wf.status = WorkflowStatus::Active;
            }
        }

        Event::WorkflowCompleted { id } => {
            if let Some(wf) = state.workflows.get_mut(id) {
                wf.status = WorkflowStatus::Completed;
            }
        }

        Event::WorkflowArchived { id } => {
            if let Some(wf) = state.workflows.get_mut(id) {
                wf.status = WorkflowStatus::Archived;
            }
        }

        _ => {}
    }
}
