// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The result of executing a step.
//!
//! Handlers never propagate errors past the executor; every execution
//! produces a [`Transition`], including failures.

use crate::error::StepError;
use crate::event::Event;
use crate::id::StepId;
use crate::subscriber::ExitReason;

/// Execution outcome for the current step
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Skipped,
    Failed(StepError),
}

/// Where the subscriber goes next
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Default successor by step order
    Linear,
    /// Branch target by stable step id
    GoTo(StepId),
    Terminate(ExitReason),
}

/// Outcome + successor + side-effect log + idempotency key
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub outcome: Outcome,
    pub next: NextStep,
    /// Audit events produced by the step (email:sent, webhook:called, ...)
    pub side_effects: Vec<Event>,
    /// Stable token passed to external collaborators so retries dedupe
    pub idempotency_key: String,
    /// Outcome payload persisted into history (chosen branch, variant, ...)
    pub detail: Option<serde_json::Value>,
}

impl Transition {
    pub fn completed(idempotency_key: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Completed,
            next: NextStep::Linear,
            side_effects: Vec::new(),
            idempotency_key: idempotency_key.into(),
            detail: None,
        }
    }

    pub fn failed(error: StepError, idempotency_key: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed(error),
            next: NextStep::Linear,
            side_effects: Vec::new(),
            idempotency_key: idempotency_key.into(),
            detail: None,
        }
    }

    pub fn terminate(reason: ExitReason, idempotency_key: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Completed,
            next: NextStep::Terminate(reason),
            side_effects: Vec::new(),
            idempotency_key: idempotency_key.into(),
            detail: None,
        }
    }

    pub fn goto(step: StepId, idempotency_key: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Completed,
            next: NextStep::GoTo(step),
            side_effects: Vec::new(),
            idempotency_key: idempotency_key.into(),
            detail: None,
        }
    }

    pub fn with_side_effect(mut self, event: Event) -> Self {
        self.side_effects.push(event);
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
