// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step failure taxonomy.
//!
//! Transient failures (network timeouts, 5xx, rate limits, store contention)
//! are retried with backoff; permanent failures (invalid address, malformed
//! template, missing referenced template) are not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry classification for a step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transient,
    Permanent,
}

crate::simple_display! {
    ErrorKind {
        Transient => "transient",
        Permanent => "permanent",
    }
}

/// A classified step execution failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transient, message: message.into() }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Permanent, message: message.into() }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}
