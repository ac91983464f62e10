// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action queue records: time-ordered step executions with lease-based
//! dispatch.
//!
//! At most one `pending | processing` item exists per subscriber; the store
//! enforces that constraint at enqueue time.

use crate::error::StepError;
use crate::id::{QueueItemId, StepId, SubscriberId, WorkflowId};
use crate::step::StepKindTag;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Status of a queue item through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    QueueItemStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl QueueItemStatus {
    /// Pending and processing items are "live": they block further enqueues
    /// for the same subscriber
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// A scheduled step execution for one `(subscriber, step)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub workflow_id: WorkflowId,
    pub subscriber_id: SubscriberId,
    pub step_id: StepId,
    pub step_kind: StepKindTag,
    pub scheduled_for: DateTime<Utc>,
    pub status: QueueItemStatus,
    #[serde(default)]
    pub attempts: u32,
    /// Count of prior non-transient-retry attempts; part of the idempotency
    /// key so legitimate retries reuse the same key
    #[serde(default)]
    pub attempt_epoch: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Creation order, the tie-break after `scheduled_for`
    #[serde(default)]
    pub seq: u64,
}

impl QueueItem {
    pub fn new(
        workflow_id: WorkflowId,
        subscriber_id: SubscriberId,
        step_id: StepId,
        step_kind: StepKindTag,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            workflow_id,
            subscriber_id,
            step_id,
            step_kind,
            scheduled_for,
            status: QueueItemStatus::Pending,
            attempts: 0,
            attempt_epoch: 0,
            last_attempt_at: None,
            lease_owner: None,
            lease_expires_at: None,
            error: None,
            result: None,
            seq: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueItemStatus::Pending && self.scheduled_for <= now
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueItemStatus::Processing
            && self.lease_expires_at.is_some_and(|at| at < now)
    }
}

/// Retry policy for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_secs: u64,
    pub cap_secs: u64,
    /// Fractional jitter bound (0.2 = ±20%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_secs: 30, cap_secs: 3600, jitter: 0.2 }
    }
}

impl RetryPolicy {
    /// Backoff for the attempt that just failed: `base * 2^(attempts-1)`,
    /// jittered by `frac` in [-1, 1] scaled to the jitter bound, capped.
    pub fn backoff(&self, attempts: u32, frac: f64) -> Duration {
        let exp = attempts.saturating_sub(1).min(16);
        let raw = (self.base_secs as f64) * f64::from(1u32 << exp);
        let jittered = raw * (1.0 + self.jitter * frac.clamp(-1.0, 1.0));
        let capped = jittered.min(self.cap_secs as f64).max(1.0);
        Duration::seconds(capped as i64)
    }

    /// Decide what happens after a failure
    pub fn decide(
        &self,
        error: &StepError,
        attempts: u32,
        now: DateTime<Utc>,
        frac: f64,
    ) -> RetryDecision {
        if error.is_transient() && attempts < self.max_attempts {
            RetryDecision { retry_at: Some(now + self.backoff(attempts, frac)), dead: false }
        } else {
            RetryDecision { retry_at: None, dead: true }
        }
    }
}

/// Result of [`RetryPolicy::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry_at: Option<DateTime<Utc>>,
    pub dead: bool,
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
