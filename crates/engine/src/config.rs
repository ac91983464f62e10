// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loaded from TOML with serde defaults.

use crate::error::EngineError;
use drip_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker tasks polling the queue
    pub workers: usize,
    /// Max items claimed per lease call
    pub lease_batch: usize,
    /// Adaptive poll backoff bounds
    pub poll_min_ms: u64,
    pub poll_max_ms: u64,
    /// Lease duration; must exceed the step timeout with headroom so a lost
    /// worker is reclaimed without racing a still-running one
    pub lease_secs: i64,
    /// Per-step wall-clock timeout for external calls
    pub step_timeout_secs: u64,
    /// Default webhook timeout (overridable per step)
    pub webhook_timeout_secs: u64,
    pub reclaim_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub retry: RetryPolicy,
    /// Base URL for open/click tracking redirects
    pub tracking_base_url: String,
    /// Base URL for unsubscribe links
    pub unsubscribe_base_url: String,
    /// Sender address when a send_email step has no `from`
    pub default_from: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            lease_batch: 16,
            poll_min_ms: 100,
            poll_max_ms: 2000,
            lease_secs: 60,
            step_timeout_secs: 30,
            webhook_timeout_secs: 10,
            reclaim_interval_secs: 30,
            sweep_interval_secs: 300,
            retry: RetryPolicy::default(),
            tracking_base_url: "https://track.invalid".to_string(),
            unsubscribe_base_url: "https://unsub.invalid".to_string(),
            default_from: "no-reply@drip.invalid".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::Config("workers must be at least 1".to_string()));
        }
        if self.poll_min_ms == 0 || self.poll_min_ms > self.poll_max_ms {
            return Err(EngineError::Config(
                "poll bounds must satisfy 0 < poll_min_ms <= poll_max_ms".to_string(),
            ));
        }
        if self.lease_secs <= 0 || (self.lease_secs as u64) < self.step_timeout_secs * 2 {
            return Err(EngineError::Config(
                "lease_secs must be at least twice step_timeout_secs".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lease_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_secs)
    }

    pub fn step_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.step_timeout_secs)
    }

    pub fn webhook_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.webhook_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
