// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band operator notifications (notification steps).
//!
//! Same failure taxonomy as webhooks: the caller classifies by what the
//! notifier reports.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("notify timed out")]
    Timeout,
    #[error("notify failed with status {0}")]
    Status(u16),
    #[error("notify network error: {0}")]
    Network(String),
}

impl NotifyError {
    pub fn is_transient(&self) -> bool {
        match self {
            NotifyError::Timeout | NotifyError::Network(_) => true,
            NotifyError::Status(code) => *code == 408 || *code == 429 || *code >= 500,
        }
    }
}

/// Adapter for sending operator alerts
#[async_trait]
pub trait Notifier: Clone + Send + Sync + 'static {
    /// Send an alert to a workflow-configured recipient
    async fn notify(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

/// Posts alerts to an ops webhook (Slack-style incoming hook)
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "recipient": recipient,
            "subject": subject,
            "text": message,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Network(e.to_string())
                }
            })?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(recipient, subject, "notification sent");
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Notifier, NotifyError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Recorded notification
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct NotifyCall {
        pub recipient: String,
        pub subject: String,
        pub message: String,
    }

    struct FakeNotifyState {
        calls: Vec<NotifyCall>,
        failures: VecDeque<NotifyError>,
    }

    /// Fake notifier for tests
    #[derive(Clone)]
    pub struct FakeNotifier {
        inner: Arc<Mutex<FakeNotifyState>>,
    }

    impl Default for FakeNotifier {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeNotifyState {
                    calls: Vec::new(),
                    failures: VecDeque::new(),
                })),
            }
        }
    }

    impl FakeNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next(&self, error: NotifyError) {
            self.inner.lock().failures.push_back(error);
        }

        pub fn calls(&self) -> Vec<NotifyCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify(
            &self,
            recipient: &str,
            subject: &str,
            message: &str,
        ) -> Result<(), NotifyError> {
            let mut state = self.inner.lock();
            if let Some(error) = state.failures.pop_front() {
                return Err(error);
            }
            state.calls.push(NotifyCall {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                message: message.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;
