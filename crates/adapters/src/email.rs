// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional email transport.
//!
//! The engine provides at-least-once invocation; the idempotency key lets
//! the provider dedupe retried sends. Failure classification follows the
//! engine taxonomy: timeouts, 5xx, and rate limits are transient; invalid
//! addresses and synchronous hard bounces are permanent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the email transport, pre-classified for retry
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("transient transport error: {0}")]
    Transient(String),
    #[error("permanent transport error: {0}")]
    Permanent(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub idempotency_key: String,
}

/// Provider acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Adapter for the transactional email provider
#[async_trait]
pub trait EmailTransport: Clone + Send + Sync + 'static {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, TransportError>;
}

/// HTTP ESP client: POSTs the message as JSON, idempotency key in a header.
#[derive(Clone)]
pub struct HttpEmailTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpEmailTransport {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", &message.idempotency_key)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    TransportError::Transient(e.to_string())
                } else {
                    TransportError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let receipt: SendReceipt = response
                .json()
                .await
                .map_err(|e| TransportError::Transient(format!("bad provider response: {e}")))?;
            tracing::info!(to = %message.to, message_id = %receipt.message_id, "email accepted");
            return Ok(receipt);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        if code == 408 || code == 429 || status.is_server_error() {
            Err(TransportError::Transient(format!("provider {code}: {body}")))
        } else {
            Err(TransportError::Permanent(format!("provider {code}: {body}")))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{EmailMessage, EmailTransport, SendReceipt, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct FakeEmailState {
        /// Messages actually delivered (deduped by idempotency key)
        deliveries: Vec<EmailMessage>,
        /// idempotency key → message id handed out for it
        by_key: HashMap<String, String>,
        /// Scripted failures, consumed before any delivery
        failures: VecDeque<TransportError>,
        counter: u64,
    }

    /// Fake transport modelling provider-side idempotency: a retried send
    /// with a seen key returns the original message id without a second
    /// delivery.
    #[derive(Clone)]
    pub struct FakeEmailTransport {
        inner: Arc<Mutex<FakeEmailState>>,
    }

    impl Default for FakeEmailTransport {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeEmailState {
                    deliveries: Vec::new(),
                    by_key: HashMap::new(),
                    failures: VecDeque::new(),
                    counter: 0,
                })),
            }
        }
    }

    impl FakeEmailTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an error for the next send attempt
        pub fn fail_next(&self, error: TransportError) {
            self.inner.lock().failures.push_back(error);
        }

        /// Messages the provider would actually deliver
        pub fn deliveries(&self) -> Vec<EmailMessage> {
            self.inner.lock().deliveries.clone()
        }

        pub fn delivery_count(&self) -> usize {
            self.inner.lock().deliveries.len()
        }
    }

    #[async_trait]
    impl EmailTransport for FakeEmailTransport {
        async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, TransportError> {
            let mut state = self.inner.lock();
            if let Some(error) = state.failures.pop_front() {
                return Err(error);
            }
            if let Some(existing) = state.by_key.get(&message.idempotency_key) {
                return Ok(SendReceipt { message_id: existing.clone() });
            }
            state.counter += 1;
            let message_id = format!("msg-{}", state.counter);
            state.by_key.insert(message.idempotency_key.clone(), message_id.clone());
            state.deliveries.push(message.clone());
            Ok(SendReceipt { message_id })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEmailTransport;
