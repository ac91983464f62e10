// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound webhook client.
//!
//! The client reports transport-level failures; HTTP status classification
//! (2xx completed, 408/429/5xx transient, other 4xx permanent-but-advance)
//! is the step handler's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("webhook timed out after {0:?}")]
    Timeout(Duration),
    #[error("webhook network error: {0}")]
    Network(String),
}

/// One outbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    pub timeout: Duration,
}

/// The response status; bodies are not consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
}

/// Adapter for outbound HTTPS calls
#[async_trait]
pub trait WebhookClient: Clone + Send + Sync + 'static {
    async fn call(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError>;
}

/// reqwest-backed webhook client
#[derive(Clone, Default)]
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn call(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::POST);
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout)
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                WebhookError::Timeout(request.timeout)
            } else {
                WebhookError::Network(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        tracing::info!(url = %request.url, status, "webhook called");
        Ok(WebhookResponse { status })
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{WebhookClient, WebhookError, WebhookRequest, WebhookResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct FakeWebhookState {
        calls: Vec<WebhookRequest>,
        /// Scripted responses, consumed in order; defaults to 200
        responses: VecDeque<Result<WebhookResponse, WebhookError>>,
    }

    /// Recording webhook client for tests
    #[derive(Clone)]
    pub struct FakeWebhookClient {
        inner: Arc<Mutex<FakeWebhookState>>,
    }

    impl Default for FakeWebhookClient {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeWebhookState {
                    calls: Vec::new(),
                    responses: VecDeque::new(),
                })),
            }
        }
    }

    impl FakeWebhookClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond_with(&self, response: Result<WebhookResponse, WebhookError>) {
            self.inner.lock().responses.push_back(response);
        }

        pub fn respond_status(&self, status: u16) {
            self.respond_with(Ok(WebhookResponse { status }));
        }

        pub fn calls(&self) -> Vec<WebhookRequest> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl WebhookClient for FakeWebhookClient {
        async fn call(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
            let mut state = self.inner.lock();
            state.calls.push(request.clone());
            state
                .responses
                .pop_front()
                .unwrap_or(Ok(WebhookResponse { status: 200 }))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWebhookClient;
