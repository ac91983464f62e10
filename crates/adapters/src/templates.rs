// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Email template store adapter.
//!
//! Templates are owned by the campaign system; the engine only resolves
//! them. A missing referenced template is a permanent error (spec taxonomy),
//! decided by the send handler.

use async_trait::async_trait;
use drip_core::TenantId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TemplateStoreError {
    #[error("template store unavailable: {0}")]
    Unavailable(String),
}

/// A stored email template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Adapter for the template store
#[async_trait]
pub trait TemplateStore: Clone + Send + Sync + 'static {
    async fn get(
        &self,
        tenant: &TenantId,
        template_id: &str,
    ) -> Result<Option<EmailTemplate>, TemplateStoreError>;
}

/// In-memory template store for tests and embedded deployments
#[derive(Clone, Default)]
pub struct MemoryTemplateStore {
    inner: Arc<Mutex<HashMap<String, EmailTemplate>>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant: &TenantId, template_id: &str, template: EmailTemplate) {
        self.inner.lock().insert(format!("{tenant}|{template_id}"), template);
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get(
        &self,
        tenant: &TenantId,
        template_id: &str,
    ) -> Result<Option<EmailTemplate>, TemplateStoreError> {
        Ok(self.inner.lock().get(&format!("{tenant}|{template_id}")).cloned())
    }
}
