// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contact/list/segment store adapter.
//!
//! Read-only from the engine's perspective apart from tag, list, and field
//! mutations. Tag updates are set-level union/difference so concurrent
//! workflows acting on the same contact commute.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drip_core::{Contact, FieldValue, TenantId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ContactStoreError {
    #[error("contact store unavailable: {0}")]
    Unavailable(String),
}

/// Adapter for the external contact store
#[async_trait]
pub trait ContactStore: Clone + Send + Sync + 'static {
    async fn get(&self, tenant: &TenantId, email: &str)
        -> Result<Option<Contact>, ContactStoreError>;

    /// Set union then set difference; idempotent and commutative
    async fn update_tags(
        &self,
        tenant: &TenantId,
        email: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ContactStoreError>;

    async fn update_lists(
        &self,
        tenant: &TenantId,
        email: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ContactStoreError>;

    /// Merge a patch into the contact's custom fields
    async fn update_fields(
        &self,
        tenant: &TenantId,
        email: &str,
        patch: &HashMap<String, FieldValue>,
    ) -> Result<(), ContactStoreError>;

    async fn in_segment(
        &self,
        tenant: &TenantId,
        email: &str,
        segment_id: &str,
    ) -> Result<bool, ContactStoreError>;

    async fn set_unsubscribed(
        &self,
        tenant: &TenantId,
        email: &str,
    ) -> Result<(), ContactStoreError>;

    /// All contacts of a tenant; the date/inactivity sweepers' scan input
    async fn list(&self, tenant: &TenantId) -> Result<Vec<Contact>, ContactStoreError>;
}

#[derive(Default)]
struct MemoryContacts {
    /// `tenant|email` → contact
    contacts: HashMap<String, Contact>,
    /// segment id → member emails
    segments: HashMap<String, HashSet<String>>,
}

fn key(tenant: &TenantId, email: &str) -> String {
    format!("{}|{}", tenant, email.to_ascii_lowercase())
}

/// In-memory contact store: the test double, also useful as an embedded
/// store for single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryContactStore {
    inner: Arc<Mutex<MemoryContacts>>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant: &TenantId, contact: Contact) {
        let mut inner = self.inner.lock();
        inner.contacts.insert(key(tenant, &contact.email), contact);
    }

    pub fn add_to_segment(&self, segment_id: &str, email: &str) {
        let mut inner = self.inner.lock();
        inner
            .segments
            .entry(segment_id.to_string())
            .or_default()
            .insert(email.to_ascii_lowercase());
    }

    pub fn contact(&self, tenant: &TenantId, email: &str) -> Option<Contact> {
        self.inner.lock().contacts.get(&key(tenant, email)).cloned()
    }

    pub fn touch_activity(&self, tenant: &TenantId, email: &str, at: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        if let Some(contact) = inner.contacts.get_mut(&key(tenant, email)) {
            contact.last_activity_at = Some(at);
        }
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn get(
        &self,
        tenant: &TenantId,
        email: &str,
    ) -> Result<Option<Contact>, ContactStoreError> {
        Ok(self.inner.lock().contacts.get(&key(tenant, email)).cloned())
    }

    async fn update_tags(
        &self,
        tenant: &TenantId,
        email: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ContactStoreError> {
        let mut inner = self.inner.lock();
        if let Some(contact) = inner.contacts.get_mut(&key(tenant, email)) {
            for tag in add {
                contact.tags.insert(tag.clone());
            }
            for tag in remove {
                contact.tags.remove(tag);
            }
        }
        Ok(())
    }

    async fn update_lists(
        &self,
        tenant: &TenantId,
        email: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ContactStoreError> {
        let mut inner = self.inner.lock();
        if let Some(contact) = inner.contacts.get_mut(&key(tenant, email)) {
            for list in add {
                contact.lists.insert(list.clone());
            }
            for list in remove {
                contact.lists.remove(list);
            }
        }
        Ok(())
    }

    async fn update_fields(
        &self,
        tenant: &TenantId,
        email: &str,
        patch: &HashMap<String, FieldValue>,
    ) -> Result<(), ContactStoreError> {
        let mut inner = self.inner.lock();
        if let Some(contact) = inner.contacts.get_mut(&key(tenant, email)) {
            for (field, value) in patch {
                contact.custom_fields.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn in_segment(
        &self,
        tenant: &TenantId,
        email: &str,
        segment_id: &str,
    ) -> Result<bool, ContactStoreError> {
        let _ = tenant;
        Ok(self
            .inner
            .lock()
            .segments
            .get(segment_id)
            .is_some_and(|members| members.contains(&email.to_ascii_lowercase())))
    }

    async fn set_unsubscribed(
        &self,
        tenant: &TenantId,
        email: &str,
    ) -> Result<(), ContactStoreError> {
        let mut inner = self.inner.lock();
        if let Some(contact) = inner.contacts.get_mut(&key(tenant, email)) {
            contact.unsubscribed = true;
        }
        Ok(())
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<Contact>, ContactStoreError> {
        let prefix = format!("{tenant}|");
        Ok(self
            .inner
            .lock()
            .contacts
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, c)| c.clone())
            .collect())
    }
}

#[cfg(test)]
#[path = "contacts_tests.rs"]
mod tests;
