// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contact read-model.
//!
//! The contact/list/segment store is an external collaborator; the engine
//! reads contacts through [`Contact`] and mutates only tags, lists, and
//! custom fields through the adapter. Custom fields are a typed map with
//! explicit serialization rather than an open-ended document.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Typed custom-field value: scalar or list of strings.
///
/// Untagged: JSON natives map to `Bool`/`Int`/`Float`, `YYYY-MM-DD` strings
/// to `Date`, any other string to `Str`, arrays to `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Str(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Render as merge-tag replacement text
    pub fn render(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Date(d) => d.to_string(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// Substring / membership containment
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            FieldValue::Str(s) => s.contains(needle),
            FieldValue::List(items) => items.iter().any(|i| i == needle),
            other => other.render().contains(needle),
        }
    }
}

/// A contact as seen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub lists: BTreeSet<String>,
    #[serde(default)]
    pub custom_fields: IndexMap<String, FieldValue>,
    #[serde(default)]
    pub unsubscribed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: String::new(),
            first_name: String::new(),
            tags: BTreeSet::new(),
            lists: BTreeSet::new(),
            custom_fields: IndexMap::new(),
            unsubscribed: false,
            last_activity_at: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn date_field(&self, field: &str) -> Option<NaiveDate> {
        self.custom_fields.get(field).and_then(FieldValue::as_date)
    }

    /// Flatten into merge-tag variables: built-ins plus custom fields.
    pub fn merge_vars(&self, unsubscribe_url: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("email".to_string(), self.email.clone());
        vars.insert("name".to_string(), self.name.clone());
        vars.insert("first_name".to_string(), self.first_name.clone());
        vars.insert("unsubscribe_url".to_string(), unsubscribe_url.to_string());
        for (key, value) in &self.custom_fields {
            vars.insert(key.clone(), value.render());
        }
        vars
    }
}

#[cfg(test)]
#[path = "contact_tests.rs"]
mod tests;
