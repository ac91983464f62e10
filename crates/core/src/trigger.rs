// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger specifications and inbound domain events.
//!
//! Event-driven triggers are matched by the router against every active
//! workflow of the event's tenant. `date_based` and `no_activity` are not
//! event-driven: periodic sweepers resolve their candidates directly.

use crate::id::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enumerated trigger kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    ListSubscribe,
    TagAdded,
    EmailReceived,
    FormSubmit,
    DateBased,
    Api,
    SegmentEnter,
    LinkClicked,
    EmailOpened,
    NoActivity,
}

crate::simple_display! {
    TriggerKind {
        Manual => "manual",
        ListSubscribe => "list_subscribe",
        TagAdded => "tag_added",
        EmailReceived => "email_received",
        FormSubmit => "form_submit",
        DateBased => "date_based",
        Api => "api",
        SegmentEnter => "segment_enter",
        LinkClicked => "link_clicked",
        EmailOpened => "email_opened",
        NoActivity => "no_activity",
    }
}

/// What starts a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    Manual,
    ListSubscribe { list_id: String },
    TagAdded { tag: String },
    EmailReceived {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mailbox: Option<String>,
    },
    FormSubmit { form_id: String },
    /// Swept, not event-driven: a contact date field plus an offset
    DateBased { field: String, #[serde(default)] offset_days: i32 },
    Api,
    SegmentEnter { segment_id: String },
    LinkClicked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    EmailOpened,
    /// Swept: contacts whose last activity is exactly this many days old
    NoActivity { inactivity_days: u32 },
}

impl TriggerSpec {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerSpec::Manual => TriggerKind::Manual,
            TriggerSpec::ListSubscribe { .. } => TriggerKind::ListSubscribe,
            TriggerSpec::TagAdded { .. } => TriggerKind::TagAdded,
            TriggerSpec::EmailReceived { .. } => TriggerKind::EmailReceived,
            TriggerSpec::FormSubmit { .. } => TriggerKind::FormSubmit,
            TriggerSpec::DateBased { .. } => TriggerKind::DateBased,
            TriggerSpec::Api => TriggerKind::Api,
            TriggerSpec::SegmentEnter { .. } => TriggerKind::SegmentEnter,
            TriggerSpec::LinkClicked { .. } => TriggerKind::LinkClicked,
            TriggerSpec::EmailOpened => TriggerKind::EmailOpened,
            TriggerSpec::NoActivity { .. } => TriggerKind::NoActivity,
        }
    }

    /// Whether an inbound event activates this trigger.
    ///
    /// Swept kinds never match events; the sweeper enrolls directly.
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        if self.kind() != event.kind {
            return false;
        }
        match self {
            TriggerSpec::ListSubscribe { list_id } => event.payload_str("list_id") == Some(list_id),
            TriggerSpec::TagAdded { tag } => event.payload_str("tag") == Some(tag),
            TriggerSpec::EmailReceived { mailbox } => match mailbox {
                Some(m) => event.payload_str("mailbox") == Some(m),
                None => true,
            },
            TriggerSpec::FormSubmit { form_id } => event.payload_str("form_id") == Some(form_id),
            TriggerSpec::SegmentEnter { segment_id } => {
                event.payload_str("segment_id") == Some(segment_id)
            }
            TriggerSpec::LinkClicked { url } => match url {
                Some(u) => event.payload_str("url") == Some(u),
                None => true,
            },
            TriggerSpec::Manual | TriggerSpec::Api | TriggerSpec::EmailOpened => true,
            TriggerSpec::DateBased { .. } | TriggerSpec::NoActivity { .. } => false,
        }
    }
}

/// Inbound domain event from the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: TriggerKind,
    pub tenant: TenantId,
    pub email: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(
        kind: TriggerKind,
        tenant: impl Into<TenantId>,
        email: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            tenant: tenant.into(),
            email: email.into(),
            payload: serde_json::Value::Null,
            occurred_at,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// ESP delivery webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Complained,
}

crate::simple_display! {
    DeliveryKind {
        Delivered => "delivered",
        Opened => "opened",
        Clicked => "clicked",
        Bounced => "bounced",
        Complained => "complained",
    }
}

/// Consumed from the delivery webhook bus and resolved back to the
/// originating `(workflow, subscriber, step)` via the provider message id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub message_id: String,
    pub event: DeliveryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
