// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! contact_update handler: merge a field patch into the contact record.

use crate::executor::StepContext;
use crate::Engine;
use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::{Clock, FieldValue, StepError, Transition};
use indexmap::IndexMap;
use std::collections::HashMap;

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub(crate) async fn exec_contact_update(
        &self,
        ctx: &StepContext<'_>,
        fields: &IndexMap<String, FieldValue>,
        key: String,
    ) -> Transition {
        let patch: HashMap<String, FieldValue> =
            fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let update = tokio::time::timeout(
            self.config().step_timeout(),
            self.collaborators().contacts.update_fields(
                &ctx.workflow.tenant,
                &ctx.subscriber.email,
                &patch,
            ),
        )
        .await;
        match update {
            Ok(Ok(())) => Transition::completed(key),
            Ok(Err(error)) => Transition::failed(StepError::transient(error.to_string()), key),
            Err(_) => Transition::failed(StepError::transient("contact store timed out"), key),
        }
    }
}
