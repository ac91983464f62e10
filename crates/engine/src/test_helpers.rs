// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for engine tests: a full engine wired to fakes.

use crate::{Collaborators, Engine, EngineConfig};
use drip_adapters::{
    FakeEmailTransport, FakeNotifier, FakeWebhookClient, MemoryContactStore, MemoryTemplateStore,
};
use drip_core::test_support::t0;
use drip_core::{Contact, FakeClock, Workflow};
use drip_store::Store;

pub(crate) type TestEngine = Engine<
    FakeEmailTransport,
    MemoryContactStore,
    FakeWebhookClient,
    FakeNotifier,
    MemoryTemplateStore,
    FakeClock,
>;

pub(crate) struct TestContext {
    pub engine: TestEngine,
    pub clock: FakeClock,
    pub email: FakeEmailTransport,
    pub contacts: MemoryContactStore,
    pub webhooks: FakeWebhookClient,
    pub notifier: FakeNotifier,
    pub templates: MemoryTemplateStore,
    _dir: tempfile::TempDir,
}

pub(crate) fn setup() -> TestContext {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let clock = FakeClock::at(t0());
    let store = Store::open(dir.path(), clock.clone()).unwrap_or_else(|e| panic!("open: {e}"));
    let email = FakeEmailTransport::new();
    let contacts = MemoryContactStore::new();
    let webhooks = FakeWebhookClient::new();
    let notifier = FakeNotifier::new();
    let templates = MemoryTemplateStore::new();
    let engine = Engine::new(
        store,
        Collaborators {
            email: email.clone(),
            contacts: contacts.clone(),
            webhooks: webhooks.clone(),
            notifier: notifier.clone(),
            templates: templates.clone(),
        },
        EngineConfig::default(),
        clock.clone(),
    );
    TestContext { engine, clock, email, contacts, webhooks, notifier, templates, _dir: dir }
}

impl TestContext {
    /// Register a workflow (already in its builder-given status)
    pub fn add_workflow(&self, workflow: &Workflow) {
        self.engine
            .store()
            .insert_workflow(workflow.clone())
            .unwrap_or_else(|e| panic!("insert workflow: {e}"));
    }

    pub fn seed_contact(&self, workflow: &Workflow, contact: Contact) {
        self.contacts.insert(&workflow.tenant, contact);
    }

    /// Process queue items until a poll comes back empty
    pub async fn drain(&self) -> usize {
        let mut total = 0;
        loop {
            let processed = self
                .engine
                .run_once("test-worker")
                .await
                .unwrap_or_else(|e| panic!("run_once: {e}"));
            if processed == 0 {
                return total;
            }
            total += processed;
        }
    }
}
