// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drip-engine: the automation engine core.
//!
//! Composition: the trigger router enrolls subscribers and enqueues their
//! entry step; workers lease due queue items, execute the step against the
//! external collaborators, and commit the resulting transition; the
//! lifecycle controller fans pause/archive out to the queue and the live
//! subscribers.

#[cfg(test)]
pub(crate) mod test_helpers;

mod config;
mod delivery;
mod error;
mod executor;
mod lifecycle;
mod plan;
mod router;
mod seed;
mod steps;
mod sweeper;
mod template;
mod tracking;
mod worker;

pub use config::EngineConfig;
pub use error::EngineError;
pub use executor::StepContext;
pub use router::{DenyReason, EntryDecision};
pub use tracking::{decode_token, instrument_html, TrackingContext};

use drip_adapters::{ContactStore, EmailTransport, Notifier, TemplateStore, WebhookClient};
use drip_core::Clock;
use drip_store::Store;

/// The external collaborators the engine calls through narrow interfaces
#[derive(Clone)]
pub struct Collaborators<E, K, W, N, T> {
    pub email: E,
    pub contacts: K,
    pub webhooks: W,
    pub notifier: N,
    pub templates: T,
}

/// The engine: store + collaborators + config + clock.
///
/// Cheap to clone; every worker task holds its own handle.
pub struct Engine<E, K, W, N, T, C: Clock> {
    store: Store<C>,
    collaborators: Collaborators<E, K, W, N, T>,
    config: EngineConfig,
    clock: C,
}

impl<E, K, W, N, T, C> Clone for Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collaborators: self.collaborators.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<E, K, W, N, T, C> Engine<E, K, W, N, T, C>
where
    E: EmailTransport,
    K: ContactStore,
    W: WebhookClient,
    N: Notifier,
    T: TemplateStore,
    C: Clock,
{
    pub fn new(
        store: Store<C>,
        collaborators: Collaborators<E, K, W, N, T>,
        config: EngineConfig,
        clock: C,
    ) -> Self {
        Self { store, collaborators, config, clock }
    }

    pub fn store(&self) -> &Store<C> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }
}
