// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic per-subscriber randomness and idempotency keys.
//!
//! `random(percent)` conditions and split_test draws must repeat the same
//! choice when a step is re-executed after crash recovery, so the "random"
//! draw is a hash of `(subscriber, step)`. Idempotency keys additionally
//! fold in the attempt epoch so a fresh enrollment produces a fresh key
//! while transient retries reuse it.

use drip_core::{StepId, SubscriberId};
use sha2::{Digest, Sha256};

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Stable draw in `[0, 10000)` (basis points) for one `(subscriber, step)`
pub fn stable_draw(subscriber_id: &SubscriberId, step_id: &StepId) -> u32 {
    let digest = Sha256::digest(format!("{subscriber_id}|{step_id}").as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 10_000) as u32
}

/// `hash(subscriber || step || attempt_epoch)`: stable across transient
/// retries, fresh per enrollment (enrollments get fresh subscriber ids)
pub fn idempotency_key(subscriber_id: &SubscriberId, step_id: &StepId, attempt_epoch: u32) -> String {
    let digest = Sha256::digest(format!("{subscriber_id}|{step_id}|{attempt_epoch}").as_bytes());
    hex_encode(&digest)
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
