// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drip-store: durable state for the automation engine.
//!
//! Events are facts appended to a write-ahead log; all queryable state is
//! materialized from them. A zstd-compressed snapshot bounds replay time.
//! The [`Store`] façade is the single shared resource: queue leases,
//! subscriber transitions, and workflow mutations all commit through its one
//! lock, which is what gives `advance` and `lease` their atomicity.

mod snapshot;
mod state;
mod store;
mod wal;

pub use snapshot::{load_snapshot, write_snapshot};
pub use state::{Engagement, MaterializedState, MessageRef, StoredEvent};
pub use store::{CommitOutcome, LeaseOptions, Store, StoreError};
pub use wal::{Wal, WalEntry, WalError};
