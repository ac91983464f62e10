// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zstd-compressed state snapshots.
//!
//! A snapshot captures the materialized state and the WAL watermark it
//! covers; replay resumes from `processed_seq`. Written atomically via a
//! temp file + rename.

use crate::state::MaterializedState;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    processed_seq: u64,
    state: MaterializedState,
}

/// Write a snapshot covering everything up to `processed_seq`
pub fn write_snapshot(
    path: impl AsRef<Path>,
    state: &MaterializedState,
    processed_seq: u64,
) -> Result<(), StoreError> {
    let path = path.as_ref();
    let file = SnapshotFile {
        version: SNAPSHOT_VERSION,
        processed_seq,
        state: state.clone(),
    };
    let json = serde_json::to_vec(&file)?;
    let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)
        .map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let tmp = path.with_extension("snapshot.tmp");
    std::fs::write(&tmp, &compressed)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the snapshot if one exists; returns `(state, processed_seq)`.
///
/// Indexes are rebuilt by the caller after WAL replay completes.
pub fn load_snapshot(
    path: impl AsRef<Path>,
) -> Result<Option<(MaterializedState, u64)>, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let compressed = std::fs::read(path)?;
    let json =
        zstd::decode_all(compressed.as_slice()).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let file: SnapshotFile = serde_json::from_slice(&json)?;
    if file.version != SNAPSHOT_VERSION {
        return Err(StoreError::Snapshot(format!(
            "unsupported snapshot version {}",
            file.version
        )));
    }
    Ok(Some((file.state, file.processed_seq)))
}
