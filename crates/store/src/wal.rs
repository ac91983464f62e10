// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of engine events.
//!
//! One JSON object per line, sequence-numbered. On open, entries past the
//! caller's `processed_seq` (typically the snapshot watermark) are queued for
//! replay; a torn trailing line from a crash mid-write is tolerated and
//! dropped.

use chrono::{DateTime, Utc};
use drip_core::Event;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wal serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One committed event with its sequence number and commit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: Event,
}

/// Sequential event log backing the materialized state
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Entries with `seq > processed_seq`, awaiting replay
    pending: VecDeque<WalEntry>,
    write_seq: u64,
    processed_seq: u64,
}

impl Wal {
    /// Open (or create) the log, queueing entries past `processed_seq` for
    /// replay.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let mut pending = VecDeque::new();
        let mut write_seq = processed_seq;

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: WalEntry = match serde_json::from_str(&line) {
                    Ok(entry) => entry,
                    Err(err) => {
                        // Torn tail from a crash mid-write; everything before
                        // it is intact
                        tracing::warn!(error = %err, "dropping unparseable wal tail");
                        break;
                    }
                };
                write_seq = write_seq.max(entry.seq);
                if entry.seq > processed_seq {
                    pending.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            pending,
            write_seq,
            processed_seq,
        })
    }

    /// Append an event; returns its sequence number. Call [`Wal::flush`]
    /// before treating the write as durable.
    pub fn append(&mut self, event: &Event, at: DateTime<Utc>) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, at, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.write_seq = seq;
        self.pending.push_back(entry);
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Next entry not yet marked processed, if any
    pub fn next_unprocessed(&mut self) -> Option<WalEntry> {
        while let Some(front) = self.pending.front() {
            if front.seq <= self.processed_seq {
                self.pending.pop_front();
                continue;
            }
            return self.pending.pop_front();
        }
        None
    }

    /// Advance the processed watermark and drop drained entries
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
        while self
            .pending
            .front()
            .is_some_and(|entry| entry.seq <= self.processed_seq)
        {
            self.pending.pop_front();
        }
    }

    /// Drop the on-disk log after a snapshot has captured everything up to
    /// the processed watermark. Sequence numbers keep increasing.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.writer = BufWriter::new(File::create(&self.path)?);
        self.pending.clear();
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
