// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drip: operator surface for the automation engine store.
//!
//! The engine itself is driven by the event bus and the lifecycle API; this
//! binary covers the maintenance commands an operator needs against a store
//! directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use drip_core::{SubscriberId, SystemClock, WorkflowId};
use drip_store::Store;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drip", about = "Marketing automation engine operator tools")]
struct Cli {
    /// Store directory (wal + snapshot)
    #[arg(long, default_value = ".drip")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Return expired processing leases to pending
    ReclaimExpired,
    /// Cancel all pending queue items for a workflow
    DrainWorkflow { workflow_id: String },
    /// Print a subscriber row as JSON
    DumpSubscriber { subscriber_id: String },
    /// Print workflow counters as JSON
    Stats { workflow_id: String },
    /// Write a snapshot and truncate the WAL
    Checkpoint,
    /// Print recent audit events for a workflow
    Events {
        workflow_id: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let store = Store::open(&cli.data_dir, SystemClock)
        .with_context(|| format!("opening store at {}", cli.data_dir.display()))?;

    match cli.command {
        Command::ReclaimExpired => {
            let count = store.reclaim_expired()?;
            println!("reclaimed {count} expired leases");
        }
        Command::DrainWorkflow { workflow_id } => {
            let id = WorkflowId::from_string(workflow_id);
            store.workflow(&id)?;
            let count = store.cancel_pending_for_workflow(&id)?;
            println!("cancelled {count} pending items for {id}");
        }
        Command::DumpSubscriber { subscriber_id } => {
            let subscriber = store.subscriber(&SubscriberId::from_string(subscriber_id))?;
            println!("{}", serde_json::to_string_pretty(&subscriber)?);
        }
        Command::Stats { workflow_id } => {
            let workflow = store.workflow(&WorkflowId::from_string(workflow_id))?;
            let stats = serde_json::json!({
                "workflow": workflow.id,
                "name": workflow.name,
                "status": workflow.status,
                "stats": workflow.stats,
                "steps": workflow.step_stats,
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Checkpoint => {
            store.checkpoint()?;
            println!("snapshot written, wal truncated");
        }
        Command::Events { workflow_id, limit } => {
            let events = store.audit_events(&WorkflowId::from_string(workflow_id), limit);
            for stored in events {
                println!("{} {}", stored.at.format("%Y-%m-%dT%H:%M:%S%.3fZ"), stored.event.summary());
            }
        }
    }
    Ok(())
}
