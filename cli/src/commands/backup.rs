// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Snapshot commands
//!
//! Commands: create, list, prune, restore

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use obstack_core::domain::backup::RetentionPolicy;

use crate::context::StackContext;
use crate::output;

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Take a snapshot now, then apply retention
    Create {
        /// Skip retention pruning afterwards
        #[arg(long)]
        no_prune: bool,
    },

    /// List snapshots, newest first
    List,

    /// Remove snapshots outside the retention policy
    Prune {
        /// Remove snapshots older than N days (overrides config)
        #[arg(long, conflicts_with = "keep")]
        days: Option<u32>,

        /// Keep only the N newest snapshots (overrides config)
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Restore a complete snapshot into the stack
    Restore {
        /// Snapshot id (YYYYMMDD_HHMMSS)
        id: String,
    },
}

pub async fn handle_command(command: BackupCommand, config_path: Option<PathBuf>) -> Result<()> {
    let ctx = StackContext::load(config_path)?;
    match command {
        BackupCommand::Create { no_prune } => create(&ctx, no_prune).await,
        BackupCommand::List => list(&ctx),
        BackupCommand::Prune { days, keep } => prune(&ctx, days, keep),
        BackupCommand::Restore { id } => restore(&ctx, &id).await,
    }
}

async fn create(ctx: &StackContext, no_prune: bool) -> Result<()> {
    ctx.require_stack()?;
    let backups = ctx.backups();
    let now = Utc::now();

    let sp = output::spinner("Creating snapshot...");
    let snapshot = match backups.create_snapshot(now).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            output::finish_err(&sp, "Snapshot failed; the partial directory was kept");
            return Err(e.into());
        }
    };
    output::finish_ok(&sp, &format!("Snapshot {}", snapshot.timestamp_id));
    println!("  Location: {}", snapshot.root_path.display());
    for artifact in &snapshot.included_artifacts {
        println!("  artifact  {}", artifact.display());
    }
    for (service, location) in &snapshot.per_service_exports {
        println!("  export    {} → {}", service, location);
    }

    if !no_prune {
        let removed = backups.prune_old_snapshots(backups.retention(), now, Some(&snapshot.timestamp_id));
        println!("Pruned {} expired snapshot(s)", removed);
    }
    Ok(())
}

fn list(ctx: &StackContext) -> Result<()> {
    let backups = ctx.backups();
    let entries = backups.list_snapshots()?;
    if entries.is_empty() {
        println!("{}", format!("ℹ No snapshots in {}", backups.root().display()).yellow());
        return Ok(());
    }

    println!("{}", format!("{:<18} {:<22} {}", "ID", "CREATED (UTC)", "STATE").bold());
    for entry in entries {
        let state = if entry.complete {
            "complete".green()
        } else {
            "incomplete".red()
        };
        println!(
            "{:<18} {:<22} {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            state
        );
    }
    Ok(())
}

fn prune(ctx: &StackContext, days: Option<u32>, keep: Option<usize>) -> Result<()> {
    let backups = ctx.backups();
    let policy = match (days, keep) {
        (Some(days), _) => RetentionPolicy::MaxAgeDays(days),
        (None, Some(keep)) => RetentionPolicy::KeepLatest(keep),
        (None, None) => backups.retention(),
    };

    let removed = backups.prune_old_snapshots(policy, Utc::now(), None);
    println!("{}", format!("✓ Pruned {} snapshot(s)", removed).green());
    Ok(())
}

async fn restore(ctx: &StackContext, id: &str) -> Result<()> {
    ctx.require_stack()?;
    let sp = output::spinner(&format!("Restoring snapshot {}...", id));
    match ctx.backups().restore_snapshot(id).await {
        Ok(_) => {
            output::finish_ok(&sp, &format!("Snapshot {} restored", id));
            println!("Restart the stack to pick up restored configuration: obstack stop && obstack deploy --skip-install");
            Ok(())
        }
        Err(e) => {
            output::finish_err(&sp, "Restore failed");
            Err(e.into())
        }
    }
}
