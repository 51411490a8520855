// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Stack Update Command
//!
//! `obstack update` snapshots the stack, pulls newer images, restarts and runs
//! one health check per critical service.
//!
//! # Rollback
//!
//! There is none. A FAILED check leaves the new images running; the command
//! exits non-zero and prints the snapshot to restore from:
//!
//! ```bash
//! obstack backup restore 20260502_030000
//! ```

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::path::PathBuf;

use crate::context::StackContext;
use crate::output;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    println!("{}", "obstack update".bold().green());

    let ctx = StackContext::load(config_path)?;
    ctx.require_stack()?;
    let orchestrator = ctx.update_orchestrator()?;

    let sp = output::spinner("Snapshot, pull, restart, settle...");
    let report = match orchestrator.update(Utc::now()).await {
        Ok(report) => report,
        Err(e) => {
            output::finish_err(&sp, "Update failed");
            return Err(e.into());
        }
    };
    output::finish_ok(&sp, &format!("Updated (snapshot {})", report.snapshot_id));
    if report.pruned > 0 {
        println!("Pruned {} expired snapshot(s)", report.pruned);
    }

    println!("{}", "Post-update checks:".bold());
    output::print_checks(&report.per_service_outcome);

    if !report.all_ok() {
        println!(
            "{}",
            format!(
                "⚠ The new version is still running. To roll back: obstack backup restore {}",
                report.snapshot_id
            )
            .yellow()
        );
        anyhow::bail!("Post-update check failed for: {}", report.failed().join(", "));
    }

    println!("{}", "✓ All critical services healthy".green());
    Ok(())
}
