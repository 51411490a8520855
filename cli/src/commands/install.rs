// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use obstack_core::domain::platform::RuntimeStatus;

use crate::context::StackContext;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let ctx = StackContext::load(config_path)?;

    println!("Checking container runtime...");
    let status = ctx.installer().ensure_runtime().await?;
    print_status(status);

    Ok(())
}

pub fn print_status(status: RuntimeStatus) {
    match status {
        RuntimeStatus::AlreadyPresent => {
            println!("{}", "✓ Docker and Compose are installed".green());
        }
        RuntimeStatus::ComposePluginInstalled => {
            println!("{}", "✓ Docker Compose plugin installed".green());
        }
        RuntimeStatus::InstalledNeedsRelogin => {
            println!("{}", "✓ Docker installed".green());
            println!(
                "{}",
                "⚠ Log out and back in so your user picks up the 'docker' group, then run 'obstack deploy'."
                    .yellow()
            );
        }
    }
}
