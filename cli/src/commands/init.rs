// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use obstack_core::domain::stack_config::StackConfig;

use crate::templates;

pub async fn execute(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config = StackConfig::load_or_default(config_path).context("Failed to load configuration")?;
    let stack_dir = &config.spec.stack_dir;

    let written = templates::scaffold(stack_dir, force)?;
    for path in &written {
        println!("  {}", path.display());
    }
    println!(
        "{}",
        format!("✓ Stack scaffolded in {}", stack_dir.display()).green()
    );
    println!("Next: obstack deploy");

    Ok(())
}
