// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::context::StackContext;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let ctx = StackContext::load(config_path)?;
    ctx.require_stack()?;

    println!("Stopping stack...");
    ctx.controller().down().await?;
    println!("{}", "✓ Stack stopped (volumes kept)".green());

    Ok(())
}
