// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::context::StackContext;
use crate::output;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let ctx = StackContext::load(config_path)?;
    ctx.require_stack()?;

    println!("{}", "Containers:".bold());
    println!("{}", ctx.controller().ps().await?);

    println!("{}", "Health:".bold());
    let prober = ctx.prober()?;
    let mut checks = Vec::with_capacity(ctx.config.spec.services.len());
    for service in &ctx.config.spec.services {
        checks.push(prober.check_once(service).await);
    }
    output::print_checks(&checks);

    Ok(())
}
