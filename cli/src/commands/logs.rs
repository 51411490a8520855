// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use std::path::PathBuf;

use crate::context::StackContext;

pub async fn execute(config_path: Option<PathBuf>, service: Option<String>, follow: bool) -> Result<()> {
    let ctx = StackContext::load(config_path)?;
    ctx.require_stack()?;

    if let Some(name) = &service {
        if ctx.config.service(name).is_none() {
            anyhow::bail!("Unknown service '{}'", name);
        }
    }

    ctx.controller().logs(service.as_deref(), follow).await?;
    Ok(())
}
