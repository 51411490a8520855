// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Stack files embedded in the binary and written out by `obstack init`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// (path relative to the stack directory, contents)
pub const STACK_FILES: &[(&str, &str)] = &[
    (
        "docker-compose.yaml",
        include_str!("../templates/stack/docker-compose.yaml"),
    ),
    (
        "otel-collector-config.yaml",
        include_str!("../templates/stack/otel-collector-config.yaml"),
    ),
    (
        "grafana/provisioning/datasources/clickhouse.yaml",
        include_str!("../templates/stack/grafana/provisioning/datasources/clickhouse.yaml"),
    ),
    (
        "clickhouse/config.d/backups.xml",
        include_str!("../templates/stack/clickhouse/config.d/backups.xml"),
    ),
];

/// Write every stack file under `dir`. Existing files are an error unless
/// `force` is set; returns the paths written.
pub fn scaffold(dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    if !force {
        let existing: Vec<String> = STACK_FILES
            .iter()
            .map(|(relative, _)| dir.join(relative))
            .filter(|path| path.exists())
            .map(|path| path.display().to_string())
            .collect();
        if !existing.is_empty() {
            anyhow::bail!(
                "Refusing to overwrite existing files (use --force):\n  {}",
                existing.join("\n  ")
            );
        }
    }

    let mut written = Vec::with_capacity(STACK_FILES.len());
    for (relative, contents) in STACK_FILES {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
