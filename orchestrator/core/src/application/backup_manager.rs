// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Backup manager
//!
//! Creates, lists, prunes and restores timestamped snapshots under the backup
//! root. See [`crate::domain::backup`] for the on-disk layout.
//!
//! A snapshot directory is created first and the manifest written last, so a
//! crash or export failure leaves an *incomplete* directory behind. Those are
//! listed (flagged) and pruned like any other snapshot, but never restored.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::backend::{ComposeBackend, HostCommand};
use crate::domain::backup::{
    parse_snapshot_id, snapshot_id, BackupConfig, BackupError, BackupSnapshot, ExportMethod,
    RetentionPolicy, SnapshotEntry, SNAPSHOT_EXPORTS_DIR, SNAPSHOT_ID_TOKEN, SNAPSHOT_MANIFEST,
};

pub struct BackupManager {
    stack_dir: PathBuf,
    root: PathBuf,
    config: BackupConfig,
    backend: Arc<dyn ComposeBackend>,
}

impl BackupManager {
    pub fn new(
        stack_dir: impl Into<PathBuf>,
        config: BackupConfig,
        backend: Arc<dyn ComposeBackend>,
    ) -> Self {
        let stack_dir = stack_dir.into();
        let root = if config.root.is_absolute() {
            config.root.clone()
        } else {
            stack_dir.join(&config.root)
        };
        Self {
            stack_dir,
            root,
            config,
            backend,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.config.retention
    }

    /// Take a snapshot of the configuration artifacts and every service export
    pub async fn create_snapshot(&self, now: DateTime<Utc>) -> Result<BackupSnapshot, BackupError> {
        let id = snapshot_id(now);
        let snapshot_dir = self.root.join(&id);

        std::fs::create_dir_all(&self.root).map_err(|source| BackupError::Io {
            path: self.root.clone(),
            source,
        })?;
        match std::fs::create_dir(&snapshot_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackupError::SnapshotExists(id));
            }
            Err(source) => {
                return Err(BackupError::Io {
                    path: snapshot_dir,
                    source,
                })
            }
        }
        info!("Creating snapshot {} in {}", id, snapshot_dir.display());

        let mut included_artifacts = BTreeSet::new();
        for artifact in &self.config.artifacts {
            let source = self.stack_dir.join(artifact);
            if !source.exists() {
                warn!("Artifact {} does not exist, skipping", source.display());
                continue;
            }
            copy_path(&source, &snapshot_dir.join(artifact))?;
            debug!("Copied artifact {}", artifact.display());
            included_artifacts.insert(artifact.clone());
        }

        let mut per_service_exports = BTreeMap::new();
        for export in &self.config.exports {
            let location = match &export.method {
                ExportMethod::NativeBackup {
                    command,
                    container_path,
                    ..
                } => {
                    let command = substitute_id(command, &id);
                    let output = self
                        .backend
                        .exec(&export.service, &command)
                        .await
                        .map_err(|e| BackupError::ExportFailed {
                            service: export.service.clone(),
                            reason: e.to_string(),
                        })?;
                    if !output.success() {
                        return Err(BackupError::ExportFailed {
                            service: export.service.clone(),
                            reason: output.stderr.trim().to_string(),
                        });
                    }
                    container_path.replace(SNAPSHOT_ID_TOKEN, &id)
                }
                ExportMethod::CopyOut { container_path } => {
                    // `cp` needs the destination's parent to exist
                    let exports_dir = snapshot_dir.join(SNAPSHOT_EXPORTS_DIR);
                    std::fs::create_dir_all(&exports_dir).map_err(|e| BackupError::ExportFailed {
                        service: export.service.clone(),
                        reason: format!("{}: {}", exports_dir.display(), e),
                    })?;
                    let destination = exports_dir.join(&export.service);
                    self.backend
                        .copy_from_service(&export.service, container_path, &destination)
                        .await
                        .map_err(|e| BackupError::ExportFailed {
                            service: export.service.clone(),
                            reason: e.to_string(),
                        })?;
                    destination.display().to_string()
                }
            };
            info!("Exported {} to {}", export.service, location);
            per_service_exports.insert(export.service.clone(), location);
        }

        let snapshot = BackupSnapshot {
            timestamp_id: id,
            root_path: snapshot_dir,
            created_at: now,
            included_artifacts,
            per_service_exports,
        };
        self.write_manifest(&snapshot)?;
        info!("Snapshot {} complete", snapshot.timestamp_id);

        Ok(snapshot)
    }

    /// Snapshot directories under the root, newest first. A missing root is empty.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotEntry>, BackupError> {
        let read_dir = match std::fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => {
                return Err(BackupError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| BackupError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(id) = dir_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(created_at) = parse_snapshot_id(&id) else {
                continue;
            };
            entries.push(SnapshotEntry {
                complete: path.join(SNAPSHOT_MANIFEST).is_file(),
                id,
                path,
                created_at,
            });
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Remove snapshots outside the retention policy. `keep` is never removed.
    /// Deletion failures are logged and skipped; returns how many were removed.
    pub fn prune_old_snapshots(
        &self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
        keep: Option<&str>,
    ) -> usize {
        let entries = match self.list_snapshots() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list snapshots for pruning: {}", e);
                return 0;
            }
        };

        let candidates: Vec<&SnapshotEntry> = match policy {
            RetentionPolicy::MaxAgeDays(days) => {
                let cutoff = now - Duration::days(i64::from(days));
                entries.iter().filter(|e| e.created_at < cutoff).collect()
            }
            RetentionPolicy::KeepLatest(count) => entries.iter().skip(count).collect(),
        };

        let mut removed = 0;
        for entry in candidates {
            if keep == Some(entry.id.as_str()) {
                continue;
            }
            match std::fs::remove_dir_all(&entry.path) {
                Ok(()) => {
                    info!("Pruned snapshot {}", entry.id);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove snapshot {}: {}", entry.path.display(), e),
            }
        }
        removed
    }

    pub fn load_snapshot(&self, id: &str) -> Result<BackupSnapshot, BackupError> {
        let snapshot_dir = self.root.join(id);
        if parse_snapshot_id(id).is_none() || !snapshot_dir.is_dir() {
            return Err(BackupError::SnapshotNotFound(id.to_string()));
        }

        let manifest = snapshot_dir.join(SNAPSHOT_MANIFEST);
        if !manifest.is_file() {
            return Err(BackupError::SnapshotIncomplete(id.to_string()));
        }
        let content = std::fs::read_to_string(&manifest).map_err(|source| BackupError::Io {
            path: manifest.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| BackupError::MalformedManifest {
            path: manifest,
            reason: e.to_string(),
        })
    }

    /// Put a complete snapshot back: artifacts into the stack directory, then
    /// service state into the running containers
    pub async fn restore_snapshot(&self, id: &str) -> Result<BackupSnapshot, BackupError> {
        let snapshot = self.load_snapshot(id)?;
        let snapshot_dir = self.root.join(id);
        info!("Restoring snapshot {}", id);

        for artifact in &snapshot.included_artifacts {
            copy_path(&snapshot_dir.join(artifact), &self.stack_dir.join(artifact))?;
            debug!("Restored artifact {}", artifact.display());
        }

        for export in &self.config.exports {
            if !snapshot.per_service_exports.contains_key(&export.service) {
                warn!("Snapshot {} has no export for {}, skipping", id, export.service);
                continue;
            }
            let restore_err = |source| BackupError::RestoreFailed {
                service: export.service.clone(),
                source,
            };

            match &export.method {
                ExportMethod::CopyOut { container_path } => {
                    // Trailing "." copies the directory's contents, not the directory
                    let source = snapshot_dir
                        .join(SNAPSHOT_EXPORTS_DIR)
                        .join(&export.service)
                        .join(".");
                    self.backend
                        .copy_to_service(&export.service, &source, container_path)
                        .await
                        .map_err(restore_err)?;
                }
                ExportMethod::NativeBackup {
                    restore_command: Some(command),
                    ..
                } => {
                    let command = substitute_id(command, id);
                    let label = HostCommand::new("exec")
                        .arg(export.service.clone())
                        .args(command.iter().cloned());
                    self.backend
                        .exec(&export.service, &command)
                        .await
                        .and_then(|output| output.into_result(&label))
                        .map_err(restore_err)?;
                }
                ExportMethod::NativeBackup {
                    container_path,
                    restore_command: None,
                    ..
                } => {
                    warn!(
                        "No restore command for {}; restore {} inside the container manually",
                        export.service,
                        container_path.replace(SNAPSHOT_ID_TOKEN, id)
                    );
                    continue;
                }
            }
            info!("Restored {} state", export.service);
        }

        Ok(snapshot)
    }

    fn write_manifest(&self, snapshot: &BackupSnapshot) -> Result<(), BackupError> {
        let path = snapshot.root_path.join(SNAPSHOT_MANIFEST);
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| BackupError::MalformedManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|source| BackupError::Io { path, source })
    }
}

fn substitute_id(command: &[String], id: &str) -> Vec<String> {
    command
        .iter()
        .map(|arg| arg.replace(SNAPSHOT_ID_TOKEN, id))
        .collect()
}

/// Copy a file, or a directory tree, to `destination`, creating parents
fn copy_path(source: &Path, destination: &Path) -> Result<(), BackupError> {
    let copy_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BackupError::ArtifactCopyFailed { path, source }
    };

    if source.is_file() {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(copy_err(parent))?;
        }
        std::fs::copy(source, destination).map_err(copy_err(source))?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| BackupError::ArtifactCopyFailed {
            path: source.to_path_buf(),
            source: e.into(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(copy_err(&target))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(copy_err(entry.path()))?;
        }
    }
    Ok(())
}
