// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Backup snapshots
//!
//! A snapshot is a directory named `YYYYMMDD_HHMMSS` (UTC) under the backup root.
//! It holds copies of the configuration artifacts plus per-service exports, and
//! becomes *complete* only once its `snapshot.json` manifest has been written.
//! Incomplete directories are left on disk for inspection but are never restored.
//!
//! Exports come in two flavours:
//!
//! - [`ExportMethod::NativeBackup`]: the store's own backup primitive, run inside
//!   its container. The export lands inside the container's data volume, NOT in
//!   the snapshot root; the manifest only records the container-side path.
//! - [`ExportMethod::CopyOut`]: the service's state directory is copied out of the
//!   running container into `<snapshot>/exports/<service>/`, kept apart from
//!   artifact directories that may share the service's name.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::backend::BackendCommandError;

/// Format of snapshot directory names
pub const SNAPSHOT_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Manifest written last; its presence marks a snapshot complete
pub const SNAPSHOT_MANIFEST: &str = "snapshot.json";

/// Subdirectory holding `copy_out` exports
pub const SNAPSHOT_EXPORTS_DIR: &str = "exports";

/// Substituted with the snapshot id in export commands and paths
pub const SNAPSHOT_ID_TOKEN: &str = "{snapshot_id}";

pub fn snapshot_id(at: DateTime<Utc>) -> String {
    at.format(SNAPSHOT_ID_FORMAT).to_string()
}

/// Parse a snapshot directory name back into its creation time
pub fn parse_snapshot_id(id: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(id, SNAPSHOT_ID_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ExportMethod {
    /// Run the service's native backup command inside its container
    NativeBackup {
        command: Vec<String>,
        /// Where the command leaves the export, inside the container
        container_path: String,
        /// Optional inverse used by restore
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restore_command: Option<Vec<String>>,
    },

    /// Copy a directory out of the running container
    CopyOut { container_path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceExport {
    pub service: String,
    #[serde(flatten)]
    pub method: ExportMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Remove snapshots older than N days
    MaxAgeDays(u32),
    /// Keep the N newest snapshots
    KeepLatest(usize),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::MaxAgeDays(7)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Snapshot root; relative paths resolve against the stack directory
    #[serde(default = "default_backup_root")]
    pub root: PathBuf,

    /// Files or directories (relative to the stack directory) copied into each snapshot
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,

    /// Per-service exports, run in order
    #[serde(default)]
    pub exports: Vec<ServiceExport>,

    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub retention: RetentionPolicy,
}

fn default_backup_root() -> PathBuf {
    PathBuf::from("backups")
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            root: default_backup_root(),
            artifacts: vec![],
            exports: vec![],
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub timestamp_id: String,
    pub root_path: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Artifact paths as declared (relative to the stack directory)
    pub included_artifacts: BTreeSet<PathBuf>,
    /// Service name → export location. `copy_out` exports are host paths inside
    /// the snapshot root; `native_backup` exports are container-side paths.
    pub per_service_exports: BTreeMap<String, String>,
}

/// A directory found under the backup root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub complete: bool,
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Snapshot {0} already exists")]
    SnapshotExists(String),

    #[error("Snapshot {0} not found")]
    SnapshotNotFound(String),

    #[error("Snapshot {0} is incomplete and cannot be restored")]
    SnapshotIncomplete(String),

    #[error("Failed to copy artifact {}: {source}", .path.display())]
    ArtifactCopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Export failed for service '{service}': {reason}")]
    ExportFailed { service: String, reason: String },

    #[error("Restore failed for service '{service}': {source}")]
    RestoreFailed {
        service: String,
        #[source]
        source: BackendCommandError,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot manifest {}: {reason}", .path.display())]
    MalformedManifest { path: PathBuf, reason: String },
}
