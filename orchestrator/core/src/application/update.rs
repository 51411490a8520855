// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Update orchestrator
//!
//! snapshot → pull → up → settle → one check per critical service.
//!
//! A failed snapshot aborts before the stack is touched. Past that point there
//! is no automatic rollback: a FAILED post-update check leaves the new version
//! running and the report names the snapshot to restore from.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::application::backup_manager::BackupManager;
use crate::application::readiness::ReadinessProber;
use crate::application::stack_controller::StackController;
use crate::domain::backend::BackendCommandError;
use crate::domain::backup::BackupError;
use crate::domain::service::{CheckOutcome, ManagedService, ServiceCheck};

#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Snapshot taken before pulling; the restore point
    pub snapshot_id: String,
    /// Snapshots removed by retention after the new one was written
    pub pruned: usize,
    pub per_service_outcome: Vec<ServiceCheck>,
}

impl UpdateReport {
    pub fn all_ok(&self) -> bool {
        self.per_service_outcome
            .iter()
            .all(|check| check.outcome == CheckOutcome::Ok)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.per_service_outcome
            .iter()
            .filter(|check| check.outcome == CheckOutcome::Failed)
            .map(|check| check.service_name.as_str())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Pre-update backup failed, stack left untouched: {0}")]
    Backup(#[from] BackupError),

    #[error("Update failed after snapshot {snapshot_id}: {source}")]
    Backend {
        snapshot_id: String,
        #[source]
        source: BackendCommandError,
    },
}

pub struct UpdateOrchestrator {
    backups: Arc<BackupManager>,
    stack: StackController,
    prober: ReadinessProber,
    services: Vec<ManagedService>,
    settle_delay: Duration,
}

impl UpdateOrchestrator {
    pub fn new(
        backups: Arc<BackupManager>,
        stack: StackController,
        prober: ReadinessProber,
        services: Vec<ManagedService>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            backups,
            stack,
            prober,
            services,
            settle_delay,
        }
    }

    pub async fn update(&self, now: DateTime<Utc>) -> Result<UpdateReport, UpdateError> {
        info!("Creating pre-update snapshot");
        let snapshot = self.backups.create_snapshot(now).await?;
        let snapshot_id = snapshot.timestamp_id;

        let pruned =
            self.backups
                .prune_old_snapshots(self.backups.retention(), now, Some(&snapshot_id));

        let backend_err = |source| UpdateError::Backend {
            snapshot_id: snapshot_id.clone(),
            source,
        };
        self.stack.pull().await.map_err(backend_err)?;
        self.stack.up().await.map_err(backend_err)?;

        info!("Waiting {:?} for services to settle", self.settle_delay);
        sleep(self.settle_delay).await;

        let mut per_service_outcome = Vec::new();
        for service in self.services.iter().filter(|s| s.critical) {
            let check = self.prober.check_once(service).await;
            if check.outcome == CheckOutcome::Failed {
                warn!(
                    "{} failed its post-update check; snapshot {} is available for restore",
                    service.name, snapshot_id
                );
            }
            per_service_outcome.push(check);
        }

        Ok(UpdateReport {
            snapshot_id,
            pruned,
            per_service_outcome,
        })
    }
}
