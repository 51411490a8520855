// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Deploy workflow
//!
//! First-run and repeat deployment of the whole stack:
//!
//! 1. ensure the container runtime (stops early when a fresh install needs a re-login)
//! 2. ping the engine
//! 3. provision secrets, unless a credentials record already exists
//! 4. pull + up (a failure here still returns the report with any new secrets)
//! 5. wait for every service, then fail if any timed out

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::application::prerequisites::PrerequisiteInstaller;
use crate::application::readiness::ReadinessProber;
use crate::application::secret_provisioner::SecretProvisioner;
use crate::application::stack_controller::StackController;
use crate::domain::backend::{BackendCommandError, EngineProbe};
use crate::domain::platform::{PrerequisiteError, RuntimeStatus};
use crate::domain::secrets::{ProvisionedSecrets, SecretError, SecretSpec};
use crate::domain::service::{ManagedService, ReadinessReport, ReadinessTimeoutError};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Assume the runtime is installed and skip the prerequisite step
    pub skip_install: bool,
}

#[derive(Debug, Default)]
pub struct DeployReport {
    /// `None` when the prerequisite step was skipped
    pub runtime: Option<RuntimeStatus>,
    pub engine_version: Option<String>,
    /// Freshly generated secrets; `None` when an earlier record was reused
    pub secrets: Option<ProvisionedSecrets>,
    pub readiness: ReadinessReport,
}

impl DeployReport {
    /// The runtime was just installed and nothing else ran
    pub fn needs_relogin(&self) -> bool {
        self.runtime == Some(RuntimeStatus::InstalledNeedsRelogin)
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Prerequisite(#[from] PrerequisiteError),

    #[error(transparent)]
    Secrets(#[from] SecretError),

    #[error(transparent)]
    Backend(#[from] BackendCommandError),

    /// pull/up failed after secrets were provisioned
    #[error("{source}")]
    StackFailed {
        report: Box<DeployReport>,
        #[source]
        source: BackendCommandError,
    },

    /// Carries the full report so every service's outcome can still be shown
    #[error("{source}")]
    NotReady {
        report: Box<DeployReport>,
        #[source]
        source: ReadinessTimeoutError,
    },
}

impl DeployError {
    /// Progress made before the failure. Holds secrets generated by this run,
    /// which have not been shown anywhere yet.
    pub fn report(&self) -> Option<&DeployReport> {
        match self {
            DeployError::StackFailed { report, .. } | DeployError::NotReady { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }
}

pub struct DeployWorkflow {
    installer: PrerequisiteInstaller,
    engine: Arc<dyn EngineProbe>,
    provisioner: SecretProvisioner,
    secret_specs: Vec<SecretSpec>,
    stack: StackController,
    prober: ReadinessProber,
    services: Vec<ManagedService>,
}

impl DeployWorkflow {
    pub fn new(
        installer: PrerequisiteInstaller,
        engine: Arc<dyn EngineProbe>,
        provisioner: SecretProvisioner,
        secret_specs: Vec<SecretSpec>,
        stack: StackController,
        prober: ReadinessProber,
        services: Vec<ManagedService>,
    ) -> Self {
        Self {
            installer,
            engine,
            provisioner,
            secret_specs,
            stack,
            prober,
            services,
        }
    }

    pub async fn run(&self, options: DeployOptions, now: DateTime<Utc>) -> Result<DeployReport, DeployError> {
        let mut report = DeployReport::default();

        if !options.skip_install {
            let status = self.installer.ensure_runtime().await?;
            report.runtime = Some(status);
            if report.needs_relogin() {
                info!("Runtime installed; stopping until the operator logs in again");
                return Ok(report);
            }
        }

        let version = self.engine.ping().await?;
        info!("Container engine reachable (version {})", version);
        report.engine_version = Some(version);

        if self.provisioner.is_provisioned() {
            info!(
                "Credentials record {} exists, reusing provisioned secrets",
                self.provisioner.record_path().display()
            );
        } else {
            report.secrets = Some(self.provisioner.provision(&self.secret_specs, now)?);
        }

        if let Err(source) = self.stack.deploy().await {
            return Err(DeployError::StackFailed {
                report: Box::new(report),
                source,
            });
        }

        report.readiness = self.prober.wait_for_all(&self.services).await;
        if let Err(source) = report.readiness.clone().into_result() {
            return Err(DeployError::NotReady {
                report: Box::new(report),
                source,
            });
        }

        info!("Stack deployed, {} services ready", report.readiness.results.len());
        Ok(report)
    }
}
