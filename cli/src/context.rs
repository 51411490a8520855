// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Component wiring
//!
//! Loads the stack configuration once and builds the core components from it.
//! Commands ask for the pieces they need; nothing is constructed up front.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use obstack_core::application::{
    BackupManager, DeployWorkflow, PrerequisiteInstaller, ReadinessProber, SecretProvisioner,
    StackController, UpdateOrchestrator,
};
use obstack_core::domain::backend::{CommandRunner, ComposeBackend};
use obstack_core::domain::stack_config::StackConfig;
use obstack_core::infrastructure::{
    DockerComposeBackend, DockerEngine, LocalHost, StackHealthChecker, TokioCommandRunner,
};

pub struct StackContext {
    pub config: StackConfig,
    runner: Arc<dyn CommandRunner>,
    backend: Arc<dyn ComposeBackend>,
}

impl StackContext {
    /// Load (with discovery), validate and wire
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = StackConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: StackConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
        let backend: Arc<dyn ComposeBackend> =
            Arc::new(DockerComposeBackend::from_config(runner.clone(), &config));
        Self {
            config,
            runner,
            backend,
        }
    }

    /// Stack commands need a scaffolded stack directory
    pub fn require_stack(&self) -> Result<()> {
        let compose_file = self.config.compose_file();
        if !compose_file.is_file() {
            anyhow::bail!(
                "No compose file at {}. Run 'obstack init' first.",
                compose_file.display()
            );
        }
        Ok(())
    }

    pub fn installer(&self) -> PrerequisiteInstaller {
        PrerequisiteInstaller::new(
            Arc::new(LocalHost),
            self.runner.clone(),
            self.config.spec.compose.command.clone(),
        )
    }

    pub fn provisioner(&self) -> SecretProvisioner {
        SecretProvisioner::new(&self.config.spec.stack_dir, &self.config.spec.secrets.record)
    }

    pub fn controller(&self) -> StackController {
        StackController::new(self.backend.clone())
    }

    pub fn prober(&self) -> Result<ReadinessProber> {
        let checker =
            StackHealthChecker::new(self.backend.clone()).context("Failed to build HTTP client")?;
        Ok(ReadinessProber::new(Arc::new(checker)))
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::new(
            &self.config.spec.stack_dir,
            self.config.spec.backup.clone(),
            self.backend.clone(),
        )
    }

    pub fn deploy_workflow(&self) -> Result<DeployWorkflow> {
        let engine = DockerEngine::connect()?;
        Ok(DeployWorkflow::new(
            self.installer(),
            Arc::new(engine),
            self.provisioner(),
            self.config.spec.secrets.specs.clone(),
            self.controller(),
            self.prober()?,
            self.config.spec.services.clone(),
        ))
    }

    pub fn update_orchestrator(&self) -> Result<UpdateOrchestrator> {
        Ok(UpdateOrchestrator::new(
            Arc::new(self.backups()),
            self.controller(),
            self.prober()?,
            self.config.spec.services.clone(),
            self.config.spec.update.settle_delay,
        ))
    }
}
