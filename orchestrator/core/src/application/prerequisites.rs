// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prerequisite installer
//!
//! Ensures the container runtime and its compose tooling exist. Presence is a
//! capability probe (is `docker` resolvable on PATH), never a version check.
//! Installation picks a plan from the platform strategy table and runs each
//! step through the [`CommandRunner`]; a fresh install always ends with
//! [`RuntimeStatus::InstalledNeedsRelogin`] because the running session does
//! not yet carry the new group membership.

use std::sync::Arc;
use tracing::info;

use crate::domain::backend::{CommandRunner, HostCommand};
use crate::domain::platform::{
    HostEnvironment, InstallPlan, Platform, PrerequisiteError, RuntimeStatus,
};

/// Executable whose presence means the runtime is installed
pub const RUNTIME_PROGRAM: &str = "docker";

pub struct PrerequisiteInstaller {
    host: Arc<dyn HostEnvironment>,
    runner: Arc<dyn CommandRunner>,
    compose_command: Vec<String>,
}

impl PrerequisiteInstaller {
    pub fn new(
        host: Arc<dyn HostEnvironment>,
        runner: Arc<dyn CommandRunner>,
        compose_command: Vec<String>,
    ) -> Self {
        Self {
            host,
            runner,
            compose_command,
        }
    }

    pub async fn ensure_runtime(&self) -> Result<RuntimeStatus, PrerequisiteError> {
        if self.host.is_superuser() {
            return Err(PrerequisiteError::RunningAsRoot);
        }

        if !self.host.has_program(RUNTIME_PROGRAM) {
            let platform = Platform::detect(self.host.as_ref());
            let user = self
                .host
                .current_user()
                .ok_or(PrerequisiteError::UnknownUser)?;

            info!("Container runtime not found, installing for platform {}", platform);
            self.run_plan(&InstallPlan::runtime(platform, &user)).await?;
            info!("Container runtime installed; user '{}' added to the docker group", user);

            return Ok(RuntimeStatus::InstalledNeedsRelogin);
        }

        if self.compose_available().await {
            info!("Container runtime and compose tooling already present");
            return Ok(RuntimeStatus::AlreadyPresent);
        }

        let platform = Platform::detect(self.host.as_ref());
        let plan = InstallPlan::compose_plugin(platform)
            .ok_or(PrerequisiteError::ComposeUnavailable(platform))?;

        info!("Compose tooling missing, installing plugin for platform {}", platform);
        self.run_plan(&plan).await?;

        Ok(RuntimeStatus::ComposePluginInstalled)
    }

    async fn compose_available(&self) -> bool {
        let Some(command) = HostCommand::from_argv(&self.compose_command) else {
            return false;
        };
        match self.runner.run(&command.arg("version")).await {
            Ok(output) => output.success(),
            Err(_) => false,
        }
    }

    async fn run_plan(&self, plan: &InstallPlan) -> Result<(), PrerequisiteError> {
        for step in &plan.steps {
            info!("Running: {}", step);
            self.runner
                .run_checked(step)
                .await
                .map_err(|source| PrerequisiteError::InstallStepFailed {
                    step: step.to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::{BackendCommandError, CommandOutput};
    use crate::domain::platform::DEBIAN_MARKER;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeHost {
        root: bool,
        has_docker: bool,
        debian: bool,
    }

    impl HostEnvironment for FakeHost {
        fn is_superuser(&self) -> bool {
            self.root
        }
        fn has_program(&self, program: &str) -> bool {
            program == RUNTIME_PROGRAM && self.has_docker
        }
        fn path_exists(&self, path: &str) -> bool {
            self.debian && path == DEBIAN_MARKER
        }
        fn current_user(&self) -> Option<String> {
            Some("ops".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        compose_missing: bool,
        fail_program: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError> {
            let line = command.to_string();
            self.calls.lock().unwrap().push(line.clone());

            let failed = (self.compose_missing && line == "docker compose version")
                || self.fail_program.is_some_and(|p| command.args.first().is_some_and(|a| a == p));
            Ok(CommandOutput {
                code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed { "E: unable to locate package".to_string() } else { String::new() },
            })
        }

        async fn run_attached(&self, _command: &HostCommand) -> Result<(), BackendCommandError> {
            Ok(())
        }
    }

    fn installer(host: FakeHost, runner: Arc<RecordingRunner>) -> PrerequisiteInstaller {
        PrerequisiteInstaller::new(
            Arc::new(host),
            runner,
            vec!["docker".to_string(), "compose".to_string()],
        )
    }

    #[tokio::test]
    async fn test_already_present_is_idempotent() {
        let runner = Arc::new(RecordingRunner::default());
        let installer = installer(
            FakeHost { root: false, has_docker: true, debian: true },
            runner.clone(),
        );

        assert_eq!(installer.ensure_runtime().await.unwrap(), RuntimeStatus::AlreadyPresent);
        assert_eq!(installer.ensure_runtime().await.unwrap(), RuntimeStatus::AlreadyPresent);

        let calls = runner.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c == "docker compose version"));
        assert!(!calls.iter().any(|c| c.starts_with("sudo")));
    }

    #[tokio::test]
    async fn test_root_is_refused_before_anything_runs() {
        let runner = Arc::new(RecordingRunner::default());
        let installer = installer(
            FakeHost { root: true, has_docker: false, debian: true },
            runner.clone(),
        );

        let err = installer.ensure_runtime().await.unwrap_err();
        assert!(matches!(err, PrerequisiteError::RunningAsRoot));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_install_requires_relogin() {
        let runner = Arc::new(RecordingRunner::default());
        let installer = installer(
            FakeHost { root: false, has_docker: false, debian: true },
            runner.clone(),
        );

        assert_eq!(
            installer.ensure_runtime().await.unwrap(),
            RuntimeStatus::InstalledNeedsRelogin
        );

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0], "sudo apt-get update");
        assert_eq!(calls.last().unwrap(), "sudo usermod -aG docker ops");
    }

    #[tokio::test]
    async fn test_missing_compose_installs_plugin() {
        let runner = Arc::new(RecordingRunner {
            compose_missing: true,
            ..Default::default()
        });
        let installer = installer(
            FakeHost { root: false, has_docker: true, debian: true },
            runner.clone(),
        );

        assert_eq!(
            installer.ensure_runtime().await.unwrap(),
            RuntimeStatus::ComposePluginInstalled
        );
        assert!(runner
            .calls
            .lock()
            .unwrap()
            .contains(&"sudo apt-get install -y docker-compose-plugin".to_string()));
    }

    #[tokio::test]
    async fn test_missing_compose_on_generic_host_fails() {
        let runner = Arc::new(RecordingRunner {
            compose_missing: true,
            ..Default::default()
        });
        let installer = installer(
            FakeHost { root: false, has_docker: true, debian: false },
            runner,
        );

        let err = installer.ensure_runtime().await.unwrap_err();
        assert!(matches!(err, PrerequisiteError::ComposeUnavailable(Platform::Generic)));
    }

    #[tokio::test]
    async fn test_failed_step_stops_installation() {
        let runner = Arc::new(RecordingRunner {
            fail_program: Some("apt-get"),
            ..Default::default()
        });
        let installer = installer(
            FakeHost { root: false, has_docker: false, debian: true },
            runner.clone(),
        );

        let err = installer.ensure_runtime().await.unwrap_err();
        match err {
            PrerequisiteError::InstallStepFailed { step, .. } => {
                assert_eq!(step, "sudo apt-get update");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }
}
