// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Docker Compose backend
//!
//! Every verb is `<compose command> -f <file> -p <project> <verb> ...` run
//! through a [`CommandRunner`], so tests can swap the process layer out.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::backend::{
    BackendCommandError, CommandOutput, CommandRunner, ComposeBackend, HostCommand,
};
use crate::domain::stack_config::StackConfig;

pub struct DockerComposeBackend {
    runner: Arc<dyn CommandRunner>,
    command: Vec<String>,
    file: PathBuf,
    project: String,
}

impl DockerComposeBackend {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command: Vec<String>,
        file: impl Into<PathBuf>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            command,
            file: file.into(),
            project: project.into(),
        }
    }

    pub fn from_config(runner: Arc<dyn CommandRunner>, config: &StackConfig) -> Self {
        Self::new(
            runner,
            config.spec.compose.command.clone(),
            config.compose_file(),
            config.spec.compose.project.clone(),
        )
    }

    /// Base invocation with file and project pinned
    fn compose(&self) -> Result<HostCommand, BackendCommandError> {
        let base = HostCommand::from_argv(&self.command).ok_or_else(|| {
            BackendCommandError::NotInstalled {
                program: "<empty compose command>".to_string(),
            }
        })?;
        Ok(base
            .arg("-f")
            .arg(self.file.display().to_string())
            .arg("-p")
            .arg(self.project.clone()))
    }

    async fn checked(&self, command: HostCommand) -> Result<CommandOutput, BackendCommandError> {
        self.runner.run_checked(&command).await
    }
}

#[async_trait]
impl ComposeBackend for DockerComposeBackend {
    async fn pull(&self) -> Result<(), BackendCommandError> {
        self.checked(self.compose()?.arg("pull")).await.map(|_| ())
    }

    async fn up(&self) -> Result<(), BackendCommandError> {
        self.checked(self.compose()?.args(["up", "-d"])).await.map(|_| ())
    }

    async fn down(&self) -> Result<(), BackendCommandError> {
        self.checked(self.compose()?.arg("down")).await.map(|_| ())
    }

    async fn ps(&self) -> Result<String, BackendCommandError> {
        Ok(self.checked(self.compose()?.arg("ps")).await?.stdout)
    }

    async fn exec(&self, service: &str, command: &[String]) -> Result<CommandOutput, BackendCommandError> {
        let invocation = self
            .compose()?
            .args(["exec", "-T", service])
            .args(command.iter().cloned());
        self.runner.run(&invocation).await
    }

    async fn logs(&self, service: Option<&str>, follow: bool) -> Result<(), BackendCommandError> {
        let mut invocation = self.compose()?.arg("logs");
        if follow {
            invocation = invocation.arg("-f");
        }
        if let Some(service) = service {
            invocation = invocation.arg(service);
        }
        self.runner.run_attached(&invocation).await
    }

    async fn copy_from_service(
        &self,
        service: &str,
        container_path: &str,
        host_path: &Path,
    ) -> Result<(), BackendCommandError> {
        let invocation = self
            .compose()?
            .arg("cp")
            .arg(format!("{}:{}", service, container_path))
            .arg(host_path.display().to_string());
        self.checked(invocation).await.map(|_| ())
    }

    async fn copy_to_service(
        &self,
        service: &str,
        host_path: &Path,
        container_path: &str,
    ) -> Result<(), BackendCommandError> {
        let invocation = self
            .compose()?
            .arg("cp")
            .arg(host_path.display().to_string())
            .arg(format!("{}:{}", service, container_path));
        self.checked(invocation).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        attached: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError> {
            self.calls.lock().unwrap().push(command.to_string());
            Ok(CommandOutput {
                code: Some(0),
                stdout: "NAME  STATUS\n".to_string(),
                stderr: String::new(),
            })
        }

        async fn run_attached(&self, command: &HostCommand) -> Result<(), BackendCommandError> {
            self.attached.lock().unwrap().push(command.to_string());
            Ok(())
        }
    }

    fn backend(runner: Arc<RecordingRunner>) -> DockerComposeBackend {
        DockerComposeBackend::new(
            runner,
            vec!["docker".to_string(), "compose".to_string()],
            "/srv/stack/docker-compose.yaml",
            "obstack",
        )
    }

    #[tokio::test]
    async fn test_verbs_pin_file_and_project() {
        let runner = Arc::new(RecordingRunner::default());
        let compose = backend(runner.clone());

        compose.pull().await.unwrap();
        compose.up().await.unwrap();
        assert_eq!(compose.ps().await.unwrap(), "NAME  STATUS\n");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            "docker compose -f /srv/stack/docker-compose.yaml -p obstack pull"
        );
        assert_eq!(
            calls[1],
            "docker compose -f /srv/stack/docker-compose.yaml -p obstack up -d"
        );
    }

    #[tokio::test]
    async fn test_exec_and_copy_arguments() {
        let runner = Arc::new(RecordingRunner::default());
        let compose = backend(runner.clone());

        compose
            .exec("clickhouse", &["clickhouse-client".to_string(), "--query".to_string()])
            .await
            .unwrap();
        compose
            .copy_from_service("grafana", "/var/lib/grafana", Path::new("/tmp/snap/grafana"))
            .await
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].ends_with("exec -T clickhouse clickhouse-client --query"));
        assert!(calls[1].ends_with("cp grafana:/var/lib/grafana /tmp/snap/grafana"));
    }

    #[tokio::test]
    async fn test_logs_runs_attached() {
        let runner = Arc::new(RecordingRunner::default());
        let compose = backend(runner.clone());

        compose.logs(Some("grafana"), true).await.unwrap();
        assert!(runner.calls.lock().unwrap().is_empty());
        assert!(runner.attached.lock().unwrap()[0].ends_with("logs -f grafana"));
    }
}
