// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestration Backend Boundary
//!
//! The container orchestration tool (Docker Compose) and every host command the
//! orchestrator issues are treated as black boxes behind two seams:
//!
//! - [`CommandRunner`] executes a single host process and captures its output.
//! - [`ComposeBackend`] exposes the compose verbs the lifecycle workflows need.
//!
//! A non-zero exit is never the only error signal: [`BackendCommandError`]
//! separates "not installed", "permission denied" and "backend failed" so callers
//! can tell the operator what to fix.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// A host command expressed as plain data (program + arguments)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build a command from an argv-style slice (`["docker", "compose"]`)
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished host process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into a classified [`BackendCommandError`]
    pub fn into_result(self, command: &HostCommand) -> Result<Self, BackendCommandError> {
        if self.success() {
            return Ok(self);
        }

        let stderr = self.stderr.trim().to_string();
        if stderr.to_ascii_lowercase().contains("permission denied") {
            return Err(BackendCommandError::PermissionDenied {
                command: command.to_string(),
                stderr,
            });
        }

        Err(BackendCommandError::Failed {
            command: command.to_string(),
            code: self.code,
            stderr,
        })
    }
}

#[derive(Debug, Error)]
pub enum BackendCommandError {
    #[error("'{program}' is not installed or not on PATH")]
    NotInstalled { program: String },

    #[error("Permission denied running '{command}': {stderr}\n\nIs the current user in the 'docker' group? Log out and back in after installation.")]
    PermissionDenied { command: String, stderr: String },

    #[error("'{command}' failed ({}): {stderr}", describe_exit(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to run '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Container engine is not reachable: {reason}\n\nIs the Docker daemon running?")]
    EngineUnreachable { reason: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Executes host processes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture stdout/stderr. A non-zero exit is returned
    /// as `Ok` so callers can treat it as a probe result.
    async fn run(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError>;

    /// Run with the terminal attached (used for `logs -f`)
    async fn run_attached(&self, command: &HostCommand) -> Result<(), BackendCommandError>;

    /// Run and fail on non-zero exit
    async fn run_checked(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError> {
        self.run(command).await?.into_result(command)
    }
}

/// Liveness of the container engine itself, independent of any stack
#[async_trait]
pub trait EngineProbe: Send + Sync {
    /// Returns the engine version on success
    async fn ping(&self) -> Result<String, BackendCommandError>;
}

/// Compose verbs used by the lifecycle workflows
#[async_trait]
pub trait ComposeBackend: Send + Sync {
    async fn pull(&self) -> Result<(), BackendCommandError>;

    /// Start (or recreate) the stack detached
    async fn up(&self) -> Result<(), BackendCommandError>;

    async fn down(&self) -> Result<(), BackendCommandError>;

    /// Human-readable container listing
    async fn ps(&self) -> Result<String, BackendCommandError>;

    /// Run a command inside a service container. Non-zero exits are returned as `Ok`.
    async fn exec(&self, service: &str, command: &[String]) -> Result<CommandOutput, BackendCommandError>;

    async fn logs(&self, service: Option<&str>, follow: bool) -> Result<(), BackendCommandError>;

    /// Copy a path out of a service container onto the host
    async fn copy_from_service(
        &self,
        service: &str,
        container_path: &str,
        host_path: &Path,
    ) -> Result<(), BackendCommandError>;

    /// Copy a host path into a service container
    async fn copy_to_service(
        &self,
        service: &str,
        host_path: &Path,
        container_path: &str,
    ) -> Result<(), BackendCommandError>;
}
