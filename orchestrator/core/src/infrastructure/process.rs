// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::backend::{BackendCommandError, CommandOutput, CommandRunner, HostCommand};

/// Runs host processes with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn spawn_error(command: &HostCommand, source: std::io::Error) -> BackendCommandError {
        match source.kind() {
            std::io::ErrorKind::NotFound => BackendCommandError::NotInstalled {
                program: command.program.clone(),
            },
            std::io::ErrorKind::PermissionDenied => BackendCommandError::PermissionDenied {
                command: command.to_string(),
                stderr: source.to_string(),
            },
            _ => BackendCommandError::Io {
                command: command.to_string(),
                source,
            },
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError> {
        debug!("Running: {}", command);
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_attached(&self, command: &HostCommand) -> Result<(), BackendCommandError> {
        debug!("Running attached: {}", command);
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(BackendCommandError::Failed {
                command: command.to_string(),
                code: status.code(),
                stderr: String::new(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_not_installed() {
        let runner = TokioCommandRunner::new();
        let err = runner
            .run(&HostCommand::new("obstack-definitely-not-a-binary"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendCommandError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let runner = TokioCommandRunner::new();
        let output = runner
            .run(&HostCommand::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");

        let err = runner
            .run_checked(&HostCommand::new("sh").args(["-c", "exit 3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendCommandError::Failed { code: Some(3), .. }));
    }
}
