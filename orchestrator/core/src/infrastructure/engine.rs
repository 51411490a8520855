// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use bollard::Docker;
use tracing::debug;

use crate::domain::backend::{BackendCommandError, EngineProbe};

/// Talks to the Docker Engine API over its local socket
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform default socket. Connecting is
    /// lazy; an unreachable daemon only surfaces on [`EngineProbe::ping`].
    pub fn connect() -> Result<Self, BackendCommandError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            BackendCommandError::EngineUnreachable {
                reason: format!(
                    "{}\n\n\
                     Common causes:\n\
                     - Docker daemon not running (check: docker ps)\n\
                     - Current user not in the 'docker' group",
                    e
                ),
            }
        })?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl EngineProbe for DockerEngine {
    async fn ping(&self) -> Result<String, BackendCommandError> {
        self.docker
            .ping()
            .await
            .map_err(|e| BackendCommandError::EngineUnreachable {
                reason: e.to_string(),
            })?;

        let version = match self.docker.version().await {
            Ok(version) => version.version.unwrap_or_else(|| "unknown".to_string()),
            Err(e) => {
                debug!("Engine answered ping but not version: {}", e);
                "unknown".to_string()
            }
        };
        Ok(version)
    }
}
