// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::backend::ComposeBackend;
use crate::domain::service::{HealthCheck, HealthChecker, ManagedService};

/// Per-request timeout for HTTP health endpoints
pub const HTTP_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs HTTP checks with reqwest and CLI queries through `compose exec`
pub struct StackHealthChecker {
    http: reqwest::Client,
    backend: Arc<dyn ComposeBackend>,
}

impl StackHealthChecker {
    pub fn new(backend: Arc<dyn ComposeBackend>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_CHECK_TIMEOUT)
            .build()?;
        Ok(Self { http, backend })
    }
}

#[async_trait]
impl HealthChecker for StackHealthChecker {
    async fn check(&self, service: &ManagedService) -> bool {
        match &service.health_check {
            HealthCheck::HttpHealth { url } => match self.http.get(url).send().await {
                Ok(response) => {
                    debug!("{} health endpoint answered {}", service.name, response.status());
                    response.status().is_success()
                }
                Err(e) => {
                    debug!("{} health endpoint unreachable: {}", service.name, e);
                    false
                }
            },
            HealthCheck::CliQuery { command } => {
                match self.backend.exec(&service.name, command).await {
                    Ok(output) => output.success(),
                    Err(e) => {
                        debug!("{} query could not run: {}", service.name, e);
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::{BackendCommandError, CommandOutput};
    use std::path::Path;

    struct ExecOnly {
        exit: i32,
    }

    #[async_trait]
    impl ComposeBackend for ExecOnly {
        async fn pull(&self) -> Result<(), BackendCommandError> {
            Ok(())
        }
        async fn up(&self) -> Result<(), BackendCommandError> {
            Ok(())
        }
        async fn down(&self) -> Result<(), BackendCommandError> {
            Ok(())
        }
        async fn ps(&self) -> Result<String, BackendCommandError> {
            Ok(String::new())
        }
        async fn exec(&self, _service: &str, _command: &[String]) -> Result<CommandOutput, BackendCommandError> {
            Ok(CommandOutput {
                code: Some(self.exit),
                ..Default::default()
            })
        }
        async fn logs(&self, _service: Option<&str>, _follow: bool) -> Result<(), BackendCommandError> {
            Ok(())
        }
        async fn copy_from_service(&self, _: &str, _: &str, _: &Path) -> Result<(), BackendCommandError> {
            Ok(())
        }
        async fn copy_to_service(&self, _: &str, _: &Path, _: &str) -> Result<(), BackendCommandError> {
            Ok(())
        }
    }

    fn http_service(url: String) -> ManagedService {
        ManagedService::new("grafana", HealthCheck::HttpHealth { url })
    }

    #[tokio::test]
    async fn test_http_2xx_is_healthy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_body(r#"{"database":"ok"}"#)
            .create_async()
            .await;

        let checker = StackHealthChecker::new(Arc::new(ExecOnly { exit: 0 })).unwrap();
        assert!(checker.check(&http_service(format!("{}/api/health", server.url()))).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_503_is_not_healthy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/health")
            .with_status(503)
            .create_async()
            .await;

        let checker = StackHealthChecker::new(Arc::new(ExecOnly { exit: 0 })).unwrap();
        assert!(!checker.check(&http_service(format!("{}/api/health", server.url()))).await);
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_healthy() {
        let checker = StackHealthChecker::new(Arc::new(ExecOnly { exit: 0 })).unwrap();
        assert!(!checker.check(&http_service("http://127.0.0.1:1/".to_string())).await);
    }

    #[tokio::test]
    async fn test_cli_query_uses_exit_code() {
        let service = ManagedService::new(
            "clickhouse",
            HealthCheck::CliQuery {
                command: vec!["clickhouse-client".to_string()],
            },
        );
        let healthy = StackHealthChecker::new(Arc::new(ExecOnly { exit: 0 })).unwrap();
        let failing = StackHealthChecker::new(Arc::new(ExecOnly { exit: 210 })).unwrap();
        assert!(healthy.check(&service).await);
        assert!(!failing.check(&service).await);
    }
}
