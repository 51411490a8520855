// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Managed services and readiness results
//!
//! A [`ManagedService`] is one backend component of the stack (collector, store,
//! dashboard) together with the health check that decides whether it can accept
//! traffic. Services are defined once from configuration and never mutated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How a service is probed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthCheck {
    /// Run a trivial query through the service's native client inside its
    /// container. Any zero exit is healthy.
    CliQuery { command: Vec<String> },

    /// GET the URL. Any 2xx is healthy.
    HttpHealth { url: String },
}

impl HealthCheck {
    pub fn target(&self) -> String {
        match self {
            HealthCheck::CliQuery { command } => command.join(" "),
            HealthCheck::HttpHealth { url } => url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedService {
    /// Compose service name
    pub name: String,

    pub health_check: HealthCheck,

    /// Upper bound on health checks before the service is declared timed out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between consecutive failed checks
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Checked after an update
    #[serde(default = "default_true")]
    pub critical: bool,

    /// Operator-facing URL printed in the deploy summary (`{host}` is replaced
    /// with the discovered public address)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
}

fn default_max_attempts() -> u32 {
    30
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_true() -> bool {
    true
}

impl ManagedService {
    pub fn new(name: impl Into<String>, health_check: HealthCheck) -> Self {
        Self {
            name: name.into(),
            health_check,
            max_attempts: default_max_attempts(),
            poll_interval: default_poll_interval(),
            critical: true,
            display_url: None,
        }
    }

    pub fn with_attempts(mut self, max_attempts: u32, poll_interval: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.poll_interval = poll_interval;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessOutcome {
    Ready,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub service_name: String,
    pub outcome: ReadinessOutcome,
    pub attempts_used: u32,
}

impl ReadinessResult {
    pub fn is_ready(&self) -> bool {
        self.outcome == ReadinessOutcome::Ready
    }
}

/// Results of probing a set of services, in probe order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub results: Vec<ReadinessResult>,
}

impl ReadinessReport {
    pub fn get(&self, service_name: &str) -> Option<&ReadinessResult> {
        self.results.iter().find(|r| r.service_name == service_name)
    }

    pub fn all_ready(&self) -> bool {
        self.results.iter().all(ReadinessResult::is_ready)
    }

    pub fn timed_out(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_ready())
            .map(|r| r.service_name.clone())
            .collect()
    }

    /// Fail when any service timed out
    pub fn into_result(self) -> Result<Self, ReadinessTimeoutError> {
        let services = self.timed_out();
        if services.is_empty() {
            Ok(self)
        } else {
            Err(ReadinessTimeoutError { services })
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Services did not become ready: {}", .services.join(", "))]
pub struct ReadinessTimeoutError {
    pub services: Vec<String>,
}

/// Result of a single-shot health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Ok,
    Failed,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Ok => write!(f, "OK"),
            CheckOutcome::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub service_name: String,
    pub outcome: CheckOutcome,
}

/// Performs one health check against a service
///
/// Implementations must not distinguish failure causes: a refused connection,
/// a timeout and a 503 are all just "not healthy yet".
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check(&self, service: &ManagedService) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_yaml_shape() {
        let yaml = r#"
name: grafana
health_check:
  kind: http_health
  url: http://localhost:3000/api/health
max_attempts: 5
poll_interval: 500ms
"#;
        let service: ManagedService = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(service.max_attempts, 5);
        assert_eq!(service.poll_interval, Duration::from_millis(500));
        assert!(service.critical);
        assert_eq!(
            service.health_check,
            HealthCheck::HttpHealth {
                url: "http://localhost:3000/api/health".to_string()
            }
        );
    }

    #[test]
    fn test_report_collects_timeouts() {
        let report = ReadinessReport {
            results: vec![
                ReadinessResult {
                    service_name: "clickhouse".to_string(),
                    outcome: ReadinessOutcome::Ready,
                    attempts_used: 2,
                },
                ReadinessResult {
                    service_name: "grafana".to_string(),
                    outcome: ReadinessOutcome::TimedOut,
                    attempts_used: 30,
                },
            ],
        };

        assert!(!report.all_ready());
        assert_eq!(report.timed_out(), vec!["grafana"]);
        assert_eq!(report.get("clickhouse").unwrap().attempts_used, 2);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.services, vec!["grafana"]);
        assert!(err.to_string().contains("grafana"));
    }
}
