// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Readiness prober
//!
//! Per-service state machine:
//!
//! ```text
//! POLLING --check ok--> READY
//! POLLING --max_attempts failures--> TIMED_OUT
//! ```
//!
//! Checks are separated by the service's `poll_interval`; there is no pause after
//! the final attempt. Services are probed one after another and independently:
//! a timeout on one never cuts short probing of the rest, so the operator sees
//! the full picture.

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::service::{
    CheckOutcome, HealthChecker, ManagedService, ReadinessOutcome, ReadinessReport,
    ReadinessResult, ServiceCheck,
};

#[derive(Clone)]
pub struct ReadinessProber {
    checker: Arc<dyn HealthChecker>,
}

impl ReadinessProber {
    pub fn new(checker: Arc<dyn HealthChecker>) -> Self {
        Self { checker }
    }

    /// Poll until the first successful check or `max_attempts` failures
    pub async fn wait_for(&self, service: &ManagedService) -> ReadinessResult {
        info!(
            "Waiting for {} ({}, up to {} attempts)",
            service.name,
            service.health_check.target(),
            service.max_attempts
        );

        for attempt in 1..=service.max_attempts {
            if self.checker.check(service).await {
                info!("{} is ready after {} attempt(s)", service.name, attempt);
                return ReadinessResult {
                    service_name: service.name.clone(),
                    outcome: ReadinessOutcome::Ready,
                    attempts_used: attempt,
                };
            }

            debug!("{} not ready (attempt {}/{})", service.name, attempt, service.max_attempts);
            if attempt < service.max_attempts {
                sleep(service.poll_interval).await;
            }
        }

        warn!("{} did not become ready within {} attempts", service.name, service.max_attempts);
        ReadinessResult {
            service_name: service.name.clone(),
            outcome: ReadinessOutcome::TimedOut,
            attempts_used: service.max_attempts,
        }
    }

    /// Probe every service to completion, in order
    pub async fn wait_for_all(&self, services: &[ManagedService]) -> ReadinessReport {
        let mut report = ReadinessReport::default();
        for service in services {
            report.results.push(self.wait_for(service).await);
        }
        report
    }

    /// Single health check, no retry
    pub async fn check_once(&self, service: &ManagedService) -> ServiceCheck {
        let outcome = if self.checker.check(service).await {
            CheckOutcome::Ok
        } else {
            CheckOutcome::Failed
        };
        debug!("{} single-shot check: {}", service.name, outcome);
        ServiceCheck {
            service_name: service.name.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::HealthCheck;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Becomes healthy on the given attempt (never when `None`)
    struct ScriptedChecker {
        healthy_on: HashMap<String, Option<u32>>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedChecker {
        fn new(entries: &[(&str, Option<u32>)]) -> Self {
            Self {
                healthy_on: entries.iter().map(|(n, a)| (n.to_string(), *a)).collect(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls(&self, name: &str) -> u32 {
            self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl HealthChecker for ScriptedChecker {
        async fn check(&self, service: &ManagedService) -> bool {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(service.name.clone()).or_insert(0);
            *count += 1;
            match self.healthy_on.get(&service.name).copied().flatten() {
                Some(on) => *count >= on,
                None => false,
            }
        }
    }

    fn service(name: &str, attempts: u32) -> ManagedService {
        ManagedService::new(
            name,
            HealthCheck::HttpHealth {
                url: format!("http://localhost/{}", name),
            },
        )
        .with_attempts(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_ready_on_first_success() {
        let checker = Arc::new(ScriptedChecker::new(&[("grafana", Some(3))]));
        let prober = ReadinessProber::new(checker.clone());

        let result = prober.wait_for(&service("grafana", 10)).await;
        assert_eq!(result.outcome, ReadinessOutcome::Ready);
        assert_eq!(result.attempts_used, 3);
        assert_eq!(checker.calls("grafana"), 3);
    }

    #[tokio::test]
    async fn test_times_out_after_exactly_max_attempts() {
        for max in [1, 4, 7] {
            let checker = Arc::new(ScriptedChecker::new(&[("clickhouse", None)]));
            let prober = ReadinessProber::new(checker.clone());

            let result = prober.wait_for(&service("clickhouse", max)).await;
            assert_eq!(result.outcome, ReadinessOutcome::TimedOut);
            assert_eq!(result.attempts_used, max);
            assert_eq!(checker.calls("clickhouse"), max);
        }
    }

    #[tokio::test]
    async fn test_success_on_last_attempt_is_ready() {
        let checker = Arc::new(ScriptedChecker::new(&[("otel-collector", Some(5))]));
        let prober = ReadinessProber::new(checker.clone());

        let result = prober.wait_for(&service("otel-collector", 5)).await;
        assert!(result.is_ready());
        assert_eq!(checker.calls("otel-collector"), 5);
    }

    #[tokio::test]
    async fn test_wait_for_all_probes_every_service() {
        let checker = Arc::new(ScriptedChecker::new(&[
            ("broken", None),
            ("healthy", Some(1)),
        ]));
        let prober = ReadinessProber::new(checker.clone());

        // The failing service comes first and must not short-circuit the second
        let report = prober
            .wait_for_all(&[service("broken", 3), service("healthy", 3)])
            .await;

        assert_eq!(report.get("broken").unwrap().outcome, ReadinessOutcome::TimedOut);
        assert_eq!(report.get("healthy").unwrap().outcome, ReadinessOutcome::Ready);
        assert_eq!(checker.calls("broken"), 3);
        assert_eq!(checker.calls("healthy"), 1);
        assert_eq!(report.timed_out(), vec!["broken"]);
    }

    #[tokio::test]
    async fn test_check_once_does_not_retry() {
        let checker = Arc::new(ScriptedChecker::new(&[("grafana", Some(2))]));
        let prober = ReadinessProber::new(checker.clone());

        let check = prober.check_once(&service("grafana", 30)).await;
        assert_eq!(check.outcome, CheckOutcome::Failed);
        assert_eq!(checker.calls("grafana"), 1);
    }
}
