// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Hand-written fakes for the workflow seams

#![allow(dead_code)]

use async_trait::async_trait;
use obstack_core::domain::backend::{
    BackendCommandError, CommandOutput, CommandRunner, ComposeBackend, EngineProbe, HostCommand,
};
use obstack_core::domain::platform::HostEnvironment;
use obstack_core::domain::service::{HealthChecker, ManagedService};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

/// Records every verb; `exec` fails for services in `failing_exec`, and
/// `pull`/`up` fail when listed in `failing_verbs`
#[derive(Default)]
pub struct FakeCompose {
    pub failing_exec: HashSet<String>,
    pub failing_verbs: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCompose {
    pub fn failing_exec_for(service: &str) -> Self {
        Self {
            failing_exec: [service.to_string()].into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn failing_verb(verb: &str) -> Self {
        Self {
            failing_verbs: [verb.to_string()].into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, verb: &str) -> bool {
        self.calls().iter().any(|c| c == verb)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn verb(&self, verb: &str) -> Result<(), BackendCommandError> {
        self.record(verb.to_string());
        if self.failing_verbs.contains(verb) {
            return Err(BackendCommandError::Failed {
                command: format!("docker compose {}", verb),
                code: Some(1),
                stderr: "manifest unknown".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ComposeBackend for FakeCompose {
    async fn pull(&self) -> Result<(), BackendCommandError> {
        self.verb("pull")
    }

    async fn up(&self) -> Result<(), BackendCommandError> {
        self.verb("up")
    }

    async fn down(&self) -> Result<(), BackendCommandError> {
        self.record("down".to_string());
        Ok(())
    }

    async fn ps(&self) -> Result<String, BackendCommandError> {
        self.record("ps".to_string());
        Ok(String::new())
    }

    async fn exec(&self, service: &str, command: &[String]) -> Result<CommandOutput, BackendCommandError> {
        self.record(format!("exec {} {}", service, command.join(" ")));
        let failed = self.failing_exec.contains(service);
        Ok(CommandOutput {
            code: Some(if failed { 1 } else { 0 }),
            stdout: String::new(),
            stderr: if failed { "Code: 210. Connection refused".to_string() } else { String::new() },
        })
    }

    async fn logs(&self, service: Option<&str>, _follow: bool) -> Result<(), BackendCommandError> {
        self.record(format!("logs {}", service.unwrap_or("")));
        Ok(())
    }

    async fn copy_from_service(
        &self,
        service: &str,
        container_path: &str,
        host_path: &Path,
    ) -> Result<(), BackendCommandError> {
        self.record(format!("cp {}:{}", service, container_path));
        // Like `docker cp`: the destination's parent must already exist
        if !host_path.parent().is_some_and(Path::is_dir) {
            return Err(BackendCommandError::Failed {
                command: format!("cp {}:{}", service, container_path),
                code: Some(1),
                stderr: format!("lstat {}: no such file or directory", host_path.display()),
            });
        }
        std::fs::create_dir(host_path).map_err(|source| BackendCommandError::Io {
            command: "cp".to_string(),
            source,
        })?;
        Ok(())
    }

    async fn copy_to_service(
        &self,
        service: &str,
        _host_path: &Path,
        container_path: &str,
    ) -> Result<(), BackendCommandError> {
        self.record(format!("cp -> {}:{}", service, container_path));
        Ok(())
    }
}

/// Healthy from the given attempt on; services not listed never become healthy
#[derive(Default)]
pub struct ScriptedChecker {
    pub healthy_on: HashMap<String, u32>,
    pub calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedChecker {
    pub fn new(entries: &[(&str, u32)]) -> Self {
        Self {
            healthy_on: entries.iter().map(|(n, a)| (n.to_string(), *a)).collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, name: &str) -> u32 {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthChecker for ScriptedChecker {
    async fn check(&self, service: &ManagedService) -> bool {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(service.name.clone()).or_insert(0);
        *count += 1;
        self.healthy_on
            .get(&service.name)
            .is_some_and(|on| *count >= *on)
    }
}

pub struct FakeEngine {
    pub reachable: bool,
    pub pings: Mutex<u32>,
}

impl FakeEngine {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable,
            pings: Mutex::new(0),
        }
    }

    pub fn pings(&self) -> u32 {
        *self.pings.lock().unwrap()
    }
}

#[async_trait]
impl EngineProbe for FakeEngine {
    async fn ping(&self) -> Result<String, BackendCommandError> {
        *self.pings.lock().unwrap() += 1;
        if self.reachable {
            Ok("27.3.1".to_string())
        } else {
            Err(BackendCommandError::EngineUnreachable {
                reason: "connection refused".to_string(),
            })
        }
    }
}

pub struct FakeHost {
    pub has_docker: bool,
}

impl HostEnvironment for FakeHost {
    fn is_superuser(&self) -> bool {
        false
    }

    fn has_program(&self, program: &str) -> bool {
        program == "docker" && self.has_docker
    }

    fn path_exists(&self, path: &str) -> bool {
        path == "/etc/debian_version"
    }

    fn current_user(&self) -> Option<String> {
        Some("ops".to_string())
    }
}

/// Every host command succeeds
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &HostCommand) -> Result<CommandOutput, BackendCommandError> {
        self.calls.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }

    async fn run_attached(&self, command: &HostCommand) -> Result<(), BackendCommandError> {
        self.calls.lock().unwrap().push(command.to_string());
        Ok(())
    }
}
