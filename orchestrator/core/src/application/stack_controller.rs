// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Stack controller
//!
//! Thin pass-through to the compose backend. No retries here: a failed backend
//! call is fatal to whichever workflow issued it. Waiting for services lives in
//! the readiness prober.

use std::sync::Arc;
use tracing::info;

use crate::domain::backend::{BackendCommandError, ComposeBackend};

#[derive(Clone)]
pub struct StackController {
    backend: Arc<dyn ComposeBackend>,
}

impl StackController {
    pub fn new(backend: Arc<dyn ComposeBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Arc<dyn ComposeBackend> {
        self.backend.clone()
    }

    pub async fn pull(&self) -> Result<(), BackendCommandError> {
        info!("Pulling service images");
        self.backend.pull().await
    }

    pub async fn up(&self) -> Result<(), BackendCommandError> {
        info!("Starting services");
        self.backend.up().await
    }

    pub async fn down(&self) -> Result<(), BackendCommandError> {
        info!("Stopping services");
        self.backend.down().await
    }

    /// Pull, then start
    pub async fn deploy(&self) -> Result<(), BackendCommandError> {
        self.pull().await?;
        self.up().await
    }

    pub async fn ps(&self) -> Result<String, BackendCommandError> {
        self.backend.ps().await
    }

    pub async fn logs(&self, service: Option<&str>, follow: bool) -> Result<(), BackendCommandError> {
        self.backend.logs(service, follow).await
    }
}
