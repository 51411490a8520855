// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! obstack core
//!
//! Deployment lifecycle orchestration for the observability stack: runtime
//! prerequisites, secret provisioning, compose control, readiness probing,
//! backups and updates.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Workflows in `application`, seams in `domain`, host adapters in `infrastructure`

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
