// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Configuration, value types and the seams (traits) the lifecycle workflows
//! are written against.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Host-independent types; no process, network or filesystem access

pub mod backend;
pub mod backup;
pub mod platform;
pub mod secrets;
pub mod service;
pub mod stack_config;
