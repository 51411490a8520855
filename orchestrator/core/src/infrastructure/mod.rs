// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod compose;
pub mod engine;
pub mod health;
pub mod host;
pub mod process;
pub mod public_ip;

pub use compose::DockerComposeBackend;
pub use engine::DockerEngine;
pub use health::StackHealthChecker;
pub use host::LocalHost;
pub use process::TokioCommandRunner;
pub use public_ip::discover_public_ip;
