// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod prerequisites;
pub mod secret_provisioner;
pub mod stack_controller;
pub mod readiness;
pub mod backup_manager;
pub mod update;
pub mod deploy;

// Re-export use cases for convenience
pub use backup_manager::BackupManager;
pub use deploy::{DeployError, DeployOptions, DeployReport, DeployWorkflow};
pub use prerequisites::PrerequisiteInstaller;
pub use readiness::ReadinessProber;
pub use secret_provisioner::{generate_secret, SecretProvisioner};
pub use stack_controller::StackController;
pub use update::{UpdateError, UpdateOrchestrator, UpdateReport};
