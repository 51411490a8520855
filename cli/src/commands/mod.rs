// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the obstack CLI

pub mod backup;
pub mod config;
pub mod deploy;
pub mod init;
pub mod install;
pub mod logs;
pub mod status;
pub mod stop;
pub mod update;

pub use self::backup::BackupCommand;
pub use self::config::ConfigCommand;
