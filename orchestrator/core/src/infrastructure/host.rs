// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::Path;

use crate::domain::platform::HostEnvironment;

/// The machine the orchestrator is running on
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl HostEnvironment for LocalHost {
    fn is_superuser(&self) -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::geteuid() == 0 }
        }

        #[cfg(not(unix))]
        {
            false
        }
    }

    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn path_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn current_user(&self) -> Option<String> {
        std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .ok()
            .filter(|user| !user.is_empty())
    }
}
