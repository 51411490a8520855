// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host platform detection and runtime installation strategies
//!
//! Installation is driven by a strategy table: a detected [`Platform`] maps to an
//! [`InstallPlan`], which is an ordered list of plain [`HostCommand`]s. Nothing in
//! this module touches the host, so plans can be asserted on in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::backend::{BackendCommandError, HostCommand};

/// Marker file identifying the Debian family (Debian, Ubuntu, ...)
pub const DEBIAN_MARKER: &str = "/etc/debian_version";

/// Marker file identifying the RedHat family (RHEL, CentOS, Fedora, ...)
pub const REDHAT_MARKER: &str = "/etc/redhat-release";

/// Vendor convenience script used on unrecognised hosts
pub const VENDOR_INSTALL_SCRIPT_URL: &str = "https://get.docker.com";

const VENDOR_INSTALL_SCRIPT_PATH: &str = "/tmp/get-docker.sh";

/// Signing key for Docker's apt repository
pub const DOCKER_APT_KEYRING: &str = "/etc/apt/keyrings/docker.asc";

/// apt source entry for Docker's repository. `docker-compose-plugin` is only
/// published there, not in the stock Debian/Ubuntu archives.
pub const DOCKER_APT_SOURCE: &str = "/etc/apt/sources.list.d/docker.list";

/// Fetches the key and writes the source entry for the host's distribution
/// (`$ID` is debian or ubuntu, `$VERSION_CODENAME` the release).
const DOCKER_APT_REPO_SCRIPT: &str = concat!(
    ". /etc/os-release && ",
    "curl -fsSL https://download.docker.com/linux/$ID/gpg -o /etc/apt/keyrings/docker.asc && ",
    "chmod a+r /etc/apt/keyrings/docker.asc && ",
    "echo \"deb [arch=$(dpkg --print-architecture) signed-by=/etc/apt/keyrings/docker.asc] ",
    "https://download.docker.com/linux/$ID $VERSION_CODENAME stable\" ",
    "> /etc/apt/sources.list.d/docker.list"
);

/// Group granting access to the container runtime socket
pub const RUNTIME_GROUP: &str = "docker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Debian,
    RedHat,
    Generic,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Debian => write!(f, "debian"),
            Platform::RedHat => write!(f, "redhat"),
            Platform::Generic => write!(f, "generic"),
        }
    }
}

/// Read-only view of the host the installer runs on
pub trait HostEnvironment: Send + Sync {
    /// Effective user is root
    fn is_superuser(&self) -> bool;

    /// Executable is resolvable on PATH
    fn has_program(&self, program: &str) -> bool;

    fn path_exists(&self, path: &str) -> bool;

    /// Login name of the invoking user
    fn current_user(&self) -> Option<String>;
}

impl Platform {
    /// Marker probes are mutually exclusive and checked in a fixed order
    pub fn detect(host: &dyn HostEnvironment) -> Self {
        if host.path_exists(DEBIAN_MARKER) {
            Platform::Debian
        } else if host.path_exists(REDHAT_MARKER) {
            Platform::RedHat
        } else {
            Platform::Generic
        }
    }
}

/// Ordered commands installing the runtime (or just the compose plugin)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub platform: Platform,
    pub steps: Vec<HostCommand>,
}

fn sudo<I, S>(args: I) -> HostCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    HostCommand::new("sudo").args(args)
}

/// Registers Docker's apt repository and refreshes the package index
fn docker_apt_repository() -> Vec<HostCommand> {
    vec![
        sudo(["apt-get", "update"]),
        sudo(["apt-get", "install", "-y", "ca-certificates", "curl"]),
        sudo(["install", "-m", "0755", "-d", "/etc/apt/keyrings"]),
        sudo(["sh", "-c", DOCKER_APT_REPO_SCRIPT]),
        sudo(["apt-get", "update"]),
    ]
}

impl InstallPlan {
    /// Full runtime installation, ending with group membership for `user`
    pub fn runtime(platform: Platform, user: &str) -> Self {
        let mut steps = match platform {
            Platform::Debian => {
                let mut steps = docker_apt_repository();
                steps.push(sudo([
                    "apt-get",
                    "install",
                    "-y",
                    "docker-ce",
                    "docker-ce-cli",
                    "containerd.io",
                    "docker-compose-plugin",
                ]));
                steps.push(sudo(["systemctl", "enable", "--now", "docker"]));
                steps
            }
            Platform::RedHat => vec![
                sudo(["dnf", "-y", "install", "dnf-plugins-core"]),
                sudo([
                    "dnf",
                    "config-manager",
                    "--add-repo",
                    "https://download.docker.com/linux/centos/docker-ce.repo",
                ]),
                sudo([
                    "dnf",
                    "-y",
                    "install",
                    "docker-ce",
                    "docker-ce-cli",
                    "containerd.io",
                    "docker-compose-plugin",
                ]),
                sudo(["systemctl", "enable", "--now", "docker"]),
            ],
            Platform::Generic => vec![
                HostCommand::new("curl").args([
                    "-fsSL",
                    VENDOR_INSTALL_SCRIPT_URL,
                    "-o",
                    VENDOR_INSTALL_SCRIPT_PATH,
                ]),
                sudo(["sh", VENDOR_INSTALL_SCRIPT_PATH]),
            ],
        };

        steps.push(sudo(["usermod", "-aG", RUNTIME_GROUP, user]));

        Self { platform, steps }
    }

    /// Compose plugin only. `None` when the platform has no packaged plugin.
    pub fn compose_plugin(platform: Platform) -> Option<Self> {
        let steps = match platform {
            Platform::Debian => {
                let mut steps = docker_apt_repository();
                steps.push(sudo(["apt-get", "install", "-y", "docker-compose-plugin"]));
                steps
            }
            Platform::RedHat => vec![sudo(["dnf", "-y", "install", "docker-compose-plugin"])],
            Platform::Generic => return None,
        };
        Some(Self { platform, steps })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeStatus {
    /// Runtime and compose tooling were already installed
    AlreadyPresent,
    /// Runtime was installed; the session must be restarted to pick up group membership
    InstalledNeedsRelogin,
    /// Runtime existed, the compose plugin was installed
    ComposePluginInstalled,
}

#[derive(Debug, Error)]
pub enum PrerequisiteError {
    #[error("Do not run as root. Run as a regular user with sudo rights; root-owned stack files break later runs.")]
    RunningAsRoot,

    #[error("Cannot determine the invoking user (USER/LOGNAME unset)")]
    UnknownUser,

    #[error("Docker Compose is unavailable and no packaged plugin exists for platform '{0}'. Install it manually: https://docs.docker.com/compose/install/")]
    ComposeUnavailable(Platform),

    #[error("Installation step '{step}' failed: {source}")]
    InstallStepFailed {
        step: String,
        #[source]
        source: BackendCommandError,
    },
}
