// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Stack Configuration Types
//
// Defines the configuration schema for an obstack deployment, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Stack directory and compose invocation
// - Secret placeholders and their substitution targets
// - Managed services and their health checks
// - Backup artifacts, exports and retention
// - Update settle delay, public address discovery, telemetry environment
//
// The manifest is loaded once at entry and handed to every component
// constructor; nothing below the CLI reads the process environment.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::backup::{BackupConfig, ExportMethod, RetentionPolicy, ServiceExport};
use crate::domain::secrets::{SecretSpec, SecretTarget};
use crate::domain::service::{HealthCheck, ManagedService};

pub const API_VERSION: &str = "obstack.io/v1";
pub const KIND: &str = "StackConfig";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "OBSTACK_CONFIG_PATH";

/// Top-level Kubernetes-style stack configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfigManifest {
    /// API version (must be "obstack.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "StackConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: StackConfigSpec,
}

pub type StackConfig = StackConfigManifest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfigSpec {
    /// Directory holding the compose descriptor and service configs
    #[serde(default = "default_stack_dir")]
    pub stack_dir: PathBuf,

    #[serde(default)]
    pub compose: ComposeConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub services: Vec<ManagedService>,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// argv prefix invoking compose (`docker compose` or legacy `docker-compose`)
    #[serde(default = "default_compose_command")]
    pub command: Vec<String>,

    /// Compose descriptor, relative to the stack directory
    #[serde(default = "default_compose_file")]
    pub file: PathBuf,

    /// Compose project name
    #[serde(default = "default_project")]
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Credentials record, relative to the stack directory
    #[serde(default = "default_secrets_record")]
    pub record: PathBuf,

    #[serde(default)]
    pub specs: Vec<SecretSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Pause between `up` and the post-update checks
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Cloud metadata endpoint returning the public IPv4 address
    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,

    #[serde(default = "default_public_ip_timeout", with = "humantime_serde")]
    pub public_ip_timeout: Duration,
}

/// Telemetry environment handed to instrumented agents. Reported in the deploy
/// summary; the orchestrator itself does not export to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_http_endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default = "default_service_version")]
    pub service_version: String,

    #[serde(default = "default_environment")]
    pub environment: String,
}

// Default value functions
fn default_stack_dir() -> PathBuf {
    PathBuf::from("./observability-stack")
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yaml")
}

fn default_project() -> String {
    "obstack".to_string()
}

fn default_secrets_record() -> PathBuf {
    PathBuf::from(".credentials")
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_public_ip_url() -> String {
    "http://169.254.169.254/latest/meta-data/public-ipv4".to_string()
}

fn default_public_ip_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4318".to_string()
}

fn default_service_version() -> String {
    "1.0.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Placeholder shipped in the scaffolded artifacts for the store password
pub const CLICKHOUSE_PASSWORD_PLACEHOLDER: &str = "__CLICKHOUSE_PASSWORD__";

/// Placeholder shipped in the scaffolded artifacts for the dashboard admin password
pub const GRAFANA_PASSWORD_PLACEHOLDER: &str = "__GRAFANA_ADMIN_PASSWORD__";

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            command: default_compose_command(),
            file: default_compose_file(),
            project: default_project(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            record: default_secrets_record(),
            specs: vec![],
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            settle_delay: default_settle_delay(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            public_ip_url: default_public_ip_url(),
            public_ip_timeout: default_public_ip_timeout(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_http_endpoint: default_otlp_endpoint(),
            service_name: None,
            service_version: default_service_version(),
            environment: default_environment(),
        }
    }
}

impl Default for StackConfigSpec {
    /// The collector / store / dashboard stack scaffolded by `obstack init`
    fn default() -> Self {
        let compose_file = default_compose_file();

        let secrets = SecretsConfig {
            record: default_secrets_record(),
            specs: vec![
                SecretSpec {
                    name: "CLICKHOUSE_PASSWORD".to_string(),
                    placeholder: CLICKHOUSE_PASSWORD_PLACEHOLDER.to_string(),
                    targets: vec![
                        SecretTarget::new(compose_file.clone()),
                        SecretTarget::with_pattern(
                            "otel-collector-config.yaml",
                            format!("password: {}", CLICKHOUSE_PASSWORD_PLACEHOLDER),
                        ),
                        SecretTarget::new("grafana/provisioning/datasources/clickhouse.yaml"),
                    ],
                },
                SecretSpec {
                    name: "GRAFANA_ADMIN_PASSWORD".to_string(),
                    placeholder: GRAFANA_PASSWORD_PLACEHOLDER.to_string(),
                    targets: vec![SecretTarget::with_pattern(
                        compose_file.clone(),
                        format!("GF_SECURITY_ADMIN_PASSWORD={}", GRAFANA_PASSWORD_PLACEHOLDER),
                    )],
                },
            ],
        };

        let services = vec![
            ManagedService {
                display_url: Some("http://{host}:4318 (OTLP HTTP), {host}:4317 (OTLP gRPC)".to_string()),
                ..ManagedService::new(
                    "otel-collector",
                    HealthCheck::HttpHealth {
                        url: "http://localhost:13133/".to_string(),
                    },
                )
            },
            ManagedService::new(
                "clickhouse",
                HealthCheck::CliQuery {
                    command: vec![
                        "clickhouse-client".to_string(),
                        "--query".to_string(),
                        "SELECT 1".to_string(),
                    ],
                },
            ),
            ManagedService {
                display_url: Some("http://{host}:3000".to_string()),
                ..ManagedService::new(
                    "grafana",
                    HealthCheck::HttpHealth {
                        url: "http://localhost:3000/api/health".to_string(),
                    },
                )
            },
        ];

        let backup = BackupConfig {
            root: PathBuf::from("backups"),
            artifacts: vec![
                compose_file,
                default_secrets_record(),
                PathBuf::from("otel-collector-config.yaml"),
                PathBuf::from("clickhouse"),
                PathBuf::from("grafana"),
            ],
            exports: vec![
                ServiceExport {
                    service: "clickhouse".to_string(),
                    method: ExportMethod::NativeBackup {
                        command: vec![
                            "clickhouse-client".to_string(),
                            "--query".to_string(),
                            "BACKUP DATABASE otel TO Disk('backups', '{snapshot_id}.zip')".to_string(),
                        ],
                        container_path: "/var/lib/clickhouse/backups/{snapshot_id}.zip".to_string(),
                        restore_command: Some(vec![
                            "clickhouse-client".to_string(),
                            "--query".to_string(),
                            "RESTORE DATABASE otel FROM Disk('backups', '{snapshot_id}.zip') SETTINGS allow_non_empty_tables=true".to_string(),
                        ]),
                    },
                },
                ServiceExport {
                    service: "grafana".to_string(),
                    method: ExportMethod::CopyOut {
                        container_path: "/var/lib/grafana".to_string(),
                    },
                },
            ],
            retention: RetentionPolicy::MaxAgeDays(7),
        };

        Self {
            stack_dir: default_stack_dir(),
            compose: ComposeConfig::default(),
            secrets,
            services,
            backup,
            update: UpdateConfig::default(),
            network: NetworkConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for StackConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "obstack".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: StackConfigSpec::default(),
        }
    }
}

impl StackConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. OBSTACK_CONFIG_PATH environment variable
    /// 2. ./obstack-config.yaml (working directory)
    /// 3. ~/.obstack/config.yaml (user home)
    /// 4. /etc/obstack/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./obstack-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".obstack").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/obstack/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::info!("No configuration file found in standard locations. Using built-in defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("OBSTACK_STACK_DIR") {
            tracing::info!("Environment override: OBSTACK_STACK_DIR={}", dir);
            self.spec.stack_dir = PathBuf::from(dir);
        }

        let telemetry = &mut self.spec.telemetry;
        if let Some(endpoint) = lookup("OTLP_HTTP_ENDPOINT") {
            telemetry.otlp_http_endpoint = endpoint;
        }
        if let Some(name) = lookup("SERVICE_NAME") {
            telemetry.service_name = Some(name);
        }
        if let Some(version) = lookup("SERVICE_VERSION") {
            telemetry.service_version = version;
        }
        if let Some(environment) = lookup("ENVIRONMENT") {
            telemetry.environment = environment;
        }
    }

    /// Resolve a path relative to the stack directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.spec.stack_dir.join(path)
        }
    }

    pub fn compose_file(&self) -> PathBuf {
        self.resolve(&self.spec.compose.file)
    }

    pub fn secrets_record(&self) -> PathBuf {
        self.resolve(&self.spec.secrets.record)
    }

    pub fn backup_root(&self) -> PathBuf {
        self.resolve(&self.spec.backup.root)
    }

    pub fn service(&self, name: &str) -> Option<&ManagedService> {
        self.spec.services.iter().find(|s| s.name == name)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.compose.command.is_empty() {
            anyhow::bail!("spec.compose.command cannot be empty");
        }

        if self.spec.services.is_empty() {
            anyhow::bail!("spec.services must declare at least one service");
        }

        let mut names = HashSet::new();
        for service in &self.spec.services {
            if service.name.is_empty() {
                anyhow::bail!("Service name cannot be empty");
            }
            if !names.insert(service.name.as_str()) {
                anyhow::bail!("Duplicate service name: {}", service.name);
            }
            if service.max_attempts == 0 {
                anyhow::bail!("Service '{}': max_attempts must be at least 1", service.name);
            }
            if let HealthCheck::CliQuery { command } = &service.health_check {
                if command.is_empty() {
                    anyhow::bail!("Service '{}': cli_query command cannot be empty", service.name);
                }
            }
        }

        for spec in &self.spec.secrets.specs {
            if spec.name.is_empty() || spec.placeholder.is_empty() {
                anyhow::bail!("Secret specs need a name and a placeholder");
            }
            for target in &spec.targets {
                let pattern = target.search_pattern(&spec.placeholder);
                if !pattern.contains(&spec.placeholder) {
                    anyhow::bail!(
                        "Secret '{}': pattern '{}' for {} does not contain placeholder '{}'",
                        spec.name,
                        pattern,
                        target.file.display(),
                        spec.placeholder
                    );
                }
            }
        }

        for export in &self.spec.backup.exports {
            if !names.contains(export.service.as_str()) {
                anyhow::bail!("Backup export names unknown service '{}'", export.service);
            }
        }

        match self.spec.backup.retention {
            RetentionPolicy::MaxAgeDays(0) | RetentionPolicy::KeepLatest(0) => {
                anyhow::bail!("Backup retention must keep at least one day / one snapshot");
            }
            _ => {}
        }

        Ok(())
    }
}
