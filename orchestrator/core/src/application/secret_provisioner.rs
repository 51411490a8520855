// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Secret provisioner
//!
//! Generates one credential per [`SecretSpec`] and substitutes it into every
//! target artifact. Provisioning is all-or-nothing: substitutions are staged in
//! memory and nothing touches disk until every spec has found its placeholder.
//! The credentials record is written last with owner-only permissions.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::secrets::{
    ProvisionedSecret, ProvisionedSecrets, SecretError, SecretSpec, SecretsRecord,
};

/// Length of every generated secret
pub const SECRET_LENGTH: usize = 25;

/// Characters dropped from the base64 alphabet so values embed safely in
/// shell, YAML and URLs
const UNSAFE_CHARS: [char; 3] = ['=', '+', '/'];

/// Generate a random credential: 32 bytes from the thread CSPRNG, base64
/// encoded, unsafe characters stripped, truncated to [`SECRET_LENGTH`].
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let value: String = STANDARD
            .encode(bytes)
            .chars()
            .filter(|c| !UNSAFE_CHARS.contains(c))
            .take(SECRET_LENGTH)
            .collect();
        if value.len() == SECRET_LENGTH {
            return value;
        }
    }
}

pub struct SecretProvisioner {
    stack_dir: PathBuf,
    record_path: PathBuf,
}

impl SecretProvisioner {
    /// `record_path` and relative target paths resolve against `stack_dir`
    pub fn new(stack_dir: impl Into<PathBuf>, record_path: impl Into<PathBuf>) -> Self {
        let stack_dir = stack_dir.into();
        let record_path = record_path.into();
        let record_path = if record_path.is_absolute() {
            record_path
        } else {
            stack_dir.join(record_path)
        };
        Self {
            stack_dir,
            record_path,
        }
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// A record exists from an earlier run
    pub fn is_provisioned(&self) -> bool {
        self.record_path.exists()
    }

    pub fn load_record(&self) -> Result<SecretsRecord, SecretError> {
        let content = std::fs::read_to_string(&self.record_path).map_err(|source| SecretError::Io {
            path: self.record_path.clone(),
            source,
        })?;
        SecretsRecord::parse(&content)
    }

    pub fn provision(&self, specs: &[SecretSpec], now: DateTime<Utc>) -> Result<ProvisionedSecrets, SecretError> {
        self.provision_with(specs, now, generate_secret)
    }

    /// Same as [`provision`](Self::provision) with a caller-supplied generator
    pub fn provision_with(
        &self,
        specs: &[SecretSpec],
        now: DateTime<Utc>,
        mut generate: impl FnMut() -> String,
    ) -> Result<ProvisionedSecrets, SecretError> {
        // Path → rewritten content, in first-touched order
        let mut staged: BTreeMap<PathBuf, String> = BTreeMap::new();
        let mut order: Vec<PathBuf> = Vec::new();
        let mut secrets = Vec::with_capacity(specs.len());

        for spec in specs {
            let value = generate();

            for target in &spec.targets {
                let pattern = target.search_pattern(&spec.placeholder);
                if !pattern.contains(&spec.placeholder) {
                    return Err(SecretError::PatternWithoutPlaceholder {
                        name: spec.name.clone(),
                        pattern: pattern.to_string(),
                        placeholder: spec.placeholder.clone(),
                    });
                }

                let path = self.resolve(&target.file);
                let content = match staged.entry(path.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let content = std::fs::read_to_string(&path).map_err(|source| SecretError::Io {
                            path: path.clone(),
                            source,
                        })?;
                        order.push(path.clone());
                        entry.insert(content)
                    }
                };

                if !content.contains(pattern) {
                    return Err(SecretError::PlaceholderNotFound {
                        artifact: path,
                        pattern: pattern.to_string(),
                    });
                }
                let replacement = pattern.replace(&spec.placeholder, &value);
                *content = content.replace(pattern, &replacement);
            }

            secrets.push(ProvisionedSecret {
                name: spec.name.clone(),
                value,
            });
        }

        for path in &order {
            std::fs::write(path, &staged[path]).map_err(|source| SecretError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Injected secrets into {}", path.display());
        }

        let provisioned = ProvisionedSecrets {
            generated_at: now,
            secrets,
            record_path: self.record_path.clone(),
        };
        self.write_record(&SecretsRecord::from_provisioned(&provisioned))?;
        info!(
            "Provisioned {} secrets, record written to {}",
            provisioned.secrets.len(),
            self.record_path.display()
        );

        Ok(provisioned)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.stack_dir.join(path)
        }
    }

    fn write_record(&self, record: &SecretsRecord) -> Result<(), SecretError> {
        let io_err = |source| SecretError::Io {
            path: self.record_path.clone(),
            source,
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.record_path).map_err(io_err)?;
        // mode() only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        file.write_all(record.render().as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::secrets::SecretTarget;
    use tempfile::TempDir;

    fn specs() -> Vec<SecretSpec> {
        vec![
            SecretSpec {
                name: "CLICKHOUSE_PASSWORD".to_string(),
                placeholder: "__CH__".to_string(),
                targets: vec![
                    SecretTarget::new("docker-compose.yaml"),
                    SecretTarget::with_pattern("collector.yaml", "password: __CH__"),
                ],
            },
            SecretSpec {
                name: "GRAFANA_ADMIN_PASSWORD".to_string(),
                placeholder: "__GF__".to_string(),
                targets: vec![SecretTarget::with_pattern(
                    "docker-compose.yaml",
                    "GF_SECURITY_ADMIN_PASSWORD=__GF__",
                )],
            },
        ]
    }

    fn scaffold(dir: &Path) {
        std::fs::write(
            dir.join("docker-compose.yaml"),
            "CLICKHOUSE_PASSWORD=__CH__\nCH_PW=__CH__\nGF_SECURITY_ADMIN_PASSWORD=__GF__\n",
        )
        .unwrap();
        std::fs::write(dir.join("collector.yaml"), "user: default\npassword: __CH__\n").unwrap();
    }

    #[test]
    fn test_generated_secret_shape() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), SECRET_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_provision_substitutes_and_records() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let provisioner = SecretProvisioner::new(dir.path(), ".credentials");
        assert!(!provisioner.is_provisioned());

        let mut values = vec!["gfsecret".to_string(), "chsecret".to_string()];
        let provisioned = provisioner
            .provision_with(&specs(), Utc::now(), || values.pop().unwrap())
            .unwrap();

        assert_eq!(provisioned.get("CLICKHOUSE_PASSWORD"), Some("chsecret"));
        assert_eq!(provisioned.get("GRAFANA_ADMIN_PASSWORD"), Some("gfsecret"));

        let compose = std::fs::read_to_string(dir.path().join("docker-compose.yaml")).unwrap();
        assert_eq!(
            compose,
            "CLICKHOUSE_PASSWORD=chsecret\nCH_PW=chsecret\nGF_SECURITY_ADMIN_PASSWORD=gfsecret\n"
        );
        let collector = std::fs::read_to_string(dir.path().join("collector.yaml")).unwrap();
        assert!(collector.contains("password: chsecret"));

        assert!(provisioner.is_provisioned());
        let record = provisioner.load_record().unwrap();
        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.entries["GRAFANA_ADMIN_PASSWORD"], "gfsecret");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(provisioner.record_path())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_missing_placeholder_writes_nothing() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        // Second spec's marker has already been replaced by hand
        std::fs::write(
            dir.path().join("docker-compose.yaml"),
            "CLICKHOUSE_PASSWORD=__CH__\nGF_SECURITY_ADMIN_PASSWORD=admin\n",
        )
        .unwrap();

        let provisioner = SecretProvisioner::new(dir.path(), ".credentials");
        let err = provisioner.provision(&specs(), Utc::now()).unwrap_err();

        match err {
            SecretError::PlaceholderNotFound { artifact, pattern } => {
                assert!(artifact.ends_with("docker-compose.yaml"));
                assert_eq!(pattern, "GF_SECURITY_ADMIN_PASSWORD=__GF__");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(!provisioner.is_provisioned());
        let compose = std::fs::read_to_string(dir.path().join("docker-compose.yaml")).unwrap();
        assert!(compose.contains("__CH__"));
        let collector = std::fs::read_to_string(dir.path().join("collector.yaml")).unwrap();
        assert!(collector.contains("__CH__"));
    }

    #[test]
    fn test_second_run_fails_on_consumed_placeholders() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path());
        let provisioner = SecretProvisioner::new(dir.path(), ".credentials");

        provisioner.provision(&specs(), Utc::now()).unwrap();
        let first = provisioner.load_record().unwrap();

        let err = provisioner.provision(&specs(), Utc::now()).unwrap_err();
        assert!(matches!(err, SecretError::PlaceholderNotFound { .. }));
        assert_eq!(provisioner.load_record().unwrap(), first);
    }

    #[test]
    fn test_missing_artifact_is_io_error() {
        let dir = TempDir::new().unwrap();
        let provisioner = SecretProvisioner::new(dir.path(), ".credentials");
        let err = provisioner.provision(&specs(), Utc::now()).unwrap_err();
        assert!(matches!(err, SecretError::Io { .. }));
        assert!(!provisioner.is_provisioned());
    }
}
