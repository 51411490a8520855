// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Secret specifications and the persisted credentials record
//!
//! A [`SecretSpec`] names a placeholder token and every configuration artifact
//! it must be substituted into. Generated values live in [`ProvisionedSecrets`]
//! until the record is written; the record is the only durable copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One substitution target inside a configuration artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTarget {
    /// Artifact path, relative to the stack directory
    pub file: PathBuf,

    /// Literal text that must be present in the file. It is replaced by itself
    /// with the placeholder swapped for the generated value. Defaults to the
    /// placeholder token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SecretTarget {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            pattern: None,
        }
    }

    pub fn with_pattern(file: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            pattern: Some(pattern.into()),
        }
    }

    pub fn search_pattern<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.pattern.as_deref().unwrap_or(placeholder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    /// Record key, e.g. `CLICKHOUSE_PASSWORD`
    pub name: String,

    /// Marker shipped in the scaffolded artifacts
    pub placeholder: String,

    /// Substitution targets, applied in order
    pub targets: Vec<SecretTarget>,
}

/// A generated secret value. `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionedSecret {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for ProvisionedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedSecret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Output of a successful provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionedSecrets {
    pub generated_at: DateTime<Utc>,
    pub secrets: Vec<ProvisionedSecret>,
    pub record_path: PathBuf,
}

impl ProvisionedSecrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.secrets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value.as_str())
    }
}

/// The persisted credentials record (`KEY=value` lines)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretsRecord {
    pub generated_at: DateTime<Utc>,
    pub entries: BTreeMap<String, String>,
}

const GENERATED_AT_KEY: &str = "GENERATED_AT";

impl SecretsRecord {
    pub fn from_provisioned(provisioned: &ProvisionedSecrets) -> Self {
        Self {
            generated_at: provisioned.generated_at,
            entries: provisioned
                .secrets
                .iter()
                .map(|s| (s.name.clone(), s.value.clone()))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# obstack credentials. Keep this file private (mode 0600).\n");
        out.push_str(&format!(
            "{}={}\n",
            GENERATED_AT_KEY,
            self.generated_at.to_rfc3339()
        ));
        for (name, value) in &self.entries {
            out.push_str(&format!("{}={}\n", name, value));
        }
        out
    }

    pub fn parse(content: &str) -> Result<Self, SecretError> {
        let mut generated_at = None;
        let mut entries = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| SecretError::MalformedRecord(format!("expected KEY=value, got '{}'", line)))?;

            if key == GENERATED_AT_KEY {
                let parsed = DateTime::parse_from_rfc3339(value)
                    .map_err(|e| SecretError::MalformedRecord(format!("bad {}: {}", GENERATED_AT_KEY, e)))?;
                generated_at = Some(parsed.with_timezone(&Utc));
            } else {
                entries.insert(key.to_string(), value.to_string());
            }
        }

        let generated_at = generated_at
            .ok_or_else(|| SecretError::MalformedRecord(format!("missing {}", GENERATED_AT_KEY)))?;

        Ok(Self {
            generated_at,
            entries,
        })
    }
}

impl fmt::Debug for SecretsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsRecord")
            .field("generated_at", &self.generated_at)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Placeholder not found: '{pattern}' is missing from {}. Refusing to continue; the service would boot with a default credential.", .artifact.display())]
    PlaceholderNotFound { artifact: PathBuf, pattern: String },

    #[error("Secret '{name}': pattern '{pattern}' does not contain placeholder '{placeholder}'")]
    PatternWithoutPlaceholder {
        name: String,
        pattern: String,
        placeholder: String,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed secrets record: {0}")]
    MalformedRecord(String),
}
