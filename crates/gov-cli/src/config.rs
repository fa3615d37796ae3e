//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! namespace: governance
//! default_schema_version: v1.0.0
//! migrations_file: config/migrations.yaml
//! workers: 8
//! ```
//!
//! Every field is optional. A relative `migrations_file` is resolved
//! against the directory containing the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use gov_core::{SchemaVersion, DEFAULT_NAMESPACE};
use gov_schema::{MigrationTable, PolicyValidator, SchemaMigrator, V1_0_0};
use serde::Deserialize;

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovConfig {
    /// Expected `apiVersion` namespace.
    pub namespace: String,
    /// Schema version used when neither the flag nor the document names one.
    pub default_schema_version: SchemaVersion,
    /// Migration table to load instead of the built-in one.
    pub migrations_file: Option<PathBuf>,
    /// Worker threads for batch evaluation.
    pub workers: Option<usize>,
}

impl Default for GovConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_schema_version: V1_0_0,
            migrations_file: None,
            workers: None,
        }
    }
}

impl GovConfig {
    /// Load `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        if let (Some(file), Some(dir)) = (&config.migrations_file, path.parent()) {
            if file.is_relative() {
                config.migrations_file = Some(dir.join(file));
            }
        }
        tracing::debug!(config = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// A validator honouring the configured namespace and default version.
    pub fn validator(&self) -> Result<PolicyValidator> {
        Ok(PolicyValidator::new()
            .context("failed to compile field-layout schemas")?
            .with_namespace(self.namespace.clone())
            .with_default_version(self.default_schema_version))
    }

    /// A migrator over the configured or built-in table.
    pub fn migrator(&self) -> Result<SchemaMigrator> {
        let table = match &self.migrations_file {
            Some(path) => MigrationTable::load(path)
                .with_context(|| format!("failed to load migration table {}", path.display()))?,
            None => MigrationTable::builtin().context("built-in migration table is invalid")?,
        };
        Ok(SchemaMigrator::with_table(Arc::new(table)))
    }

    /// Worker count for batch evaluation: configured, else available
    /// parallelism, else 1.
    pub fn workers(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = GovConfig::load(None).unwrap();
        assert_eq!(config, GovConfig::default());
        assert_eq!(config.namespace, "governance");
        assert!(config.workers() >= 1);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("govern.yaml");
        std::fs::write(&path, "namespace: acme\nworkers: 3\n").unwrap();
        let config = GovConfig::load(Some(&path)).unwrap();
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.workers(), 3);
        assert_eq!(config.default_schema_version, V1_0_0);
        assert_eq!(config.validator().unwrap().namespace(), "acme");
    }

    #[test]
    fn relative_migrations_file_resolves_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("table.yaml"),
            "migrations:\n  - {from: v1.0.0, to: v3.0.0}\n",
        )
        .unwrap();
        let path = dir.path().join("govern.yaml");
        std::fs::write(&path, "migrations_file: table.yaml\n").unwrap();

        let config = GovConfig::load(Some(&path)).unwrap();
        assert_eq!(config.migrations_file, Some(dir.path().join("table.yaml")));
        let migrator = config.migrator().unwrap();
        assert_eq!(
            migrator.latest_version(),
            Some(SchemaVersion::new(3, 0, 0))
        );
    }

    #[test]
    fn unknown_keys_and_bad_versions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("govern.yaml");
        std::fs::write(&path, "namespaces: typo\n").unwrap();
        assert!(GovConfig::load(Some(&path)).is_err());
        std::fs::write(&path, "default_schema_version: latest\n").unwrap();
        assert!(GovConfig::load(Some(&path)).is_err());
        assert!(GovConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
