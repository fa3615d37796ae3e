//! # Schema Migration
//!
//! Moves policy documents between schema versions. The migration graph is
//! data: a [`MigrationTable`] of edges `from -> to`, each carrying an
//! ordered list of [`FieldOperation`]s. The built-in table lives in
//! `config/migrations.yaml`; callers may load their own.
//!
//! ## Path Resolution
//!
//! The route between two versions is the shortest chain of registered
//! edges (breadth-first, neighbours visited in ascending version order, so
//! the choice is deterministic). `from == to` is only a route when an
//! identity edge is registered for that version.
//!
//! ## Failure Semantics
//!
//! Every step works on its own copy of the document. If any operation
//! fails the caller gets a [`MigrationError`] and no document at all.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use gov_core::{path, ApiVersion, SchemaVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MigrationError;
use crate::validate::declared_version;

const BUILTIN_TABLE: &str = include_str!("../config/migrations.yaml");

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A single field operation within a migration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum FieldOperation {
    /// Move a field. Absent sources are skipped unless `required`.
    Rename {
        /// Dotted source path.
        from: String,
        /// Dotted destination path; must not already exist.
        to: String,
        /// Fail the step when the source is absent.
        #[serde(default)]
        required: bool,
    },
    /// Set a field only when it is absent.
    #[serde(rename = "default")]
    SetDefault {
        /// Dotted path.
        field: String,
        /// Value to inject.
        value: Value,
    },
    /// Introduce a field that must not exist yet.
    Add {
        /// Dotted path.
        field: String,
        /// Value to insert.
        value: Value,
    },
    /// Drop a field if present.
    Remove {
        /// Dotted path.
        field: String,
    },
}

impl FieldOperation {
    /// Operation name as written in the table.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rename { .. } => "rename",
            Self::SetDefault { .. } => "default",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
        }
    }

    fn paths(&self) -> Vec<&str> {
        match self {
            Self::Rename { from, to, .. } => vec![from.as_str(), to.as_str()],
            Self::SetDefault { field, .. } | Self::Add { field, .. } | Self::Remove { field } => {
                vec![field.as_str()]
            }
        }
    }
}

/// One edge of the migration graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Source version.
    pub from: SchemaVersion,
    /// Target version.
    pub to: SchemaVersion,
    /// Operations, applied in order.
    #[serde(default)]
    pub operations: Vec<FieldOperation>,
}

impl MigrationStep {
    /// Whether this edge maps a version to itself.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Deserialize)]
struct TableFile {
    migrations: Vec<MigrationStep>,
}

/// The immutable set of registered migration edges.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationTable {
    steps: Vec<MigrationStep>,
}

impl MigrationTable {
    /// The table shipped with this crate.
    pub fn builtin() -> Result<Self, MigrationError> {
        Self::from_yaml(BUILTIN_TABLE)
    }

    /// Parse a table from YAML (or JSON).
    pub fn from_yaml(content: &str) -> Result<Self, MigrationError> {
        let file: TableFile =
            serde_yaml::from_str(content).map_err(|e| MigrationError::TableParse(e.to_string()))?;
        Self::from_steps(file.migrations)
    }

    /// Load a table file from disk.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::TableParse(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Build a table from steps, rejecting inconsistent ones.
    pub fn from_steps(steps: Vec<MigrationStep>) -> Result<Self, MigrationError> {
        let mut edges = HashSet::new();
        for step in &steps {
            if !edges.insert((step.from, step.to)) {
                return Err(MigrationError::TableInvalid(format!(
                    "edge {} -> {} is registered more than once",
                    step.from, step.to
                )));
            }
            for op in &step.operations {
                for p in op.paths() {
                    path::segments(p).map_err(|e| {
                        MigrationError::TableInvalid(format!(
                            "edge {} -> {}: {e}",
                            step.from, step.to
                        ))
                    })?;
                }
                if let FieldOperation::Rename { from, to, .. } = op {
                    if from == to {
                        return Err(MigrationError::TableInvalid(format!(
                            "edge {} -> {}: rename of '{from}' onto itself",
                            step.from, step.to
                        )));
                    }
                }
            }
        }
        Ok(Self { steps })
    }

    /// All registered edges, in table order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// The edge `from -> to`, if registered.
    pub fn edge(&self, from: SchemaVersion, to: SchemaVersion) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.from == from && s.to == to)
    }
}

// ---------------------------------------------------------------------------
// Migrator
// ---------------------------------------------------------------------------

/// Applies migration chains resolved from a [`MigrationTable`].
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    table: Arc<MigrationTable>,
    /// Non-identity edges by source version, targets ascending.
    adjacency: BTreeMap<SchemaVersion, Vec<usize>>,
}

impl SchemaMigrator {
    /// A migrator over the built-in table.
    pub fn new() -> Result<Self, MigrationError> {
        Ok(Self::with_table(Arc::new(MigrationTable::builtin()?)))
    }

    /// A migrator over an explicit table.
    pub fn with_table(table: Arc<MigrationTable>) -> Self {
        let mut adjacency: BTreeMap<SchemaVersion, Vec<usize>> = BTreeMap::new();
        for (idx, step) in table.steps().iter().enumerate() {
            if !step.is_identity() {
                adjacency.entry(step.from).or_default().push(idx);
            }
        }
        for targets in adjacency.values_mut() {
            targets.sort_by_key(|&i| table.steps()[i].to);
        }
        Self { table, adjacency }
    }

    /// The table this migrator resolves routes from.
    pub fn table(&self) -> &MigrationTable {
        &self.table
    }

    /// Every version named by the table, ascending.
    pub fn known_versions(&self) -> Vec<SchemaVersion> {
        let versions: BTreeSet<SchemaVersion> = self
            .table
            .steps()
            .iter()
            .flat_map(|s| [s.from, s.to])
            .collect();
        versions.into_iter().collect()
    }

    /// The newest version the table knows.
    pub fn latest_version(&self) -> Option<SchemaVersion> {
        self.known_versions().last().copied()
    }

    /// Resolve the chain of edges from `from` to `to`.
    pub fn migration_path(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> Result<Vec<&MigrationStep>, MigrationError> {
        let no_path = || MigrationError::NoMigrationPath { from, to };
        let steps = self.table.steps();

        if from == to {
            return self.table.edge(from, to).map(|s| vec![s]).ok_or_else(no_path);
        }

        let mut came_from: HashMap<SchemaVersion, usize> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(version) = queue.pop_front() {
            if version == to {
                break;
            }
            for &idx in self.adjacency.get(&version).into_iter().flatten() {
                let next = steps[idx].to;
                if next != from && !came_from.contains_key(&next) {
                    came_from.insert(next, idx);
                    queue.push_back(next);
                }
            }
        }

        let mut chain = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let idx = *came_from.get(&cursor).ok_or_else(no_path)?;
            chain.push(&steps[idx]);
            cursor = steps[idx].from;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Migrate `document` from `from` to `to`.
    ///
    /// The input is never modified. On failure no partial document is
    /// returned.
    pub fn migrate(
        &self,
        document: &Value,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> Result<Value, MigrationError> {
        let chain = self.migration_path(from, to)?;
        let mut current = document.clone();
        for step in chain {
            current = apply_step(step, &current)?;
            tracing::debug!(
                from = %step.from,
                to = %step.to,
                operations = step.operations.len(),
                "migration step applied"
            );
        }
        Ok(current)
    }

    /// Migrate `document` from its declared `apiVersion` to the newest
    /// known version. Returns the document and the version it now has.
    pub fn migrate_to_latest(
        &self,
        document: &Value,
    ) -> Result<(Value, SchemaVersion), MigrationError> {
        let from = declared_version(document).ok_or_else(|| {
            MigrationError::UnknownVersion("document has no parseable apiVersion".to_string())
        })?;
        let latest = self
            .latest_version()
            .ok_or_else(|| MigrationError::UnknownVersion("migration table is empty".into()))?;
        let migrated = self.migrate(document, from, latest)?;
        Ok((migrated, latest))
    }
}

fn apply_step(step: &MigrationStep, input: &Value) -> Result<Value, MigrationError> {
    let mut doc = input.clone();
    for op in &step.operations {
        apply_operation(op, &mut doc).map_err(|(field, reason)| MigrationError::TransformFailed {
            from: step.from,
            to: step.to,
            operation: op.kind().to_string(),
            field,
            reason,
        })?;
    }
    if let Some(api) = doc
        .get("apiVersion")
        .and_then(Value::as_str)
        .and_then(|raw| ApiVersion::parse(raw).ok())
    {
        doc["apiVersion"] = Value::String(ApiVersion::new(api.namespace, step.to).to_string());
    }
    Ok(doc)
}

/// Apply one operation in place. Errors carry the offending field.
fn apply_operation(op: &FieldOperation, doc: &mut Value) -> Result<(), (String, String)> {
    let fail = |field: &str, reason: String| (field.to_string(), reason);
    match op {
        FieldOperation::Rename { from, to, required } => {
            if path::exists(doc, to) {
                return Err(fail(to, "destination field already exists".into()));
            }
            match path::remove(doc, from).map_err(|e| fail(from, e.to_string()))? {
                Some(value) => {
                    path::insert(doc, to, value).map_err(|e| fail(to, e.to_string()))?;
                }
                None if *required => {
                    return Err(fail(from, "required field is missing and has no default".into()));
                }
                None => {}
            }
        }
        FieldOperation::SetDefault { field, value } => {
            if !path::exists(doc, field) {
                path::insert(doc, field, value.clone()).map_err(|e| fail(field, e.to_string()))?;
            }
        }
        FieldOperation::Add { field, value } => {
            if path::exists(doc, field) {
                return Err(fail(field, "field already exists".into()));
            }
            path::insert(doc, field, value.clone()).map_err(|e| fail(field, e.to_string()))?;
        }
        FieldOperation::Remove { field } => {
            path::remove(doc, field).map_err(|e| fail(field, e.to_string()))?;
        }
    }
    Ok(())
}
