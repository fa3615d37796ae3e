//! # Schema Errors
//!
//! Hard failures of the validator and migrator. Policy defects are never
//! reported here; they become [`ValidationIssue`](crate::ValidationIssue)s.

use gov_core::{DocumentError, SchemaVersion, VersionError};
use thiserror::Error;

/// Failures of file-level validation and layout setup.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The policy file could not be read or parsed.
    #[error("document load error: {0}")]
    DocumentLoad(#[from] DocumentError),

    /// An embedded field-layout schema failed to compile.
    #[error("layout schema for {version} failed to compile: {reason}")]
    LayoutCompile {
        /// Schema version whose layout is broken.
        version: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

/// Failures of the schema migrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// No chain of registered edges connects the two versions.
    #[error("no migration path from {from} to {to}")]
    NoMigrationPath {
        /// Source version.
        from: SchemaVersion,
        /// Requested target version.
        to: SchemaVersion,
    },

    /// A step's field operation could not be applied.
    #[error("migration step {from} -> {to} failed: {operation} on '{field}': {reason}")]
    TransformFailed {
        /// Source version of the failing step.
        from: SchemaVersion,
        /// Target version of the failing step.
        to: SchemaVersion,
        /// Operation kind (`rename`, `default`, `remove`).
        operation: String,
        /// Field path the operation addresses.
        field: String,
        /// What went wrong.
        reason: String,
    },

    /// The document does not declare a usable source version.
    #[error("cannot determine source schema version: {0}")]
    UnknownVersion(String),

    /// A version string in a request or table was malformed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The migration table could not be parsed.
    #[error("invalid migration table: {0}")]
    TableParse(String),

    /// The migration table parsed but is inconsistent.
    #[error("invalid migration table: {0}")]
    TableInvalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_message_names_both_versions() {
        let err = MigrationError::NoMigrationPath {
            from: SchemaVersion::new(1, 0, 0),
            to: SchemaVersion::new(2, 0, 0),
        };
        assert_eq!(err.to_string(), "no migration path from v1.0.0 to v2.0.0");
    }

    #[test]
    fn transform_failed_carries_step_and_field() {
        let err = MigrationError::TransformFailed {
            from: SchemaVersion::new(1, 0, 0),
            to: SchemaVersion::new(1, 1, 0),
            operation: "default".into(),
            field: "spec.enforcement".into(),
            reason: "parent 'spec' is missing".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("v1.0.0 -> v1.1.0"));
        assert!(msg.contains("spec.enforcement"));
    }
}
