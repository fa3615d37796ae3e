//! # gov-schema — Policy Validation & Schema Migration
//!
//! ## Validation (`validate`)
//!
//! [`PolicyValidator`] checks a raw policy document against a target schema
//! version and returns every issue it finds, ordered by check phase:
//! structural, referential, enumeration, best practice. Only
//! [`IssueSeverity::Error`] issues make a policy invalid.
//!
//! Rule conditions are compiled through an injected
//! [`ConditionCompiler`](gov_condition::ConditionCompiler), so the validator
//! reports exactly the syntax errors the rules engine would hit.
//!
//! ## Field Layouts (`layout`)
//!
//! Per-version JSON Schemas (Draft 2020-12) for the parts of the document
//! that differ between versions, compiled once with `jsonschema`.
//!
//! ## Migration (`migrate`)
//!
//! [`SchemaMigrator`] resolves a chain of edges through a data-driven
//! [`MigrationTable`] and applies their field operations to a copy of the
//! document. Migration is all-or-nothing.
//!
//! ## Crate Policy
//!
//! - Depends on `gov-core` and `gov-condition` internally.
//! - Invalid policies are reported as issues, never as `Err`.
//! - Migration tables are immutable once loaded.

pub mod error;
pub mod layout;
pub mod migrate;
pub mod validate;

pub use error::{MigrationError, SchemaError};
pub use layout::{LayoutRegistry, LayoutViolation, V1_0_0, V1_1_0};
pub use migrate::{FieldOperation, MigrationStep, MigrationTable, SchemaMigrator};
pub use validate::{
    declared_version, DirectoryValidationReport, FileReport, FileValidationResult, IssueSeverity,
    PolicyValidator, ValidationIssue, ValidationReport,
};
