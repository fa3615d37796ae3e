//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with `thiserror`.
//!
//! Invalid policies and failed rules are not errors: they are reported as
//! validation issues and violations. The types here cover conditions a caller
//! cannot fix by editing a policy.

use thiserror::Error;

/// Top-level error type for the governance engine.
#[derive(Error, Debug)]
pub enum GovError {
    /// A document could not be loaded or parsed.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// A version identifier was malformed.
    #[error("version error: {0}")]
    Version(#[from] VersionError),

    /// A field path could not be resolved or written.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// An entry of a resources file is not a resource document.
    #[error("invalid resource #{index} in {path}: {reason}")]
    InvalidResource {
        /// File the resource was read from.
        path: String,
        /// Zero-based position within the file.
        index: usize,
        /// Decoding failure.
        reason: String,
    },
}

/// Errors while loading a serialized policy or resource document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read {path}: {reason}")]
    Read {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The file content is not valid YAML/JSON.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// Path of the malformed file.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The document parsed, but its top level has the wrong shape.
    #[error("{path} must contain {expected}")]
    UnexpectedShape {
        /// Path of the offending file.
        path: String,
        /// What the top level should have been.
        expected: &'static str,
    },

    /// The document could not be serialized.
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

/// Errors while parsing schema or API version identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Not a `MAJOR.MINOR.PATCH` triple (optionally prefixed with `v`).
    #[error("invalid schema version \"{0}\" (expected v<major>.<minor>.<patch>)")]
    InvalidSchemaVersion(String),

    /// Not a semantic version (`MAJOR.MINOR.PATCH[-prerelease][+build]`).
    #[error("invalid policy version \"{0}\" (expected <major>.<minor>.<patch>[-prerelease][+build])")]
    InvalidPolicyVersion(String),

    /// Not a `<namespace>/<version>` pair.
    #[error("invalid apiVersion \"{0}\" (expected <namespace>/<version>)")]
    InvalidApiVersion(String),
}

/// Errors while reading or writing a dotted field path in a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string is empty or has an empty segment.
    #[error("empty field path segment in \"{0}\"")]
    EmptySegment(String),

    /// An intermediate object along the path does not exist.
    #[error("parent of \"{0}\" does not exist")]
    MissingParent(String),

    /// An intermediate value along the path is not an object.
    #[error("\"{0}\" is not an object")]
    NotAnObject(String),
}
