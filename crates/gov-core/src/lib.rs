#![deny(missing_docs)]

//! # gov-core — Foundational Types for the Governance Policy Engine
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies; externally it uses `serde`,
//! `serde_json`, `serde_yaml`, `thiserror` and `tracing`.
//!
//! ## Design Principles
//!
//! 1. **Versions are parsed, not compared as strings.** [`SchemaVersion`]
//!    normalizes `1.0.0` and `v1.0.0` to the same value, and [`ApiVersion`]
//!    splits `governance/v1.0.0` into namespace and version.
//!
//! 2. **Raw documents stay raw until validated.** The validator and migrator
//!    operate on `serde_json::Value` so partial or malformed input can be
//!    reported field by field. Only the rules engine decodes into the typed
//!    [`Policy`] view.
//!
//! 3. **[`GovError`] hierarchy.** Structured errors with `thiserror`. No
//!    `Box<dyn Error>` in public APIs.

pub mod document;
pub mod error;
pub mod path;
pub mod policy;
pub mod resource;
pub mod version;

// Re-export primary types at crate root for ergonomic imports.
pub use document::{find_documents, load_document, parse_document, render_document, DocumentFormat};
pub use error::{DocumentError, GovError, PathError, VersionError};
pub use policy::{Enforcement, Policy, PolicyMetadata, PolicySeverity, PolicySpec, Rule, Target};
pub use resource::{load_resources, Resource};
pub use version::{ApiVersion, PolicyVersion, SchemaVersion};

/// The `kind` every policy document must declare.
pub const POLICY_KIND: &str = "Policy";

/// The `apiVersion` namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "governance";
