//! # Field Layouts
//!
//! Each schema version has a JSON Schema (Draft 2020-12) describing the
//! parts of the document whose shape differs between versions: which of
//! `metadata.labels` / `metadata.tags` is allowed, and the types of the
//! optional descriptive fields. Required fields and the mapping/sequence
//! shape of `metadata`, `spec` and `spec.rules` are not repeated here; the
//! validator checks them directly so each defect is reported once.
//!
//! Layouts are embedded at build time and compiled once per validator.

use std::collections::BTreeMap;
use std::fmt;

use gov_core::SchemaVersion;
use jsonschema::Validator;
use serde_json::Value;

use crate::error::SchemaError;

/// Schema version `v1.0.0`: `metadata.labels`.
pub const V1_0_0: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Schema version `v1.1.0`: `metadata.tags`, `spec.enforcement` defaulted.
pub const V1_1_0: SchemaVersion = SchemaVersion::new(1, 1, 0);

const BUILTIN_LAYOUTS: &[(SchemaVersion, &str)] = &[
    (V1_0_0, include_str!("../schemas/policy-v1.0.0.schema.json")),
    (V1_1_0, include_str!("../schemas/policy-v1.1.0.schema.json")),
];

/// One field that does not fit the version's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutViolation {
    /// Dotted location of the offending field, empty for the root.
    pub path: String,
    /// Diagnostic from the schema validator.
    pub message: String,
}

/// Compiled layouts keyed by schema version.
pub struct LayoutRegistry {
    layouts: BTreeMap<SchemaVersion, Validator>,
}

impl LayoutRegistry {
    /// Compile the embedded layouts.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut layouts = BTreeMap::new();
        for (version, source) in BUILTIN_LAYOUTS {
            let schema: Value =
                serde_json::from_str(source).map_err(|e| SchemaError::LayoutCompile {
                    version: version.to_string(),
                    reason: format!("invalid JSON: {e}"),
                })?;
            layouts.insert(*version, compile(*version, &schema)?);
        }
        Ok(Self { layouts })
    }

    /// Whether a layout exists for `version`.
    pub fn supports(&self, version: &SchemaVersion) -> bool {
        self.layouts.contains_key(version)
    }

    /// Versions with a layout, ascending.
    pub fn versions(&self) -> Vec<SchemaVersion> {
        self.layouts.keys().copied().collect()
    }

    /// Check `document` against the layout for `version`.
    ///
    /// Returns `None` when no layout is registered for `version`.
    pub fn check(&self, version: &SchemaVersion, document: &Value) -> Option<Vec<LayoutViolation>> {
        let validator = self.layouts.get(version)?;
        let violations = validator
            .iter_errors(document)
            .map(|err| LayoutViolation {
                path: pointer_to_dotted(&err.instance_path.to_string()),
                message: err.to_string(),
            })
            .collect();
        Some(violations)
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

fn compile(version: SchemaVersion, schema: &Value) -> Result<Validator, SchemaError> {
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft202012)
        .build(schema)
        .map_err(|e| SchemaError::LayoutCompile {
            version: version.to_string(),
            reason: e.to_string(),
        })
}

/// `/spec/rules/0/message` becomes `spec.rules[0].message`.
fn pointer_to_dotted(pointer: &str) -> String {
    let mut out = String::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            out.push('[');
            out.push_str(&token);
            out.push(']');
        } else {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(&token);
        }
    }
    out
}
