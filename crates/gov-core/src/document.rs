//! # Document Loading
//!
//! Reads policy and resource documents from disk into `serde_json::Value`.
//! YAML is a superset of JSON, so both formats go through `serde_yaml`
//! unless the file extension says `.json`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::DocumentError;

/// Serialized document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl DocumentFormat {
    /// Infer the format from a file extension. Unknown extensions are YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    fn is_document(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        )
    }
}

/// Parse serialized content. `origin` is used in error messages only.
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<Value, DocumentError> {
    let parsed = match format {
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| DocumentError::Parse {
        path: origin.to_string(),
        reason,
    })
}

/// Load a document from a file.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_document(
        &content,
        DocumentFormat::from_path(path),
        &path.display().to_string(),
    )
}

/// Serialize a document in the given format.
pub fn render_document(value: &Value, format: DocumentFormat) -> Result<String, DocumentError> {
    match format {
        DocumentFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| DocumentError::Serialize(e.to_string()))
        }
        DocumentFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| DocumentError::Serialize(e.to_string()))
        }
    }
}

/// Collect document files under `root`, sorted.
///
/// A file path is returned as-is; a directory is walked recursively for
/// `*.yaml`, `*.yml`, and `*.json` files.
pub fn find_documents(root: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    if root.is_file() {
        results.push(root.to_path_buf());
        return results;
    }
    walk_for_documents(root, &mut results);
    results.sort();
    results
}

fn walk_for_documents(dir: &Path, acc: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "failed to read directory during document walk"
            );
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            walk_for_documents(&path, acc);
        } else if DocumentFormat::is_document(&path) {
            acc.push(path);
        }
    }
}
