//! # Resources
//!
//! A resource is the object a policy judges: a declared `type` matched
//! exactly against `spec.target.resourceType`, and a `properties` document
//! that rule conditions are evaluated against.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::load_document;
use crate::error::{DocumentError, GovError};

/// A resource submitted for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Caller-supplied identifier, echoed back in results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource type, e.g. `aws_s3_bucket`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// The document rule conditions are evaluated against.
    #[serde(default)]
    pub properties: Value,
}

impl Resource {
    /// Build a resource without an identifier.
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            id: None,
            resource_type: resource_type.into(),
            properties,
        }
    }

    /// Attach an identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Decode a raw resource document.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Load the resources in a YAML or JSON file.
///
/// The file holds a sequence of resource documents; a single mapping is
/// read as a sequence of one.
pub fn load_resources(path: &Path) -> Result<Vec<Resource>, GovError> {
    let items = match load_document(path)? {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(DocumentError::UnexpectedShape {
                path: path.display().to_string(),
                expected: "a sequence of resources",
            }
            .into())
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Resource::from_value(item).map_err(|e| GovError::InvalidResource {
                path: path.display().to_string(),
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}
