//! # Policy Documents
//!
//! Typed view of a policy document, used once a document has passed
//! validation. Severity values stay strings on the typed view because
//! unrecognized values are advisory, not fatal; [`PolicySeverity::parse`]
//! resolves the recognized ones.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recognized severity levels for policies and rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PolicySeverity {
    /// Informational finding.
    Low,
    /// Default level when nothing is declared.
    #[default]
    Medium,
    /// Should block in most pipelines.
    High,
    /// Must block.
    Critical,
}

impl PolicySeverity {
    /// All recognized severities, lowest first.
    pub const ALL: [PolicySeverity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Resolve a recognized severity string (case-sensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for PolicySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a policy's failures block (`enforce`) or only report (`audit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Failures block the deployment.
    #[default]
    Enforce,
    /// Failures are reported only.
    Audit,
}

impl Enforcement {
    /// Resolve a recognized enforcement string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "enforce" => Some(Self::Enforce),
            "audit" => Some(Self::Audit),
            _ => None,
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Audit => "audit",
        }
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy document after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Declared `apiVersion`, e.g. `governance/v1.1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Document kind; always `Policy` for validated documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Identity and descriptive fields.
    pub metadata: PolicyMetadata,
    /// Target and rules.
    pub spec: PolicySpec,
}

impl Policy {
    /// Decode a raw document into the typed view.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// The policy's identity in the rules engine registry.
    pub fn id(&self) -> &str {
        &self.metadata.name
    }

    /// The resource type this policy applies to.
    pub fn resource_type(&self) -> &str {
        &self.spec.target.resource_type
    }

    /// Effective enforcement mode; absent means `enforce`.
    pub fn enforcement(&self) -> Enforcement {
        self.spec.enforcement.unwrap_or_default()
    }

    /// Severity a violation of `rule` carries: the rule's own recognized
    /// severity, else the policy's, else [`PolicySeverity::Medium`].
    pub fn effective_severity(&self, rule: &Rule) -> PolicySeverity {
        rule.severity
            .as_deref()
            .and_then(PolicySeverity::parse)
            .or_else(|| {
                self.metadata
                    .severity
                    .as_deref()
                    .and_then(PolicySeverity::parse)
            })
            .unwrap_or_default()
    }
}

/// `metadata` section of a policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyMetadata {
    /// Unique policy name; the registry identity.
    pub name: String,
    /// Policy content version (semver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared severity (may be unrecognized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Labels as used by schema `v1.0.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Tags as used by schema `v1.1.0` and later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl PolicyMetadata {
    /// Tags regardless of which schema version named them.
    pub fn tags(&self) -> Option<&BTreeMap<String, String>> {
        self.tags.as_ref().or(self.labels.as_ref())
    }
}

/// `spec` section of a policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicySpec {
    /// What kind of resource the policy applies to.
    pub target: Target,
    /// Ordered rules.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Enforcement mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<Enforcement>,
}

/// `spec.target` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Resource type matched exactly against `resource.type`.
    pub resource_type: String,
}

/// A single named condition within a policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Name, unique within the policy.
    pub name: String,
    /// JSONPath condition evaluated against the resource properties.
    pub condition: String,
    /// Violation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Declared severity (may be unrecognized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}
