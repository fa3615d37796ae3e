//! # Evaluation Results
//!
//! Results carry no timestamps or other ambient state, so the same resource
//! against the same registry always produces an equal result.

use gov_core::{Enforcement, PolicySeverity};
use serde::{Deserialize, Serialize};

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Policy the rule belongs to.
    pub policy_id: String,
    /// The failing rule.
    pub rule_name: String,
    /// The rule's message, or a generated one when the rule has none.
    pub message: String,
    /// Effective severity of the rule.
    pub severity: PolicySeverity,
    /// Enforcement mode of the policy.
    pub enforcement: Enforcement,
    /// Set when the condition could not be compiled or evaluated, rather
    /// than evaluating to `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of evaluating one resource against every matching policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The resource's `id`, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// The resource's `type`.
    pub resource_type: String,
    /// True iff `violations` is empty.
    pub passed: bool,
    /// Violations in policy id order, then rule order.
    pub violations: Vec<Violation>,
    /// Number of policies whose target matched the resource type.
    pub policies_evaluated: usize,
}

impl EvaluationResult {
    /// Whether any violation comes from a policy in `enforce` mode.
    pub fn is_blocking(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.enforcement == Enforcement::Enforce)
    }

    /// Violations at or above `severity`.
    pub fn violations_at_least(&self, severity: PolicySeverity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity >= severity)
    }
}
