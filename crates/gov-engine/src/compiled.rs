//! # Compiled Policies
//!
//! A registered policy with every rule condition compiled once. A condition
//! that fails to compile is kept as its error and reported as a violation
//! on every evaluation, so a broken rule is never silently skipped.

use std::sync::Arc;

use gov_condition::{CompileError, ConditionCompiler, Predicate};
use gov_core::{Enforcement, Policy, PolicySeverity, Rule};
use serde_json::Value;

use crate::result::Violation;

/// A rule ready for evaluation.
#[derive(Debug)]
pub struct CompiledRule {
    name: String,
    message: Option<String>,
    severity: PolicySeverity,
    predicate: Result<Arc<dyn Predicate>, CompileError>,
}

impl CompiledRule {
    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective severity.
    pub fn severity(&self) -> PolicySeverity {
        self.severity
    }

    /// The compile error, if the condition did not compile.
    pub fn compile_error(&self) -> Option<&CompileError> {
        self.predicate.as_ref().err()
    }
}

/// A policy as stored in the registry.
#[derive(Debug)]
pub struct CompiledPolicy {
    policy: Policy,
    rules: Vec<CompiledRule>,
}

impl CompiledPolicy {
    /// Compile every rule of `policy`.
    pub fn compile(policy: Policy, compiler: &dyn ConditionCompiler) -> Self {
        let rules = policy
            .spec
            .rules
            .iter()
            .map(|rule| compile_rule(&policy, rule, compiler))
            .collect();
        Self { policy, rules }
    }

    /// Registry identity (`metadata.name`).
    pub fn id(&self) -> &str {
        self.policy.id()
    }

    /// Target resource type.
    pub fn resource_type(&self) -> &str {
        self.policy.resource_type()
    }

    /// Enforcement mode.
    pub fn enforcement(&self) -> Enforcement {
        self.policy.enforcement()
    }

    /// The policy as registered.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Compiled rules, in document order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Evaluate every rule against `properties`, appending violations.
    pub(crate) fn evaluate_into(&self, properties: &Value, out: &mut Vec<Violation>) {
        for rule in &self.rules {
            let error = match &rule.predicate {
                Ok(predicate) => match predicate.evaluate(properties) {
                    Ok(true) => continue,
                    Ok(false) => None,
                    Err(e) => {
                        tracing::warn!(
                            policy_id = %self.id(),
                            rule = %rule.name,
                            error = %e,
                            "rule condition failed to evaluate"
                        );
                        Some(format!("condition could not be evaluated: {e}"))
                    }
                },
                Err(e) => Some(format!("condition failed to compile: {e}")),
            };
            out.push(Violation {
                policy_id: self.id().to_string(),
                rule_name: rule.name.clone(),
                message: rule
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("rule '{}' failed", rule.name)),
                severity: rule.severity,
                enforcement: self.enforcement(),
                error,
            });
        }
    }
}

fn compile_rule(policy: &Policy, rule: &Rule, compiler: &dyn ConditionCompiler) -> CompiledRule {
    let predicate = compiler.compile(&rule.condition);
    if let Err(e) = &predicate {
        tracing::warn!(
            policy_id = %policy.id(),
            rule = %rule.name,
            error = %e,
            "rule condition failed to compile; it will fail every evaluation"
        );
    }
    CompiledRule {
        name: rule.name.clone(),
        message: rule.message.clone(),
        severity: policy.effective_severity(rule),
        predicate,
    }
}
