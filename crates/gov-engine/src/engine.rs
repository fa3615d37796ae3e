//! # Rules Engine
//!
//! Owns the policy registry and evaluates resources against it.
//!
//! ## Registry
//!
//! Policies are indexed by target resource type, then by policy id, behind
//! a `parking_lot::RwLock`. Each entry is an `Arc<CompiledPolicy>`, so a
//! registration swaps a whole entry at once: a concurrent reader sees the
//! old policy or the new one, never a mix.
//!
//! ## Evaluation
//!
//! `evaluate` takes the read lock only long enough to clone the `Arc`s for
//! the resource's type, then evaluates without holding it. Policies are
//! visited in ascending id order (BTreeMap), rules in document order, so
//! identical inputs against identical registry state give identical
//! results.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use gov_condition::{default_compiler, ConditionCompiler};
use gov_core::{Policy, Resource};
use parking_lot::RwLock;
use serde_json::Value;

use crate::compiled::CompiledPolicy;
use crate::error::{EngineError, RegistrationError};
use crate::result::EvaluationResult;

/// Whether a registration added a policy or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No policy with this id existed.
    Inserted,
    /// A policy with this id was replaced.
    Replaced,
}

#[derive(Debug, Default)]
struct Registry {
    /// resource type -> policy id -> policy
    by_type: HashMap<String, BTreeMap<String, Arc<CompiledPolicy>>>,
    /// policy id -> resource type
    types: HashMap<String, String>,
}

impl Registry {
    fn remove(&mut self, policy_id: &str) -> Option<Arc<CompiledPolicy>> {
        let resource_type = self.types.remove(policy_id)?;
        let policies = self.by_type.get_mut(&resource_type)?;
        let removed = policies.remove(policy_id);
        if policies.is_empty() {
            self.by_type.remove(&resource_type);
        }
        removed
    }
}

/// Evaluates resources against registered policies.
///
/// All methods take `&self`; share one engine across threads with `Arc`.
pub struct RulesEngine {
    compiler: Arc<dyn ConditionCompiler>,
    registry: RwLock<Registry>,
}

impl RulesEngine {
    /// An empty engine using the JSONPath compiler.
    pub fn new() -> Self {
        Self::with_compiler(default_compiler())
    }

    /// An empty engine using `compiler` for rule conditions.
    pub fn with_compiler(compiler: Arc<dyn ConditionCompiler>) -> Self {
        Self {
            compiler,
            registry: RwLock::new(Registry::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a typed policy, replacing any policy with the same id.
    ///
    /// Conditions are compiled before the write lock is taken.
    pub fn register_policy(&self, policy: Policy) -> Result<Registration, RegistrationError> {
        if policy.id().trim().is_empty() {
            return Err(RegistrationError::MissingIdentity);
        }
        if policy.resource_type().trim().is_empty() {
            return Err(RegistrationError::MissingResourceType {
                policy_id: policy.id().to_string(),
            });
        }

        let compiled = Arc::new(CompiledPolicy::compile(policy, self.compiler.as_ref()));
        let policy_id = compiled.id().to_string();
        let resource_type = compiled.resource_type().to_string();
        let rules = compiled.rules().len();

        let replaced = {
            let mut registry = self.registry.write();
            let replaced = registry.remove(&policy_id).is_some();
            registry
                .types
                .insert(policy_id.clone(), resource_type.clone());
            registry
                .by_type
                .entry(resource_type.clone())
                .or_default()
                .insert(policy_id.clone(), compiled);
            replaced
        };

        tracing::info!(
            policy_id = %policy_id,
            resource_type = %resource_type,
            rules,
            replaced,
            "policy registered"
        );
        Ok(if replaced {
            Registration::Replaced
        } else {
            Registration::Inserted
        })
    }

    /// Register a raw policy document. Returns `false`, and logs why, when
    /// the document lacks an identity or target resource type.
    pub fn register(&self, document: &Value) -> bool {
        let outcome = Policy::from_value(document)
            .map_err(|e| RegistrationError::Malformed(e.to_string()))
            .and_then(|policy| self.register_policy(policy));
        match outcome {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "policy registration rejected");
                false
            }
        }
    }

    /// Remove a policy. Returns whether it was registered.
    pub fn unregister(&self, policy_id: &str) -> bool {
        let removed = self.registry.write().remove(policy_id).is_some();
        if removed {
            tracing::debug!(policy_id = %policy_id, "policy unregistered");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The registered policy with `policy_id`.
    pub fn get(&self, policy_id: &str) -> Option<Arc<CompiledPolicy>> {
        let registry = self.registry.read();
        let resource_type = registry.types.get(policy_id)?;
        registry.by_type.get(resource_type)?.get(policy_id).cloned()
    }

    /// Registered policy ids, sorted.
    pub fn policy_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.read().types.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Policies targeting `resource_type`, in id order.
    pub fn policies_for(&self, resource_type: &str) -> Vec<Arc<CompiledPolicy>> {
        self.registry
            .read()
            .by_type
            .get(resource_type)
            .map(|policies| policies.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.registry.read().types.len()
    }

    /// Whether no policies are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluate `resource` against every policy targeting its type.
    ///
    /// A resource whose type no policy targets passes with no violations.
    pub fn evaluate(&self, resource: &Resource) -> EvaluationResult {
        let policies = self.policies_for(&resource.resource_type);
        let mut violations = Vec::new();
        for policy in &policies {
            policy.evaluate_into(&resource.properties, &mut violations);
        }
        tracing::trace!(
            resource_type = %resource.resource_type,
            policies = policies.len(),
            violations = violations.len(),
            "resource evaluated"
        );
        EvaluationResult {
            resource_id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            passed: violations.is_empty(),
            violations,
            policies_evaluated: policies.len(),
        }
    }

    /// Decode and evaluate a raw resource document.
    pub fn evaluate_value(&self, document: &Value) -> Result<EvaluationResult, EngineError> {
        let resource =
            Resource::from_value(document).map_err(|e| EngineError::InvalidResource(e.to_string()))?;
        Ok(self.evaluate(&resource))
    }

    /// Evaluate many resources on up to `workers` scoped threads.
    ///
    /// Results are in input order and equal to evaluating each resource
    /// sequentially against the same registry state.
    pub fn evaluate_batch(&self, resources: &[Resource], workers: usize) -> Vec<EvaluationResult> {
        let workers = workers.clamp(1, resources.len().max(1));
        if workers == 1 {
            return resources.iter().map(|r| self.evaluate(r)).collect();
        }
        let chunk_size = resources.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = resources
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || chunk.iter().map(|r| self.evaluate(r)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RulesEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("RulesEngine")
            .field("policy_count", &registry.types.len())
            .field("resource_types", &registry.by_type.len())
            .field("compiler", &self.compiler)
            .finish()
    }
}
