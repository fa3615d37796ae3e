//! # Table-Driven Fake Compiler
//!
//! Maps condition strings to fixed outcomes. Used to test the registry and
//! evaluation fan-out without depending on JSONPath semantics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CompileError, EvalError};
use crate::{ConditionCompiler, Predicate};

/// What a fake condition does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOutcome {
    /// Compiles; always evaluates to `true`.
    Pass,
    /// Compiles; always evaluates to `false`.
    Fail,
    /// Compiles; evaluation fails with this message.
    Error(String),
    /// Compilation fails with this reason.
    RejectCompile(String),
}

/// A [`ConditionCompiler`] whose answers come from a lookup table.
#[derive(Debug)]
pub struct FakeCompiler {
    outcomes: HashMap<String, FakeOutcome>,
    fallback: FakeOutcome,
    compiled: AtomicUsize,
}

impl Default for FakeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCompiler {
    /// A compiler where every unknown condition passes.
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            fallback: FakeOutcome::Pass,
            compiled: AtomicUsize::new(0),
        }
    }

    /// Register the outcome for one condition string.
    pub fn with(mut self, condition: impl Into<String>, outcome: FakeOutcome) -> Self {
        self.outcomes.insert(condition.into(), outcome);
        self
    }

    /// Outcome for conditions not in the table.
    pub fn with_fallback(mut self, outcome: FakeOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Number of `compile` calls so far, successful or not.
    pub fn compile_count(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }
}

impl ConditionCompiler for FakeCompiler {
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, CompileError> {
        self.compiled.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcomes.get(source).unwrap_or(&self.fallback);
        if let FakeOutcome::RejectCompile(reason) = outcome {
            return Err(CompileError::new(0, reason.clone()));
        }
        Ok(Arc::new(FakePredicate {
            source: source.to_string(),
            outcome: outcome.clone(),
        }))
    }
}

#[derive(Debug)]
struct FakePredicate {
    source: String,
    outcome: FakeOutcome,
}

impl Predicate for FakePredicate {
    fn evaluate(&self, _document: &Value) -> Result<bool, EvalError> {
        match &self.outcome {
            FakeOutcome::Pass => Ok(true),
            FakeOutcome::Fail => Ok(false),
            FakeOutcome::Error(msg) => Err(EvalError::Failed(msg.clone())),
            FakeOutcome::RejectCompile(reason) => Err(EvalError::Failed(reason.clone())),
        }
    }

    fn source(&self) -> &str {
        &self.source
    }
}
