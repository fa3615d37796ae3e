//! # gov-condition — Condition Compiler
//!
//! Rule conditions are JSONPath comparison expressions such as
//! `$.encryption != null` or `$.ports[*] > 1024 && $.public == false`.
//! This crate compiles them into [`Predicate`]s that evaluate against a
//! resource's `properties` document.
//!
//! ## Capability Boundary
//!
//! Both the validator and the rules engine depend on the
//! [`ConditionCompiler`] trait, never on a concrete implementation:
//!
//! - [`JsonPathCompiler`], the production compiler.
//! - [`fake::FakeCompiler`], a deterministic table-driven stand-in for
//!   testing registry and evaluation logic without a real evaluator.
//!
//! ## Semantics
//!
//! - A path selects a list of nodes. A path that selects nothing compares
//!   as a single `null`, so `$.missing != null` is `false`.
//! - A comparison holds only if it holds for every selected node.
//! - A bare path is truthy when every selected node is neither `null` nor
//!   `false`, and at least one node was selected.
//! - Ordering operators (`<`, `<=`, `>`, `>=`) apply to number pairs and
//!   string pairs; anything else is an [`EvalError::TypeMismatch`].

pub mod ast;
pub mod error;
pub mod fake;
pub mod jsonpath;
mod parser;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use ast::{CmpOp, Expr, PathExpr, Segment};
pub use error::{CompileError, EvalError};
pub use jsonpath::{CompiledCondition, JsonPathCompiler};

/// A compiled condition, evaluable against any number of documents.
///
/// Implementations must be pure: the same document always yields the same
/// result, so predicates can be shared across threads.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Evaluate against a resource document.
    fn evaluate(&self, document: &Value) -> Result<bool, EvalError>;

    /// The condition source this predicate was compiled from.
    fn source(&self) -> &str;
}

/// Compiles condition strings into predicates.
pub trait ConditionCompiler: Send + Sync + fmt::Debug {
    /// Compile `source`, or report why it is malformed.
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, CompileError>;
}

/// The compiler used when none is injected.
pub fn default_compiler() -> Arc<dyn ConditionCompiler> {
    Arc::new(JsonPathCompiler::new())
}
