//! # Condition Errors

use thiserror::Error;

/// A condition string is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at position {position}: {reason}")]
pub struct CompileError {
    /// Character offset where parsing failed.
    pub position: usize,
    /// What the parser expected or rejected.
    pub reason: String,
}

impl CompileError {
    /// Build a compile error at `position`.
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

/// A compiled condition could not be evaluated against a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An ordering operator was applied to values that cannot be ordered.
    #[error("cannot apply '{operator}' to {left} and {right}")]
    TypeMismatch {
        /// The operator, e.g. `>`.
        operator: String,
        /// JSON type of the selected value.
        left: &'static str,
        /// JSON type of the literal.
        right: &'static str,
    },

    /// Evaluation failed for another reason.
    #[error("evaluation failed: {0}")]
    Failed(String),
}
