//! # Condition Syntax Tree

use std::fmt;

use serde_json::Value;

/// One step of a JSONPath selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or `['name']`
    Key(String),
    /// `[3]`, or `[-1]` counting from the end.
    Index(i64),
    /// `.*` or `[*]`
    Wildcard,
}

/// A `$`-rooted selector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathExpr {
    /// Segments after the root `$`.
    pub segments: Vec<Segment>,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CmpOp {
    /// Operator spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether the operator needs ordered operands.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `path op literal`
    Compare {
        /// Left-hand selector.
        path: PathExpr,
        /// Operator.
        op: CmpOp,
        /// Right-hand literal.
        literal: Value,
    },
    /// A bare path, tested for truthiness.
    Truthy(PathExpr),
    /// `!expr`
    Not(Box<Expr>),
    /// `lhs && rhs`
    And(Box<Expr>, Box<Expr>),
    /// `lhs || rhs`
    Or(Box<Expr>, Box<Expr>),
}
