//! # JSONPath Condition Compiler
//!
//! Production [`ConditionCompiler`]. Conditions are parsed once into an
//! [`Expr`] tree; evaluation walks the tree against a borrowed document and
//! never allocates copies of the selected values.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::{CmpOp, Expr, PathExpr, Segment};
use crate::error::{CompileError, EvalError};
use crate::{parser, ConditionCompiler, Predicate};

/// Compiles JSONPath comparison expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathCompiler;

impl JsonPathCompiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Compile into the concrete condition type.
    pub fn compile_condition(&self, source: &str) -> Result<CompiledCondition, CompileError> {
        let expr = parser::parse(source)?;
        Ok(CompiledCondition {
            source: source.to_string(),
            expr,
        })
    }
}

impl ConditionCompiler for JsonPathCompiler {
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, CompileError> {
        Ok(Arc::new(self.compile_condition(source)?))
    }
}

/// A parsed condition ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    source: String,
    expr: Expr,
}

impl CompiledCondition {
    /// The parsed expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl Predicate for CompiledCondition {
    fn evaluate(&self, document: &Value) -> Result<bool, EvalError> {
        eval(&self.expr, document)
    }

    fn source(&self) -> &str {
        &self.source
    }
}

fn eval(expr: &Expr, doc: &Value) -> Result<bool, EvalError> {
    match expr {
        Expr::Compare { path, op, literal } => {
            let nodes = select(path, doc);
            if nodes.is_empty() {
                return compare(&Value::Null, *op, literal);
            }
            for node in nodes {
                if !compare(node, *op, literal)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Truthy(path) => {
            let nodes = select(path, doc);
            Ok(!nodes.is_empty()
                && nodes
                    .iter()
                    .all(|v| !matches!(v, Value::Null | Value::Bool(false))))
        }
        Expr::Not(inner) => Ok(!eval(inner, doc)?),
        Expr::And(lhs, rhs) => Ok(eval(lhs, doc)? && eval(rhs, doc)?),
        Expr::Or(lhs, rhs) => Ok(eval(lhs, doc)? || eval(rhs, doc)?),
    }
}

/// Select every node `path` addresses in `doc`. Missing members are skipped.
pub fn select<'a>(path: &PathExpr, doc: &'a Value) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in &path.segments {
        let mut next = Vec::new();
        for node in current {
            match (segment, node) {
                (Segment::Key(key), Value::Object(map)) => next.extend(map.get(key)),
                (Segment::Index(idx), Value::Array(items)) => {
                    let resolved = if *idx < 0 {
                        usize::try_from(idx.unsigned_abs())
                            .ok()
                            .and_then(|back| items.len().checked_sub(back))
                    } else {
                        usize::try_from(*idx).ok()
                    };
                    next.extend(resolved.and_then(|i| items.get(i)));
                }
                (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Result<bool, EvalError> {
    let ordering = || {
        let ordering = match (left, right) {
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        };
        ordering.ok_or_else(|| EvalError::TypeMismatch {
            operator: op.as_str().to_string(),
            left: type_name(left),
            right: type_name(right),
        })
    };
    Ok(match op {
        CmpOp::Eq => json_eq(left, right),
        CmpOp::Ne => !json_eq(left, right),
        CmpOp::Lt => ordering()? == Ordering::Less,
        CmpOp::Le => ordering()? != Ordering::Greater,
        CmpOp::Gt => ordering()? == Ordering::Greater,
        CmpOp::Ge => ordering()? != Ordering::Less,
    })
}

/// Equality with numeric normalization, so `1 == 1.0`.
fn json_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn check(src: &str, doc: &Value) -> Result<bool, EvalError> {
        JsonPathCompiler::new().compile(src).unwrap().evaluate(doc)
    }

    #[test]
    fn not_null_on_present_and_missing_field() {
        assert_eq!(check("$.encryption != null", &json!({"encryption": "AES256"})), Ok(true));
        assert_eq!(check("$.encryption != null", &json!({})), Ok(false));
        assert_eq!(check("$.encryption == null", &json!({})), Ok(true));
    }

    #[test]
    fn boolean_and_numeric_equality() {
        let doc = json!({"versioning": true, "replicas": 3});
        assert_eq!(check("$.versioning == true", &doc), Ok(true));
        assert_eq!(check("$.replicas == 3.0", &doc), Ok(true));
        assert_eq!(check("$.replicas != 3", &doc), Ok(false));
    }

    #[test]
    fn ordering_numbers_and_strings() {
        let doc = json!({"size": 10, "tier": "gold"});
        assert_eq!(check("$.size > 5", &doc), Ok(true));
        assert_eq!(check("$.size <= 9", &doc), Ok(false));
        assert_eq!(check("$.tier >= 'bronze'", &doc), Ok(true));
    }

    #[test]
    fn ordering_type_mismatch_is_error() {
        let err = check("$.size > 5", &json!({"size": "big"})).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { left: "string", .. }));
        // Missing compares as null, which cannot be ordered.
        assert!(check("$.size > 5", &json!({})).is_err());
    }

    #[test]
    fn wildcard_requires_every_node() {
        let doc = json!({"ports": [{"n": 443}, {"n": 8443}]});
        assert_eq!(check("$.ports[*].n > 100", &doc), Ok(true));
        assert_eq!(check("$.ports[*].n == 443", &doc), Ok(false));
        assert_eq!(check("$.ports[-1].n == 8443", &doc), Ok(true));
        assert_eq!(check("$.ports[5].n == null", &doc), Ok(true));
    }

    #[test]
    fn truthiness() {
        let doc = json!({"on": true, "off": false, "nil": null, "list": [1, 2]});
        assert_eq!(check("$.on", &doc), Ok(true));
        assert_eq!(check("$.off", &doc), Ok(false));
        assert_eq!(check("$.nil", &doc), Ok(false));
        assert_eq!(check("$.absent", &doc), Ok(false));
        assert_eq!(check("$.list[*]", &doc), Ok(true));
        assert_eq!(check("!$.off", &doc), Ok(true));
    }

    #[test]
    fn connectives_short_circuit() {
        let doc = json!({"public": false, "size": "big"});
        // The right-hand side would be a type error if evaluated.
        assert_eq!(check("$.public == true && $.size > 1", &doc), Ok(false));
        assert_eq!(check("$.public == false || $.size > 1", &doc), Ok(true));
    }

    #[test]
    fn root_may_be_non_object() {
        assert_eq!(check("$.a == null", &Value::Null), Ok(true));
        assert_eq!(check("$ == 5", &json!(5)), Ok(true));
    }

    #[test]
    fn compile_keeps_source() {
        let pred = JsonPathCompiler::new().compile("$.a == 1").unwrap();
        assert_eq!(pred.source(), "$.a == 1");
    }

    proptest! {
        /// Evaluation is deterministic for any generated field name and value.
        #[test]
        fn evaluation_is_deterministic(name in "[a-z_]{1,12}", value in any::<i64>()) {
            let doc = json!({ name.clone(): value });
            let src = format!("$.{name} == {value}");
            let first = check(&src, &doc);
            let second = check(&src, &doc);
            prop_assert_eq!(first.clone(), second);
            prop_assert_eq!(first, Ok(true));
        }
    }
}
