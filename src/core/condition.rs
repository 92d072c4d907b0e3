//! Condition expressions evaluated against event payloads.
//!
//! Rules carry a small expression language:
//! - `always` or an empty string matches everything
//! - `exists <field>` matches when the field is present
//! - `<field> <op> <literal>` with ops `== != > >= < <=`
//! - clauses joined with `&&` must all hold
//!
//! Field references support dotted paths (`summary.errors`). Literals
//! parse as JSON (numbers, booleans, quoted strings); a bare word is
//! treated as a string. Parse and evaluation failures are never fatal:
//! the rule is treated as non-matching and the failure is logged by the
//! trigger engine.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::event::lookup_field;

/// Errors parsing or evaluating a condition expression
#[derive(Debug, Clone, Error)]
pub enum ConditionError {
    #[error("Empty clause in condition")]
    EmptyClause,

    #[error("No comparison operator in clause: {0}")]
    MissingOperator(String),

    #[error("Missing field name in clause: {0}")]
    MissingField(String),

    #[error("Cannot order {field} ({actual}) against {expected}")]
    TypeMismatch {
        field: String,
        actual: &'static str,
        expected: &'static str,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn is_ordering(&self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }
}

/// A parsed condition, evaluated per event
#[derive(Debug, Clone)]
pub enum Condition {
    /// Matches every payload
    Always,

    /// Matches nothing (stands in for an unparseable expression)
    Never,

    /// The field is present
    Exists { field: String },

    /// Compare a payload field against a literal
    Compare {
        field: String,
        op: CompareOp,
        literal: Value,
    },

    /// Every clause must hold
    All(Vec<Condition>),
}

impl Condition {
    /// Parse an expression string
    pub fn parse(expr: &str) -> Result<Self, ConditionError> {
        let expr = expr.trim();
        if expr.is_empty() || expr == "always" {
            return Ok(Self::Always);
        }

        let clauses: Vec<&str> = expr.split("&&").collect();
        if clauses.len() > 1 {
            let parsed = clauses
                .iter()
                .map(|clause| Self::parse_clause(clause))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::All(parsed));
        }

        Self::parse_clause(expr)
    }

    fn parse_clause(clause: &str) -> Result<Self, ConditionError> {
        let clause = clause.trim();
        if clause.is_empty() {
            return Err(ConditionError::EmptyClause);
        }

        if let Some(field) = clause.strip_prefix("exists ") {
            let field = field.trim();
            if field.is_empty() {
                return Err(ConditionError::MissingField(clause.to_string()));
            }
            return Ok(Self::Exists {
                field: field.to_string(),
            });
        }

        // Two-character operators first so `>=` is not read as `>`
        const OPS: [(&str, CompareOp); 6] = [
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
        ];

        for (token, op) in OPS {
            if let Some(idx) = clause.find(token) {
                let field = clause[..idx].trim();
                let literal = clause[idx + token.len()..].trim();
                if field.is_empty() {
                    return Err(ConditionError::MissingField(clause.to_string()));
                }
                return Ok(Self::Compare {
                    field: field.to_string(),
                    op,
                    literal: parse_literal(literal),
                });
            }
        }

        Err(ConditionError::MissingOperator(clause.to_string()))
    }

    /// Evaluate against an event payload
    pub fn evaluate(&self, payload: &Map<String, Value>) -> Result<bool, ConditionError> {
        match self {
            Self::Always => Ok(true),
            Self::Never => Ok(false),
            Self::Exists { field } => Ok(lookup_field(payload, field).is_some()),
            Self::All(clauses) => {
                for clause in clauses {
                    if !clause.evaluate(payload)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Compare { field, op, literal } => {
                let Some(actual) = lookup_field(payload, field) else {
                    // Absent fields never satisfy a comparison
                    return Ok(false);
                };
                compare(field, actual, *op, literal)
            }
        }
    }
}

fn parse_literal(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn compare(field: &str, actual: &Value, op: CompareOp, literal: &Value) -> Result<bool, ConditionError> {
    if op.is_ordering() {
        let (Some(a), Some(b)) = (actual.as_f64(), literal.as_f64()) else {
            return Err(ConditionError::TypeMismatch {
                field: field.to_string(),
                actual: type_name(actual),
                expected: type_name(literal),
            });
        };
        return Ok(match op {
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            _ => unreachable!(),
        });
    }

    // Numeric equality ignores representation (2 == 2.0)
    if let (Some(a), Some(b)) = (actual.as_f64(), literal.as_f64()) {
        return Ok(match op {
            CompareOp::Eq => a == b,
            _ => a != b,
        });
    }

    Ok(match op {
        CompareOp::Eq => actual == literal,
        _ => actual != literal,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
