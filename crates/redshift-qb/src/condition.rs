//! WHERE conditions.
//!
//! A [`Condition`] is a `(column, operator, value)` triple. Standard conditions
//! bind their value as a parameter; `BETWEEN` conditions created with
//! [`Condition::between`] inline both bounds as quoted literals.

use crate::built::BuiltQuery;
use crate::value::{Value, quote_literal};
use std::fmt;

/// Comparison operator of a condition.
///
/// Anything that is not one of the named operators is passed through
/// verbatim as [`Op::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Op {
    /// `=`
    #[default]
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    Like,
    Ilike,
    NotLike,
    Between,
    /// Any other operator, rendered as given
    Other(String),
}

impl Op {
    pub fn as_str(&self) -> &str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::Ilike => "ILIKE",
            Op::NotLike => "NOT LIKE",
            Op::Between => "BETWEEN",
            Op::Other(op) => op,
        }
    }

    /// Parse an operator string; unknown operators become [`Op::Other`].
    pub fn parse(op: &str) -> Self {
        match op.trim() {
            "=" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            s if s.eq_ignore_ascii_case("LIKE") => Op::Like,
            s if s.eq_ignore_ascii_case("ILIKE") => Op::Ilike,
            s if s.eq_ignore_ascii_case("NOT LIKE") => Op::NotLike,
            s if s.eq_ignore_ascii_case("BETWEEN") => Op::Between,
            _ => Op::Other(op.to_string()),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Op {
    fn from(op: &str) -> Self {
        Op::parse(op)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Bound as a parameter.
    Bound(Value),
    /// `'start' AND 'end'`, inlined as literals.
    Range { start: String, end: String },
}

/// A stored WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: String,
    operator: Op,
    value: ConditionValue,
}

impl Condition {
    /// `column <op> %s`
    pub fn new(column: impl Into<String>, operator: impl Into<Op>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: ConditionValue::Bound(value.into()),
        }
    }

    /// `column = %s`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Eq, value)
    }

    /// `column BETWEEN 'start' AND 'end'`
    pub fn between(
        column: impl Into<String>,
        start: impl fmt::Display,
        end: impl fmt::Display,
    ) -> Self {
        Self {
            column: column.into(),
            operator: Op::Between,
            value: ConditionValue::Range {
                start: start.to_string(),
                end: end.to_string(),
            },
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> &Op {
        &self.operator
    }

    pub fn value(&self) -> &ConditionValue {
        &self.value
    }

    /// Whether the bounds are inlined rather than bound.
    pub fn is_range(&self) -> bool {
        matches!(self.value, ConditionValue::Range { .. })
    }

    /// The value bound for this condition.
    ///
    /// A range yields its `'start' AND 'end'` text, which is what UPDATE and
    /// DELETE bind against their `column = %s` filters.
    pub fn bound_value(&self) -> Value {
        match &self.value {
            ConditionValue::Bound(v) => v.clone(),
            ConditionValue::Range { start, end } => Value::Text(range_literal(start, end)),
        }
    }

    /// Append `column <op> %s` (or the inlined range) to `q`.
    pub(crate) fn write_to(&self, q: &mut BuiltQuery) {
        q.push(&self.column).push(" ").push(self.operator.as_str()).push(" ");
        match &self.value {
            ConditionValue::Bound(v) => {
                q.push_bind(v.clone());
            }
            ConditionValue::Range { start, end } => {
                q.push(&range_literal(start, end));
            }
        }
    }

    /// Append `column = %s`, ignoring the recorded operator.
    pub(crate) fn write_eq_to(&self, q: &mut BuiltQuery) {
        q.push(&self.column).push(" = ").push_bind(self.bound_value());
    }
}

fn range_literal(start: &str, end: &str) -> String {
    format!("{} AND {}", quote_literal(start), quote_literal(end))
}
