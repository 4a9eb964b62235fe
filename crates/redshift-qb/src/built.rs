//! Rendered statements.
//!
//! A [`BuiltQuery`] keeps SQL fragments and parameter slots apart, so the same
//! statement can be shown with `%s` placeholders, sent to the driver with
//! `$1, $2, ...`, or printed with every value inlined as a literal.

use crate::value::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Raw(String),
    Param,
}

/// A SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltQuery {
    parts: Vec<Part>,
    params: Vec<Value>,
}

impl BuiltQuery {
    /// Start a statement with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let mut q = Self::default();
        q.push(&initial_sql.into());
        q
    }

    /// An empty statement.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(Part::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(Part::Param);
        self.params.push(value.into());
        self
    }

    /// Append another statement, keeping its parameters in order.
    pub fn append(&mut self, other: BuiltQuery) -> &mut Self {
        for part in other.parts {
            match part {
                Part::Raw(s) => {
                    self.push(&s);
                }
                Part::Param => self.parts.push(Part::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// SQL text with `%s` placeholders.
    pub fn sql(&self) -> String {
        self.render(|_, _, out| out.push_str("%s"))
    }

    /// SQL text with `$1, $2, ...` placeholders, as sent to the driver.
    pub fn numbered_sql(&self) -> String {
        self.render(|idx, _, out| {
            let _ = write!(out, "${idx}");
        })
    }

    /// SQL text with every bound value inlined as a literal.
    ///
    /// Meant for logging and inspection. Execution never uses this form.
    pub fn literal_sql(&self) -> String {
        self.render(|_, value, out| out.push_str(&value.to_sql_literal()))
    }

    fn render(&self, mut placeholder: impl FnMut(usize, &Value, &mut String)) -> String {
        let mut out = String::new();
        let mut idx = 0;
        for part in &self.parts {
            match part {
                Part::Raw(s) => out.push_str(s),
                Part::Param => {
                    placeholder(idx + 1, &self.params[idx], &mut out);
                    idx += 1;
                }
            }
        }
        out
    }
}
