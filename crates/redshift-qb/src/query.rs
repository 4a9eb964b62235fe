//! Accumulated query state and every execution path over it.
//!
//! A [`Query`] is a plain value: selected columns, WHERE conditions and an
//! optional GROUP BY list. Rendering and execution take `&self` plus a table
//! name and a [`Session`], so one `Query` can be reused, cloned, or rebuilt
//! per statement without conditions bleeding between calls.
//!
//! ```ignore
//! use redshift_qb::Query;
//!
//! let q = Query::new()
//!     .select(["region", "COUNT(*)"])
//!     .where_("status", "shipped")
//!     .where_between("order_date", "2024-01-01", "2024-03-31")
//!     .group_by(["region"]);
//!
//! let rows = q.get("orders", &mut session).await?;
//! ```

use crate::built::BuiltQuery;
use crate::condition::{Condition, Op};
use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::session::{QueryKind, Session, log_statement};
use crate::value::Value;
use std::fmt;

/// Selection, filter and grouping state of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// SELECT columns (default `["*"]`)
    columns: Vec<String>,
    /// WHERE conditions, AND-joined in insertion order
    conditions: Vec<Condition>,
    /// GROUP BY columns
    group_by: Option<Vec<String>>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            columns: vec!["*".to_string()],
            conditions: Vec::new(),
            group_by: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== State ====================

    /// Replace the selected columns.
    ///
    /// An empty list leaves the current selection unchanged.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !columns.is_empty() {
            self.columns = columns;
        }
        self
    }

    /// Add WHERE: column = value
    pub fn where_(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(column, Op::Eq, value)
    }

    /// Add WHERE: column <operator> value
    ///
    /// Operators other than the named [`Op`] variants are rendered verbatim.
    pub fn where_op(
        mut self,
        column: impl Into<String>,
        operator: impl Into<Op>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions.push(Condition::new(column, operator, value));
        self
    }

    /// Add WHERE: column BETWEEN 'start' AND 'end'
    ///
    /// Both bounds are inlined as quoted literals, not bound.
    pub fn where_between(
        mut self,
        column: impl Into<String>,
        start: impl fmt::Display,
        end: impl fmt::Display,
    ) -> Self {
        self.conditions.push(Condition::between(column, start, end));
        self
    }

    /// Add a pre-built condition.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the GROUP BY columns.
    ///
    /// An empty list leaves the current grouping unchanged.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !columns.is_empty() {
            self.group_by = Some(columns);
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn group_by_columns(&self) -> Option<&[String]> {
        self.group_by.as_deref()
    }

    // ==================== Rendering ====================

    /// `WHERE a = %s AND b = %s\n`, or nothing without conditions.
    fn write_where(&self, q: &mut BuiltQuery, eq_only: bool) {
        if self.conditions.is_empty() {
            return;
        }
        q.push("WHERE ");
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                q.push(" AND ");
            }
            if eq_only {
                cond.write_eq_to(q);
            } else {
                cond.write_to(q);
            }
        }
        q.push("\n");
    }

    /// Render the SELECT statement for `table`.
    ///
    /// Clause order is fixed: SELECT, WHERE, GROUP BY. Every clause ends with
    /// a newline.
    pub fn build_query(&self, table: &str) -> BuiltQuery {
        let mut q = BuiltQuery::new(format!(
            "SELECT {} FROM {}\n",
            self.columns.join(", "),
            table
        ));
        self.write_where(&mut q, false);
        if let Some(group_by) = &self.group_by {
            q.push("GROUP BY ").push(&group_by.join(", ")).push("\n");
        }
        q
    }

    /// The SELECT for `table` with every value inlined as a literal.
    ///
    /// For logging and inspection; execution binds parameters instead.
    pub fn sql(&self, table: &str) -> String {
        self.build_query(table).literal_sql()
    }

    /// Render `UPDATE <table> SET ...` with the stored conditions.
    ///
    /// Each condition is rendered as `column = %s` whatever operator it was
    /// recorded with. Update values are bound before condition values.
    pub fn build_update<I, K, V>(&self, table: &str, column_values: I) -> BuiltQuery
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut q = BuiltQuery::new(format!("UPDATE {table} SET "));
        for (i, (column, value)) in column_values.into_iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push(column.as_ref()).push(" = ").push_bind(value);
        }
        q.push("\n");
        self.write_where(&mut q, true);
        q
    }

    /// Render `DELETE FROM <table>` with the stored conditions.
    ///
    /// Conditions are rendered as in [`Query::build_update`].
    pub fn build_delete(&self, table: &str) -> BuiltQuery {
        let mut q = BuiltQuery::new(format!("DELETE FROM {table}\n"));
        self.write_where(&mut q, true);
        q
    }

    // ==================== Execution ====================

    /// Run the SELECT and return the first column of the first row as an
    /// integer.
    ///
    /// The selection is used as-is, so select `COUNT(*)` (or similar) first.
    pub async fn count(&self, table: &str, session: &mut impl Session) -> QbResult<i64> {
        let q = self.build_query(table);
        let rows = fetch(session, QueryKind::Count, &q).await?;
        let row = rows
            .first()
            .ok_or_else(|| QbError::not_found(format!("count on {table} returned no rows")))?;
        let (column, value) = row
            .iter()
            .next()
            .ok_or_else(|| QbError::not_found(format!("count on {table} returned no columns")))?;
        value.as_i64().ok_or_else(|| {
            QbError::decode(column, format!("expected an integer, got {}", value.kind()))
        })
    }

    /// Run the SELECT and return every row.
    pub async fn get(&self, table: &str, session: &mut impl Session) -> QbResult<Vec<Record>> {
        let q = self.build_query(table);
        fetch(session, QueryKind::Select, &q).await
    }

    /// Run the SELECT with `LIMIT 1` and return the row, if any.
    pub async fn first(
        &self,
        table: &str,
        session: &mut impl Session,
    ) -> QbResult<Option<Record>> {
        let mut q = self.build_query(table);
        q.push("LIMIT 1");
        let rows = fetch(session, QueryKind::Select, &q).await?;
        Ok(rows.into_iter().next())
    }

    /// Update matching rows, commit, and return the affected row count.
    pub async fn update<I, K, V>(
        &self,
        table: &str,
        column_values: I,
        session: &mut impl Session,
    ) -> QbResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let q = self.build_update(table, column_values);
        execute(session, QueryKind::Update, &q).await
    }

    /// Delete matching rows, commit, and return the affected row count.
    pub async fn delete(&self, table: &str, session: &mut impl Session) -> QbResult<u64> {
        let q = self.build_delete(table);
        execute(session, QueryKind::Delete, &q).await
    }
}

async fn fetch(
    session: &mut impl Session,
    kind: QueryKind,
    q: &BuiltQuery,
) -> QbResult<Vec<Record>> {
    let sql = q.numbered_sql();
    log_statement(kind, &sql, q.param_count());
    session.fetch_all(&sql, q.params()).await
}

async fn execute(session: &mut impl Session, kind: QueryKind, q: &BuiltQuery) -> QbResult<u64> {
    let sql = q.numbered_sql();
    log_statement(kind, &sql, q.param_count());
    session.execute_commit(&sql, q.params()).await
}

/// Execute caller SQL verbatim, commit, and return the affected row count.
pub async fn raw(session: &mut impl Session, sql: &str) -> QbResult<u64> {
    log_statement(QueryKind::Raw, sql, 0);
    session.execute_raw(sql).await
}
