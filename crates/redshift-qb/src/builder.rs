//! The fluent, connection-owning query builder.

use crate::built::BuiltQuery;
use crate::config::ConnectOptions;
use crate::error::{QbError, QbResult};
use crate::query::{self, Query};
use crate::record::Record;
use crate::session::{PgSession, Session};
use crate::value::Value;
use std::fmt;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// A query builder that owns its connection and its accumulated [`Query`].
///
/// Mutators (`select`, `where_`, `where_between`, `group_by`) return `&mut Self`
/// for chaining. State persists across executions: a second `where_` after a
/// `get` adds to the first one rather than replacing it. Call
/// [`QueryBuilder::reset`] (or build a fresh [`Query`]) between unrelated
/// queries.
///
/// # Example
/// ```ignore
/// let mut qb = QueryBuilder::new("cluster.example.com", "awsuser", "secret", "dev");
/// qb.connect().await?;
///
/// let rows = qb
///     .select(["id", "name"])
///     .where_("status", "active")
///     .get("users")
///     .await?;
///
/// qb.disconnect().await?;
/// ```
pub struct QueryBuilder<S = PgSession> {
    options: ConnectOptions,
    session: Option<S>,
    query: Query,
}

impl QueryBuilder<PgSession> {
    /// Create a builder for the given endpoint on the default port (5439).
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self::with_options(ConnectOptions::new(host, user, password, database))
    }

    /// Create a builder from explicit connect options.
    pub fn with_options(options: ConnectOptions) -> Self {
        Self {
            options,
            session: None,
            query: Query::new(),
        }
    }

    /// Create a builder from `REDSHIFT_*` environment variables.
    pub fn from_env() -> QbResult<Self> {
        Ok(Self::with_options(ConnectOptions::from_env()?))
    }

    /// Open a session to the cluster.
    ///
    /// An existing session is closed first.
    pub async fn connect(&mut self) -> QbResult<()> {
        let session = PgSession::connect(&self.options).await?;
        self.replace_session(session).await
    }

    /// Open a session using a custom TLS connector.
    pub async fn connect_with_tls<T>(&mut self, tls: T) -> QbResult<()>
    where
        T: MakeTlsConnect<Socket> + Send + 'static,
        T::Stream: Send + 'static,
        T::TlsConnect: Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        let session = PgSession::connect_with_tls(&self.options, tls).await?;
        self.replace_session(session).await
    }
}

impl<S: Session> QueryBuilder<S> {
    /// Create a builder around an already open session.
    pub fn with_session(options: ConnectOptions, session: S) -> Self {
        Self {
            options,
            session: Some(session),
            query: Query::new(),
        }
    }

    async fn replace_session(&mut self, session: S) -> QbResult<()> {
        if let Some(old) = self.session.replace(session) {
            old.close().await?;
        }
        Ok(())
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if connected.
    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// Close the session, if any.
    pub async fn disconnect(&mut self) -> QbResult<()> {
        match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    // ==================== State ====================

    /// Replace the selected columns; an empty list keeps the current ones.
    pub fn select<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.query = std::mem::take(&mut self.query).select(columns);
        self
    }

    /// Add WHERE: column = value
    pub fn where_(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.query = std::mem::take(&mut self.query).where_(column, value);
        self
    }

    /// Add WHERE: column <operator> value
    pub fn where_op(
        &mut self,
        column: impl Into<String>,
        operator: impl Into<crate::Op>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.query = std::mem::take(&mut self.query).where_op(column, operator, value);
        self
    }

    /// Add WHERE: column BETWEEN 'start' AND 'end'
    pub fn where_between(
        &mut self,
        column: impl Into<String>,
        start: impl fmt::Display,
        end: impl fmt::Display,
    ) -> &mut Self {
        self.query = std::mem::take(&mut self.query).where_between(column, start, end);
        self
    }

    /// Set the GROUP BY columns; an empty list keeps the current ones.
    pub fn group_by<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.query = std::mem::take(&mut self.query).group_by(columns);
        self
    }

    /// Drop all conditions, grouping and column selection.
    pub fn reset(&mut self) -> &mut Self {
        self.query = Query::new();
        self
    }

    /// The accumulated query state.
    pub fn query(&self) -> &Query {
        &self.query
    }

    // ==================== Rendering ====================

    /// Render the SELECT for `table` with `%s` placeholders via [`BuiltQuery::sql`].
    pub fn build_query(&self, table: &str) -> BuiltQuery {
        self.query.build_query(table)
    }

    /// The SELECT for `table` with values inlined as literals.
    pub fn sql(&self, table: &str) -> String {
        self.query.sql(table)
    }

    // ==================== Execution ====================

    fn require_session(session: &mut Option<S>) -> QbResult<&mut S> {
        session.as_mut().ok_or(QbError::NotConnected)
    }

    /// First column of the first row of the SELECT, as an integer.
    pub async fn count(&mut self, table: &str) -> QbResult<i64> {
        let session = Self::require_session(&mut self.session)?;
        self.query.count(table, session).await
    }

    /// Every row of the SELECT.
    pub async fn get(&mut self, table: &str) -> QbResult<Vec<Record>> {
        let session = Self::require_session(&mut self.session)?;
        self.query.get(table, session).await
    }

    /// The first row of the SELECT (`LIMIT 1`), if any.
    pub async fn first(&mut self, table: &str) -> QbResult<Option<Record>> {
        let session = Self::require_session(&mut self.session)?;
        self.query.first(table, session).await
    }

    /// Update matching rows, commit, return the affected row count.
    pub async fn update<I, K, V>(&mut self, table: &str, column_values: I) -> QbResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let session = Self::require_session(&mut self.session)?;
        self.query.update(table, column_values, session).await
    }

    /// Delete matching rows, commit, return the affected row count.
    pub async fn delete(&mut self, table: &str) -> QbResult<u64> {
        let session = Self::require_session(&mut self.session)?;
        self.query.delete(table, session).await
    }

    /// Execute `sql` verbatim, commit, return the affected row count.
    pub async fn raw(&mut self, sql: &str) -> QbResult<u64> {
        let session = Self::require_session(&mut self.session)?;
        query::raw(session, sql).await
    }
}

impl<S> fmt::Debug for QueryBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("options", &self.options)
            .field("connected", &self.session.is_some())
            .field("query", &self.query)
            .finish()
    }
}
