//! Driver sessions.
//!
//! [`Session`] is the seam between the query builder and the driver: it runs
//! rendered statements and hands back decoded [`Record`]s or affected-row
//! counts. [`PgSession`] implements it over a `tokio_postgres::Client`.

use crate::config::ConnectOptions;
use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::value::Value;
use tokio::task::JoinHandle;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage, Socket};

/// SQL longer than this is truncated in debug logs.
const LOG_SQL_MAX_BYTES: usize = 200;

/// What kind of statement is being sent, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Count,
    Update,
    Delete,
    Raw,
}

/// A live connection able to execute statements.
///
/// `sql` always uses `$n` placeholders; `params` are bound in order.
pub trait Session: Send {
    /// Execute a query and return every row.
    fn fetch_all(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<Vec<Record>>> + Send;

    /// Execute a statement in its own transaction, commit, and return the
    /// number of affected rows.
    fn execute_commit(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<u64>> + Send;

    /// Execute caller SQL verbatim without parameters, commit, and return the
    /// number of affected rows.
    fn execute_raw(
        &mut self,
        sql: &str,
    ) -> impl std::future::Future<Output = QbResult<u64>> + Send;

    /// Close the session.
    fn close(self) -> impl std::future::Future<Output = QbResult<()>> + Send
    where
        Self: Sized,
    {
        async { Ok(()) }
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Emit the statement about to be executed.
pub(crate) fn log_statement(kind: QueryKind, sql: &str, param_count: usize) {
    let shown = truncate_sql_bytes(sql, LOG_SQL_MAX_BYTES);
    let truncated = shown.len() < sql.len();
    tracing::debug!(
        target: "redshift_qb.sql",
        kind = ?kind,
        param_count,
        truncated,
        sql = %shown,
    );
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// A session over a `tokio_postgres::Client`.
///
/// The driver's connection future runs on a spawned task that is aborted when
/// the session is closed or dropped.
pub struct PgSession {
    client: Client,
    driver: Option<JoinHandle<()>>,
}

impl PgSession {
    /// Connect without TLS negotiation beyond what `ssl_mode` allows.
    pub async fn connect(options: &ConnectOptions) -> QbResult<Self> {
        Self::connect_with_tls(options, NoTls).await
    }

    /// Connect using a custom TLS connector.
    pub async fn connect_with_tls<T>(options: &ConnectOptions, tls: T) -> QbResult<Self>
    where
        T: MakeTlsConnect<Socket> + Send + 'static,
        T::Stream: Send + 'static,
        T::TlsConnect: Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        let (client, connection) = options
            .to_pg_config()
            .connect(tls)
            .await
            .map_err(|e| QbError::Connection(e.to_string()))?;

        let host = options.host.clone();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "redshift_qb", host = %host, error = %e, "connection error");
            }
        });

        tracing::info!(
            target: "redshift_qb",
            host = %options.host,
            port = options.port,
            database = %options.database,
            "connected"
        );
        Ok(Self::from_parts(client, driver))
    }

    /// Wrap an already connected client.
    ///
    /// `driver` is the task polling the client's connection future.
    pub fn from_parts(client: Client, driver: JoinHandle<()>) -> Self {
        Self {
            client,
            driver: Some(driver),
        }
    }

    /// The underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Session for PgSession {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        let refs = param_refs(params);
        let rows = self.client.query(sql, &refs).await?;
        Record::from_rows(&rows)
    }

    async fn execute_commit(&mut self, sql: &str, params: &[Value]) -> QbResult<u64> {
        let refs = param_refs(params);
        let tx = self.client.transaction().await?;
        let affected = tx.execute(sql, &refs).await?;
        tx.commit().await?;
        Ok(affected)
    }

    async fn execute_raw(&mut self, sql: &str) -> QbResult<u64> {
        let tx = self.client.transaction().await?;
        let messages = tx.simple_query(sql).await?;
        tx.commit().await?;
        Ok(affected_rows(&messages))
    }

    async fn close(mut self) -> QbResult<()> {
        let driver = self.driver.take();
        // Dropping the client lets the connection future finish on its own.
        drop(self);
        if let Some(driver) = driver {
            let _ = driver.await;
        }
        tracing::info!(target: "redshift_qb", "disconnected");
        Ok(())
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// One step of a simple-query response, as far as row counts care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    /// The current statement produced a result set.
    Rows,
    /// The current statement finished with this command count.
    Complete(u64),
}

/// Sum the affected-row counts of a simple-query response.
fn affected_rows(messages: &[SimpleQueryMessage]) -> u64 {
    sum_affected(messages.iter().filter_map(|msg| match msg {
        SimpleQueryMessage::Row(_) | SimpleQueryMessage::RowDescription(_) => Some(Reply::Rows),
        SimpleQueryMessage::CommandComplete(n) => Some(Reply::Complete(*n)),
        _ => None,
    }))
}

/// Statements that returned rows count as 0; the counter resets at every
/// command completion.
fn sum_affected(replies: impl IntoIterator<Item = Reply>) -> u64 {
    let mut total = 0;
    let mut returned_rows = false;
    for reply in replies {
        match reply {
            Reply::Rows => returned_rows = true,
            Reply::Complete(n) => {
                if !returned_rows {
                    total += n;
                }
                returned_rows = false;
            }
        }
    }
    total
}
