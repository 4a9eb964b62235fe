//! # redshift-qb
//!
//! A small fluent query builder for Amazon Redshift, on top of `tokio-postgres`.
//!
//! ## Features
//!
//! - **Chained filters**: `select`, `where_`, `where_between`, `group_by`
//! - **Bound parameters**: values are sent to the driver as parameters; SQL can
//!   still be shown with `%s` placeholders or fully inlined for logging
//! - **Row maps**: results come back as [`Record`]s, ordered column-name-to-value
//!   mappings that serialize straight to JSON
//! - **Commit per write**: `update`, `delete` and `raw` run in their own
//!   transaction and commit before returning
//!
//! ## Usage
//!
//! ```ignore
//! use redshift_qb::QueryBuilder;
//!
//! let mut qb = QueryBuilder::from_env()?;
//! qb.connect().await?;
//!
//! let total = qb
//!     .select(["COUNT(*)"])
//!     .where_("status", "active")
//!     .count("users")
//!     .await?;
//!
//! let rows = qb
//!     .reset()
//!     .select(["region", "SUM(amount) AS total"])
//!     .where_between("sold_at", "2024-01-01", "2024-12-31")
//!     .group_by(["region"])
//!     .get("sales")
//!     .await?;
//!
//! qb.reset().where_("id", 42).update("users", [("status", "inactive")]).await?;
//! qb.disconnect().await?;
//! ```
//!
//! ## Logging
//!
//! Statements are emitted through `tracing` at DEBUG level under the
//! `redshift_qb.sql` target; connection lifecycle events use `redshift_qb`.

pub mod builder;
pub mod built;
pub mod condition;
pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod session;
pub mod value;

pub use builder::QueryBuilder;
pub use built::BuiltQuery;
pub use condition::{Condition, ConditionValue, Op};
pub use config::{ConnectOptions, DEFAULT_PORT};
pub use error::{QbError, QbResult};
pub use query::{Query, raw};
pub use record::Record;
pub use session::{PgSession, QueryKind, Session};
pub use value::Value;

// Re-export the driver for TLS connectors and direct client access.
pub use tokio_postgres;

#[cfg(test)]
mod tests;
