//! Error types for redshift-qb

use thiserror::Error;

/// Result type alias for redshift-qb operations
pub type QbResult<T> = Result<T, QbError>;

/// Errors raised while building or executing a query.
///
/// Driver failures (syntax errors, type mismatches, network and
/// authentication problems) are carried unmodified in [`QbError::Query`].
#[derive(Debug, Error)]
pub enum QbError {
    /// Error reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Session could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// An execute operation was called before `connect`
    #[error("Not connected: call connect() before executing queries")]
    NotConnected,

    /// Expected a row, got none
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cell decode/conversion error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Missing or invalid connection settings
    #[error("Config error: {0}")]
    Config(String),
}

impl QbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not connected error
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The underlying driver error, if any.
    pub fn as_driver_error(&self) -> Option<&tokio_postgres::Error> {
        match self {
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}
