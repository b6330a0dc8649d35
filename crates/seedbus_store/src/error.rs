//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The table does not exist in the store.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// The table that was requested.
        table: String,
    },

    /// A key column held something other than an integer key.
    #[error("invalid key in {table}.{column}: {value}")]
    InvalidKey {
        /// The table holding the row.
        table: String,
        /// The key column.
        column: String,
        /// Rendered offending value.
        value: String,
    },

    /// The backend refused the operation.
    #[error("store rejected operation: {0}")]
    Rejected(String),

    /// No store implementation is registered for the driver name.
    #[error("unsupported store driver: {driver}")]
    UnsupportedDriver {
        /// The requested driver.
        driver: String,
    },

    /// A required connection parameter is missing.
    #[error("driver {driver} requires parameter '{name}'")]
    MissingParameter {
        /// The driver being opened.
        driver: String,
        /// The missing parameter.
        name: String,
    },
}

impl StoreError {
    /// Creates a rejected-operation error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates an unknown table error.
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }
}
