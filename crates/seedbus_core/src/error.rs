//! Error types for SeedBus core.

use crate::datasource::ResetFailure;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type SeedResult<T> = Result<T, SeedError>;

/// Errors that can occur in SeedBus core operations.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Store adapter error.
    #[error("store error: {0}")]
    Store(#[from] seedbus_store::StoreError),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration document could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration is structurally invalid.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Operation on an entity without a table mapping.
    #[error("entity '{entity}' has no table mapping")]
    UnmappedEntity {
        /// The entity name.
        entity: String,
    },

    /// Row lacks the name column the operation needs.
    #[error("row for entity '{entity}' is missing name column {}", .column.as_deref().unwrap_or("<none configured>"))]
    MissingNameColumn {
        /// The entity name.
        entity: String,
        /// The configured name column, if any.
        column: Option<String>,
    },

    /// Entity is not registered, or a named row could not be found.
    #[error("unknown entity '{entity}'{}", .name.as_ref().map(|n| format!(" for name '{n}'")).unwrap_or_default())]
    UnknownEntity {
        /// The entity name.
        entity: String,
        /// The name value that failed to resolve, if any.
        name: Option<String>,
    },

    /// More than one stored row carries a name that must be unique.
    #[error("{matches} rows in {table} have {column} = '{value}'; name column values must be unique")]
    AmbiguousNameColumn {
        /// The table searched.
        table: String,
        /// The name column.
        column: String,
        /// The name value.
        value: String,
        /// Number of matching rows.
        matches: usize,
    },

    /// No transform is registered under the name.
    #[error("data transformation '{name}' is not registered")]
    UnknownTransformation {
        /// The transform name.
        name: String,
    },

    /// Transform registration or name is malformed.
    #[error("invalid transform '{name}': {reason}")]
    InvalidTransform {
        /// The transform name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A transform could not convert a value.
    #[error("cannot convert '{value}': {reason}")]
    InvalidValue {
        /// Rendered input value.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// Raw table rows do not line up with the header.
    #[error("malformed table: {message}")]
    MalformedTable {
        /// Description of the problem.
        message: String,
    },

    /// Reset could not undo every recorded mutation.
    #[error("reset incomplete: {} step(s) failed{}", .failures.len(), .failures.first().map(|f| format!(", first: {f}")).unwrap_or_default())]
    ResetIncomplete {
        /// Every step that failed.
        failures: Vec<ResetFailure>,
    },
}

impl SeedError {
    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an unmapped entity error.
    pub fn unmapped_entity(entity: impl Into<String>) -> Self {
        Self::UnmappedEntity {
            entity: entity.into(),
        }
    }

    /// Creates an unknown entity error without a name.
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
            name: None,
        }
    }

    /// Creates an unknown entity error for a name that did not resolve.
    pub fn unknown_name(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
            name: Some(name.into()),
        }
    }

    /// Creates an unknown transformation error.
    pub fn unknown_transformation(name: impl Into<String>) -> Self {
        Self::UnknownTransformation { name: name.into() }
    }

    /// Creates an invalid transform error.
    pub fn invalid_transform(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransform {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed table error.
    pub fn malformed_table(message: impl Into<String>) -> Self {
        Self::MalformedTable {
            message: message.into(),
        }
    }
}
