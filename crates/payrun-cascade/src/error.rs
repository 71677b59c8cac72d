//! Error types for cascade and store operations.

use crate::domain::{RecordId, TableName};
use std::io;
use thiserror::Error;

/// The error type for payrun-cascade operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A store primitive targeted a record that does not exist.
    #[error("Record not found: {table}:{id}")]
    NotFound {
        /// Table the record was expected in.
        table: TableName,
        /// The missing record's identifier.
        id: RecordId,
    },

    /// Backend-specific store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// The root record of a cascade could not be deleted.
    ///
    /// Dependents processed before the failure are not restored.
    #[error("Failed to delete {table}:{id}: {source}")]
    DeleteFailed {
        /// Table of the record that could not be deleted.
        table: TableName,
        /// Identifier of the record that could not be deleted.
        id: RecordId,
        /// The underlying store failure.
        #[source]
        source: Box<Error>,
    },

    /// The depth guard tripped while the engine was configured to fail on it.
    #[error("Cascade depth exceeded at {table}:{id} (depth {depth}, max {max_depth})")]
    DepthExceeded {
        /// Table of the record beyond the bound.
        table: TableName,
        /// Identifier of the record beyond the bound.
        id: RecordId,
        /// Depth the record was reached at.
        depth: usize,
        /// Configured maximum depth.
        max_depth: usize,
    },

    /// The dependency graph declaration is invalid.
    #[error("Invalid dependency graph: {0}")]
    Graph(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(table: &TableName, id: &RecordId) -> Self {
        Error::NotFound {
            table: table.clone(),
            id: id.clone(),
        }
    }
}

/// A specialized Result type for payrun-cascade operations.
pub type Result<T> = std::result::Result<T, Error>;
