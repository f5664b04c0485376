//! Error types for the indexer.

use lto_index_core::CoreError;
use thiserror::Error;

/// Indexer error type.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// The storage backend could not be reached or rejected a command.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Block or height fetch failed.
    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    /// A transaction field could not be decoded.
    #[error("Malformed transaction {id}: {reason}")]
    MalformedTransaction {
        /// Transaction id.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A read request with out-of-range arguments.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IndexerError {
    /// Wrap a backend error as `StorageUnavailable`.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(err.to_string())
    }

    /// Wrap a node transport error as `NodeUnavailable`.
    pub fn node(err: impl std::fmt::Display) -> Self {
        Self::NodeUnavailable(err.to_string())
    }

    /// Build a `MalformedTransaction` error.
    pub fn malformed(id: &str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedTransaction {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err)
    }
}

impl From<sqlx::migrate::MigrateError> for IndexerError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("invalid stored document: {}", err))
    }
}

/// Result type alias for IndexerError.
pub type Result<T> = std::result::Result<T, IndexerError>;
