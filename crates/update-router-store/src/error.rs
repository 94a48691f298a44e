//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Connection(#[from] sqlx::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Seed data could not be read or applied.
    #[error("seed error: {0}")]
    Seed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The store handle has been closed.
    #[error("store is closed")]
    Closed,
}
