//! Error types for fueltrack-store.

use std::path::PathBuf;

/// Result type for fueltrack-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fueltrack-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A row expected to exist was not found.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A stored value could not be interpreted.
    #[error(transparent)]
    InvalidValue(#[from] fueltrack_types::ParseError),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
