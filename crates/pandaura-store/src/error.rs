//! Store errors.

use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Filesystem failure while opening the database.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid input (missing field, unknown enum value).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Offending id.
        id: String,
    },

    /// Uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Metadata JSON failed to encode or decode.
    #[error("metadata json: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
