//! Vault errors.

use pandaura_store::StoreError;
use thiserror::Error;

/// Errors surfaced by version, snapshot and release operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Structurally invalid input.
    #[error("validation: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or status-transition violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Gate not satisfied (promotion order, release status).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Stored content no longer matches its recorded checksum.
    #[error("integrity failure for '{path}': expected {expected}, got {actual}")]
    Integrity {
        /// Storage path of the offending blob.
        path: String,
        /// Recorded checksum.
        expected: String,
        /// Checksum of the retrieved content.
        actual: String,
    },

    /// Underlying storage failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata row failure.
    #[error(transparent)]
    Store(StoreError),

    /// Bundle or delta document failed to encode or decode.
    #[error("document json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => VaultError::NotFound(format!("{entity} {id}")),
            StoreError::Conflict(msg) => VaultError::Conflict(msg),
            StoreError::InvalidInput(msg) => VaultError::Validation(msg),
            other => VaultError::Store(other),
        }
    }
}
