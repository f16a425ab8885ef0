//! Deploy errors.

use pandaura_store::StoreError;
use pandaura_vault::VaultError;
use thiserror::Error;

/// Errors surfaced by deployment operations.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Structurally invalid input.
    #[error("validation: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Illegal state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Gate not satisfied (checks, approvals, rollback target).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Metadata row failure.
    #[error(transparent)]
    Store(StoreError),

    /// Version materialisation failure.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Metadata JSON failure.
    #[error("metadata json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DeployError::NotFound(format!("{entity} {id}")),
            StoreError::Conflict(msg) => DeployError::Conflict(msg),
            StoreError::InvalidInput(msg) => DeployError::Validation(msg),
            other => DeployError::Store(other),
        }
    }
}
