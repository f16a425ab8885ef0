//! Control errors.

use pandaura_deploy::DeployError;
use pandaura_runtime::RuntimeError;
use pandaura_store::StoreError;
use pandaura_vault::VaultError;
use thiserror::Error;

/// Errors surfaced to external callers, with a remediation hint where one
/// exists.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Structurally invalid command.
    #[error("validation: {0}")]
    Validation(String),

    /// Logic failed syntactic validation; issues carry line/column.
    #[error("logic is not valid: {0}")]
    InvalidLogic(String),

    /// Runtime rejected the operation.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Version/snapshot/release failure.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Deployment failure.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Event payload failure.
    #[error("event json: {0}")]
    Json(#[from] serde_json::Error),
}
