//! Post-deploy health probing.

use pandaura_store::rows::DeployRow;

/// Probe consulted after the rollout script completes.
///
/// A failure triggers automatic rollback with reason "Health checks failed".
pub trait HealthProbe {
    /// Return `Err` with a human-readable cause when the deployed image is
    /// unhealthy.
    fn check(&self, deploy: &DeployRow) -> Result<(), String>;
}

/// Probe that always passes; the default for environments without a
/// telemetry hookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

impl HealthProbe for AlwaysHealthy {
    fn check(&self, _deploy: &DeployRow) -> Result<(), String> {
        Ok(())
    }
}
