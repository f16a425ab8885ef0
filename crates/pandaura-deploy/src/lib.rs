//! `pandaura-deploy` - gated multi-stage deployment workflow.
//!
//! A deployment is created `pending` with its safety checks and approval
//! requests; it may only start once every critical check passed and the
//! approval quota for its target environment is met. The rollout drives a
//! fixed step script with progress breadcrumbs and structured logs, runs
//! post-deploy health checks, and rolls back automatically when they fail.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Safety-check pipeline.
pub mod checks;
/// The deployment engine and state machine.
pub mod engine;
/// Deploy errors.
pub mod error;
/// Post-deploy health probing.
pub mod health;

pub use engine::{CreateDeployment, DeployEngine};
pub use error::DeployError;
pub use health::{AlwaysHealthy, HealthProbe};
