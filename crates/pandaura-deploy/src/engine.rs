//! The deployment engine and state machine.

use pandaura_store::rows::{
    ApprovalStatus, ApproverRole, DeployApprovalRow, DeployLogLevel, DeployRollbackRow, DeployRow,
    DeployStatus, DeployStrategy, RollbackStatus, Stage,
};
use pandaura_store::Store;
use pandaura_vault::blob::BlobStore;
use pandaura_vault::ids::new_id;
use pandaura_vault::VersionEngine;
use tracing::{info, warn};

use crate::checks::{self, CheckContext};
use crate::error::DeployError;
use crate::health::HealthProbe;

/// The rollout script: step name and the progress breadcrumb it leaves.
pub const ROLLOUT_STEPS: [(&str, i64); 7] = [
    ("validation", 10),
    ("backup", 25),
    ("upload", 40),
    ("compile", 60),
    ("apply", 75),
    ("verify", 90),
    ("complete", 100),
];

/// Inputs to [`DeployEngine::create_deployment`].
#[derive(Debug, Clone)]
pub struct CreateDeployment {
    #[allow(missing_docs)]
    pub project_id: String,
    #[allow(missing_docs)]
    pub release_id: String,
    #[allow(missing_docs)]
    pub deploy_name: String,
    #[allow(missing_docs)]
    pub environment: Stage,
    #[allow(missing_docs)]
    pub strategy: DeployStrategy,
    #[allow(missing_docs)]
    pub initiated_by: String,
    /// Runtime ids the rollout targets.
    pub target_runtimes: Vec<String>,
    #[allow(missing_docs)]
    pub estimated_downtime_seconds: i64,
}

/// Approvals required per target environment.
#[must_use]
pub fn approvals_required_for(environment: Stage) -> i64 {
    match environment {
        Stage::Staging => 1,
        Stage::Prod => 2,
        Stage::Main | Stage::Dev | Stage::Qa => 0,
    }
}

/// Approver roles required per target environment.
#[must_use]
pub fn required_roles_for(environment: Stage) -> Vec<ApproverRole> {
    match environment {
        Stage::Staging => vec![ApproverRole::OperationsManager],
        Stage::Prod => vec![ApproverRole::SafetyEngineer, ApproverRole::LeadDeveloper],
        Stage::Main | Stage::Dev | Stage::Qa => Vec::new(),
    }
}

/// Deployment operations over the store and the version engine.
pub struct DeployEngine<'a> {
    store: &'a Store,
    blobs: &'a BlobStore,
}

impl<'a> DeployEngine<'a> {
    /// Build an engine over borrowed storage handles.
    #[must_use]
    pub fn new(store: &'a Store, blobs: &'a BlobStore) -> Self {
        Self { store, blobs }
    }

    fn versions(&self) -> VersionEngine<'a> {
        VersionEngine::new(self.store, self.blobs)
    }

    /// Create a deployment: validate promotion history, derive the rollback
    /// target and approval quota, insert approval requests, and run the
    /// safety checks. The record stays `pending` regardless of check
    /// outcome; `checks_passed` gates `start`.
    pub fn create_deployment(&self, input: CreateDeployment) -> Result<DeployRow, DeployError> {
        let release = self.store.get_release(&input.release_id)?;
        self.validate_stage_progression(release.snapshot_id.as_deref(), input.environment)?;

        let previous_version_id = self
            .store
            .last_successful_deploy(&input.project_id, input.environment)?
            .map(|d| d.version_id);
        let approvals_required = approvals_required_for(input.environment);
        let now_ms = Store::now_ms();

        let deploy = DeployRow {
            id: new_id("dep"),
            project_id: input.project_id.clone(),
            release_id: release.id.clone(),
            version_id: release.version_id.clone(),
            snapshot_id: release.snapshot_id.clone(),
            deploy_name: input.deploy_name.clone(),
            environment: input.environment,
            strategy: input.strategy,
            status: DeployStatus::Pending,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            duration_seconds: None,
            estimated_downtime_seconds: input.estimated_downtime_seconds,
            initiated_by: input.initiated_by.clone(),
            approved_by: None,
            approval_count: 0,
            approvals_required,
            target_runtimes_json: serde_json::to_string(&input.target_runtimes)?,
            progress_percent: 0,
            error_message: None,
            rollback_reason: None,
            previous_version_id,
            checks_passed: false,
        };
        self.store.insert_deploy(&deploy)?;

        for role in required_roles_for(input.environment) {
            self.store.insert_approval(&DeployApprovalRow {
                id: new_id("appr"),
                deploy_id: deploy.id.clone(),
                approver_name: None,
                approver_role: role,
                status: ApprovalStatus::Pending,
                comment: None,
                requested_at_ms: now_ms,
                responded_at_ms: None,
                is_required: true,
            })?;
        }

        self.run_checks(&deploy.id)?;
        self.store.append_deploy_log(
            &deploy.id,
            DeployLogLevel::Info,
            &format!(
                "deployment created for {} ({})",
                release.name, input.environment
            ),
            None,
            now_ms,
        )?;
        info!(deploy = %deploy.id, environment = %input.environment, "deployment created");
        self.store.get_deploy(&deploy.id).map_err(Into::into)
    }

    /// Deployments into staging need a prior QA promotion; production needs
    /// a prior staging promotion. Releases without a snapshot (minted
    /// directly from a version) carry their own provenance and pass.
    fn validate_stage_progression(
        &self,
        snapshot_id: Option<&str>,
        environment: Stage,
    ) -> Result<(), DeployError> {
        let Some(snapshot_id) = snapshot_id else {
            return Ok(());
        };
        let required = match environment {
            Stage::Staging => Some(Stage::Qa),
            Stage::Prod => Some(Stage::Staging),
            Stage::Main | Stage::Dev | Stage::Qa => None,
        };
        let Some(required) = required else {
            return Ok(());
        };
        let promotions = self.store.list_promotions(snapshot_id)?;
        if !promotions.iter().any(|p| p.to_stage == required) {
            return Err(DeployError::PreconditionFailed(format!(
                "deploying to {environment} requires a prior {required} promotion"
            )));
        }
        Ok(())
    }

    /// Run (or rerun) the safety-check suite and persist the outcome.
    pub fn run_checks(&self, deploy_id: &str) -> Result<bool, DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        let files = self.versions().materialize_files(&deploy.version_id)?;
        let tags = self.store.list_tags(&deploy.project_id)?;
        let context = CheckContext {
            files: &files,
            tags: &tags,
            estimated_downtime_seconds: deploy.estimated_downtime_seconds,
        };
        self.store.clear_checks(deploy_id)?;
        let rows = checks::run_suite(deploy_id, &context);
        for row in &rows {
            self.store.upsert_check(row)?;
        }
        let passed = checks::all_critical_passed(&rows);
        self.store.set_deploy_checks_passed(deploy_id, passed)?;
        if !passed {
            warn!(deploy = deploy_id, "safety checks failed");
        }
        Ok(passed)
    }

    /// Record an approval response and recount the deployment's tally.
    pub fn submit_approval(
        &self,
        approval_id: &str,
        approver_name: &str,
        status: ApprovalStatus,
        comment: Option<&str>,
    ) -> Result<DeployRow, DeployError> {
        if status == ApprovalStatus::Pending {
            return Err(DeployError::Validation(
                "approval response cannot be 'pending'".into(),
            ));
        }
        let approval = self.store.get_approval(approval_id)?;
        self.store.respond_approval(
            approval_id,
            approver_name,
            status,
            comment,
            Store::now_ms(),
        )?;
        let count = self.store.count_approved(&approval.deploy_id)?;
        // Last writer wins for approved_by; history stays in the table.
        let approved_by = (status == ApprovalStatus::Approved).then_some(approver_name);
        self.store
            .set_deploy_approval_count(&approval.deploy_id, count, approved_by)?;
        self.store.get_deploy(&approval.deploy_id).map_err(Into::into)
    }

    /// Start the rollout. Requires `checks_passed` and the approval quota.
    pub fn start_deployment(
        &self,
        deploy_id: &str,
        health: &dyn HealthProbe,
    ) -> Result<DeployRow, DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        if deploy.status != DeployStatus::Pending {
            return Err(DeployError::Conflict(format!(
                "deployment {deploy_id} is {} and cannot start",
                deploy.status
            )));
        }
        if !deploy.checks_passed {
            return Err(DeployError::PreconditionFailed("safety checks failed".into()));
        }
        if deploy.approval_count < deploy.approvals_required {
            return Err(DeployError::PreconditionFailed(format!(
                "insufficient approvals: {}/{}",
                deploy.approval_count, deploy.approvals_required
            )));
        }

        let now_ms = Store::now_ms();
        self.store.update_deploy_progress(
            deploy_id,
            DeployStatus::Running,
            0,
            Some(now_ms),
            None,
            None,
            None,
            None,
        )?;
        self.store.append_deploy_log(
            deploy_id,
            DeployLogLevel::Info,
            "deployment started",
            None,
            now_ms,
        )?;
        self.drive_steps(deploy_id, 0, health)
    }

    /// Resume a paused deployment at the first step not yet logged.
    pub fn resume_deployment(
        &self,
        deploy_id: &str,
        health: &dyn HealthProbe,
    ) -> Result<DeployRow, DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        if deploy.status != DeployStatus::Paused {
            return Err(DeployError::Conflict(format!(
                "deployment {deploy_id} is {} and cannot resume",
                deploy.status
            )));
        }
        let logs = self.store.list_deploy_logs(deploy_id)?;
        let done: Vec<&str> = logs.iter().filter_map(|l| l.step.as_deref()).collect();
        let next = ROLLOUT_STEPS
            .iter()
            .position(|(name, _)| !done.contains(name))
            .unwrap_or(ROLLOUT_STEPS.len());
        self.store.update_deploy_progress(
            deploy_id,
            DeployStatus::Running,
            self.store.get_deploy(deploy_id)?.progress_percent,
            None,
            None,
            None,
            None,
            None,
        )?;
        self.drive_steps(deploy_id, next, health)
    }

    /// Pause a running or pending deployment without tearing down state.
    pub fn pause_deployment(&self, deploy_id: &str) -> Result<(), DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        if !matches!(deploy.status, DeployStatus::Running | DeployStatus::Pending) {
            return Err(DeployError::Conflict(format!(
                "deployment {deploy_id} is {} and cannot pause",
                deploy.status
            )));
        }
        self.store.update_deploy_progress(
            deploy_id,
            DeployStatus::Paused,
            deploy.progress_percent,
            None,
            None,
            None,
            None,
            None,
        )?;
        self.store.append_deploy_log(
            deploy_id,
            DeployLogLevel::Warning,
            "deployment paused",
            None,
            Store::now_ms(),
        )?;
        Ok(())
    }

    /// Cancel a deployment: `failed` plus a log entry.
    pub fn cancel_deployment(&self, deploy_id: &str, by: &str) -> Result<(), DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        if matches!(
            deploy.status,
            DeployStatus::Success | DeployStatus::RolledBack | DeployStatus::Failed
        ) {
            return Err(DeployError::Conflict(format!(
                "deployment {deploy_id} already finished as {}",
                deploy.status
            )));
        }
        self.store.update_deploy_progress(
            deploy_id,
            DeployStatus::Failed,
            deploy.progress_percent,
            None,
            Some(Store::now_ms()),
            None,
            Some(&format!("cancelled by {by}")),
            None,
        )?;
        self.store.append_deploy_log(
            deploy_id,
            DeployLogLevel::Error,
            &format!("deployment cancelled by {by}"),
            None,
            Store::now_ms(),
        )?;
        Ok(())
    }

    fn drive_steps(
        &self,
        deploy_id: &str,
        from_step: usize,
        health: &dyn HealthProbe,
    ) -> Result<DeployRow, DeployError> {
        for &(name, progress) in ROLLOUT_STEPS.iter().skip(from_step) {
            let now_ms = Store::now_ms();
            let final_step = progress == 100;
            if final_step {
                let deploy = self.store.get_deploy(deploy_id)?;
                let duration = deploy
                    .started_at_ms
                    .map(|started| ((now_ms - started) / 1000).max(0));
                self.store.update_deploy_progress(
                    deploy_id,
                    DeployStatus::Success,
                    progress,
                    None,
                    Some(now_ms),
                    duration,
                    None,
                    None,
                )?;
                self.store.append_deploy_log(
                    deploy_id,
                    DeployLogLevel::Success,
                    "deployment completed",
                    Some(name),
                    now_ms,
                )?;
            } else {
                self.store.update_deploy_progress(
                    deploy_id,
                    DeployStatus::Running,
                    progress,
                    None,
                    None,
                    None,
                    None,
                    None,
                )?;
                self.store.append_deploy_log(
                    deploy_id,
                    DeployLogLevel::Info,
                    &format!("step {name} complete"),
                    Some(name),
                    now_ms,
                )?;
            }
        }

        // Post-deploy health; failure triggers automatic rollback.
        let deploy = self.store.get_deploy(deploy_id)?;
        if let Err(cause) = health.check(&deploy) {
            warn!(deploy = deploy_id, %cause, "post-deploy health failed");
            self.store.append_deploy_log(
                deploy_id,
                DeployLogLevel::Error,
                &format!("health checks failed: {cause}"),
                None,
                Store::now_ms(),
            )?;
            self.execute_rollback(deploy_id, "system", "Health checks failed", true)?;
        }
        self.store.get_deploy(deploy_id).map_err(Into::into)
    }

    /// Roll back to the deployment's `previous_version_id`.
    pub fn execute_rollback(
        &self,
        deploy_id: &str,
        triggered_by: &str,
        reason: &str,
        is_automatic: bool,
    ) -> Result<DeployRollbackRow, DeployError> {
        let deploy = self.store.get_deploy(deploy_id)?;
        let previous_version_id = deploy.previous_version_id.clone().ok_or_else(|| {
            DeployError::PreconditionFailed("no previous version to roll back to".into())
        })?;

        let now_ms = Store::now_ms();
        let rollback = DeployRollbackRow {
            id: new_id("rb"),
            deploy_id: deploy_id.to_string(),
            triggered_by: triggered_by.to_string(),
            reason: reason.to_string(),
            triggered_at_ms: now_ms,
            completed_at_ms: None,
            status: RollbackStatus::Running,
            is_automatic,
        };
        self.store.insert_rollback(&rollback)?;
        self.store.append_deploy_log(
            deploy_id,
            DeployLogLevel::Warning,
            &format!("rolling back to version {previous_version_id}: {reason}"),
            None,
            now_ms,
        )?;

        // Model-level rollback: re-materialise the previous version as the
        // active image; the sync surface pushes it to the target runtime.
        self.versions().materialize_files(&previous_version_id)?;

        self.store.update_deploy_progress(
            deploy_id,
            DeployStatus::RolledBack,
            deploy.progress_percent,
            None,
            Some(Store::now_ms()),
            None,
            None,
            Some(reason),
        )?;
        self.store
            .complete_rollback(&rollback.id, RollbackStatus::Success, Store::now_ms())?;
        info!(deploy = deploy_id, to = %previous_version_id, "rollback complete");
        self.store
            .list_rollbacks(deploy_id)?
            .into_iter()
            .find(|r| r.id == rollback.id)
            .ok_or_else(|| DeployError::NotFound(format!("rollback {}", rollback.id)))
    }
}
