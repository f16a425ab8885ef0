//! Deployment, approval, check, log and rollback rows.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{
    ApprovalStatus, ApproverRole, CheckSeverity, CheckStatus, CheckType, DeployApprovalRow,
    DeployCheckRow, DeployLogLevel, DeployLogRow, DeployRollbackRow, DeployRow, DeployStatus,
    DeployStrategy, RollbackStatus, Stage,
};

const DEPLOY_COLS: &str = "id, project_id, release_id, version_id, snapshot_id, deploy_name, \
                           environment, strategy, status, created_at_ms, started_at_ms, \
                           completed_at_ms, duration_seconds, estimated_downtime_seconds, \
                           initiated_by, approved_by, approval_count, approvals_required, \
                           target_runtimes_json, progress_percent, error_message, \
                           rollback_reason, previous_version_id, checks_passed";

fn map_deploy(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeployRow> {
    Ok(DeployRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        release_id: row.get(2)?,
        version_id: row.get(3)?,
        snapshot_id: row.get(4)?,
        deploy_name: row.get(5)?,
        environment: parse_col(6, Stage::parse(&row.get::<_, String>(6)?))?,
        strategy: parse_col(7, DeployStrategy::parse(&row.get::<_, String>(7)?))?,
        status: parse_col(8, DeployStatus::parse(&row.get::<_, String>(8)?))?,
        created_at_ms: row.get(9)?,
        started_at_ms: row.get(10)?,
        completed_at_ms: row.get(11)?,
        duration_seconds: row.get(12)?,
        estimated_downtime_seconds: row.get(13)?,
        initiated_by: row.get(14)?,
        approved_by: row.get(15)?,
        approval_count: row.get(16)?,
        approvals_required: row.get(17)?,
        target_runtimes_json: row.get(18)?,
        progress_percent: row.get(19)?,
        error_message: row.get(20)?,
        rollback_reason: row.get(21)?,
        previous_version_id: row.get(22)?,
        checks_passed: row.get(23)?,
    })
}

const APPROVAL_COLS: &str = "id, deploy_id, approver_name, approver_role, status, comment, \
                             requested_at_ms, responded_at_ms, is_required";

fn map_approval(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeployApprovalRow> {
    Ok(DeployApprovalRow {
        id: row.get(0)?,
        deploy_id: row.get(1)?,
        approver_name: row.get(2)?,
        approver_role: parse_col(3, ApproverRole::parse(&row.get::<_, String>(3)?))?,
        status: parse_col(4, ApprovalStatus::parse(&row.get::<_, String>(4)?))?,
        comment: row.get(5)?,
        requested_at_ms: row.get(6)?,
        responded_at_ms: row.get(7)?,
        is_required: row.get(8)?,
    })
}

const CHECK_COLS: &str =
    "id, deploy_id, name, check_type, status, severity, message, details_json, duration_ms";

fn map_check(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeployCheckRow> {
    Ok(DeployCheckRow {
        id: row.get(0)?,
        deploy_id: row.get(1)?,
        name: row.get(2)?,
        check_type: parse_col(3, CheckType::parse(&row.get::<_, String>(3)?))?,
        status: parse_col(4, CheckStatus::parse(&row.get::<_, String>(4)?))?,
        severity: parse_col(5, CheckSeverity::parse(&row.get::<_, String>(5)?))?,
        message: row.get(6)?,
        details_json: row.get(7)?,
        duration_ms: row.get(8)?,
    })
}

impl Store {
    /// Insert a deployment row.
    pub fn insert_deploy(&self, deploy: &DeployRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO deployments ({DEPLOY_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
                  ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
            ),
            params![
                deploy.id,
                deploy.project_id,
                deploy.release_id,
                deploy.version_id,
                deploy.snapshot_id,
                deploy.deploy_name,
                deploy.environment.as_str(),
                deploy.strategy.as_str(),
                deploy.status.as_str(),
                deploy.created_at_ms,
                deploy.started_at_ms,
                deploy.completed_at_ms,
                deploy.duration_seconds,
                deploy.estimated_downtime_seconds,
                deploy.initiated_by,
                deploy.approved_by,
                deploy.approval_count,
                deploy.approvals_required,
                deploy.target_runtimes_json,
                deploy.progress_percent,
                deploy.error_message,
                deploy.rollback_reason,
                deploy.previous_version_id,
                deploy.checks_passed,
            ],
        )?;
        Ok(())
    }

    /// Fetch a deployment by id.
    pub fn get_deploy(&self, id: &str) -> Result<DeployRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {DEPLOY_COLS} FROM deployments WHERE id = ?1"),
                params![id],
                map_deploy,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("deployment", id))
    }

    /// List a project's deployments, newest first.
    pub fn list_deploys(&self, project_id: &str) -> Result<Vec<DeployRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEPLOY_COLS} FROM deployments WHERE project_id = ?1
             ORDER BY created_at_ms DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], map_deploy)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The most recent successful deployment for (project, environment).
    pub fn last_successful_deploy(
        &self,
        project_id: &str,
        environment: Stage,
    ) -> Result<Option<DeployRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {DEPLOY_COLS} FROM deployments
                     WHERE project_id = ?1 AND environment = ?2 AND status = 'success'
                     ORDER BY completed_at_ms DESC, created_at_ms DESC LIMIT 1"
                ),
                params![project_id, environment.as_str()],
                map_deploy,
            )
            .optional()?)
    }

    /// Write deployment status plus the narrow fields that move with it.
    #[allow(clippy::too_many_arguments)]
    pub fn update_deploy_progress(
        &self,
        id: &str,
        status: DeployStatus,
        progress_percent: i64,
        started_at_ms: Option<i64>,
        completed_at_ms: Option<i64>,
        duration_seconds: Option<i64>,
        error_message: Option<&str>,
        rollback_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE deployments SET status = ?2, progress_percent = ?3,
                 started_at_ms = COALESCE(?4, started_at_ms),
                 completed_at_ms = COALESCE(?5, completed_at_ms),
                 duration_seconds = COALESCE(?6, duration_seconds),
                 error_message = COALESCE(?7, error_message),
                 rollback_reason = COALESCE(?8, rollback_reason)
             WHERE id = ?1",
            params![
                id,
                status.as_str(),
                progress_percent,
                started_at_ms,
                completed_at_ms,
                duration_seconds,
                error_message,
                rollback_reason,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("deployment", id));
        }
        Ok(())
    }

    /// Write the aggregate checks outcome.
    pub fn set_deploy_checks_passed(&self, id: &str, passed: bool) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE deployments SET checks_passed = ?2 WHERE id = ?1",
            params![id, passed],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("deployment", id));
        }
        Ok(())
    }

    /// Write the approval tally; `approved_by` is the most recent approver.
    pub fn set_deploy_approval_count(
        &self,
        id: &str,
        approval_count: i64,
        approved_by: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE deployments SET approval_count = ?2,
                 approved_by = COALESCE(?3, approved_by)
             WHERE id = ?1",
            params![id, approval_count, approved_by],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("deployment", id));
        }
        Ok(())
    }

    /// Insert an approval request.
    pub fn insert_approval(&self, approval: &DeployApprovalRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO deploy_approvals ({APPROVAL_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                approval.id,
                approval.deploy_id,
                approval.approver_name,
                approval.approver_role.as_str(),
                approval.status.as_str(),
                approval.comment,
                approval.requested_at_ms,
                approval.responded_at_ms,
                approval.is_required,
            ],
        )?;
        Ok(())
    }

    /// Fetch an approval by id.
    pub fn get_approval(&self, id: &str) -> Result<DeployApprovalRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {APPROVAL_COLS} FROM deploy_approvals WHERE id = ?1"),
                params![id],
                map_approval,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("approval", id))
    }

    /// A deployment's approvals in request order.
    pub fn list_approvals(&self, deploy_id: &str) -> Result<Vec<DeployApprovalRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPROVAL_COLS} FROM deploy_approvals
             WHERE deploy_id = ?1 ORDER BY requested_at_ms, id"
        ))?;
        let rows = stmt.query_map(params![deploy_id], map_approval)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Record an approval response.
    pub fn respond_approval(
        &self,
        id: &str,
        approver_name: &str,
        status: ApprovalStatus,
        comment: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE deploy_approvals SET approver_name = ?2, status = ?3, comment = ?4,
                 responded_at_ms = ?5
             WHERE id = ?1",
            params![id, approver_name, status.as_str(), comment, now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("approval", id));
        }
        Ok(())
    }

    /// Count approvals with status approved.
    pub fn count_approved(&self, deploy_id: &str) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM deploy_approvals WHERE deploy_id = ?1 AND status = 'approved'",
            params![deploy_id],
            |row| row.get(0),
        )?)
    }

    /// Insert or replace a check result (reruns overwrite by id).
    pub fn upsert_check(&self, check: &DeployCheckRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO deploy_checks ({CHECK_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                check.id,
                check.deploy_id,
                check.name,
                check.check_type.as_str(),
                check.status.as_str(),
                check.severity.as_str(),
                check.message,
                check.details_json,
                check.duration_ms,
            ],
        )?;
        Ok(())
    }

    /// Remove a deployment's check rows (before a rerun).
    pub fn clear_checks(&self, deploy_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM deploy_checks WHERE deploy_id = ?1",
            params![deploy_id],
        )?;
        Ok(())
    }

    /// A deployment's check rows in insertion order.
    pub fn list_checks(&self, deploy_id: &str) -> Result<Vec<DeployCheckRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHECK_COLS} FROM deploy_checks WHERE deploy_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![deploy_id], map_check)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Append a structured log entry.
    pub fn append_deploy_log(
        &self,
        deploy_id: &str,
        level: DeployLogLevel,
        message: &str,
        step: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO deploy_logs (deploy_id, timestamp_ms, level, message, step)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![deploy_id, now_ms, level.as_str(), message, step],
        )?;
        Ok(())
    }

    /// A deployment's log, oldest first.
    pub fn list_deploy_logs(&self, deploy_id: &str) -> Result<Vec<DeployLogRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deploy_id, timestamp_ms, level, message, step
             FROM deploy_logs WHERE deploy_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![deploy_id], |row| {
            Ok(DeployLogRow {
                id: row.get(0)?,
                deploy_id: row.get(1)?,
                timestamp_ms: row.get(2)?,
                level: parse_col(3, DeployLogLevel::parse(&row.get::<_, String>(3)?))?,
                message: row.get(4)?,
                step: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert a rollback row.
    pub fn insert_rollback(&self, rollback: &DeployRollbackRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO deploy_rollbacks
                 (id, deploy_id, triggered_by, reason, triggered_at_ms, completed_at_ms,
                  status, is_automatic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rollback.id,
                rollback.deploy_id,
                rollback.triggered_by,
                rollback.reason,
                rollback.triggered_at_ms,
                rollback.completed_at_ms,
                rollback.status.as_str(),
                rollback.is_automatic,
            ],
        )?;
        Ok(())
    }

    /// Finish a rollback row.
    pub fn complete_rollback(
        &self,
        id: &str,
        status: RollbackStatus,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE deploy_rollbacks SET status = ?2, completed_at_ms = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("rollback", id));
        }
        Ok(())
    }

    /// A deployment's rollbacks, oldest first.
    pub fn list_rollbacks(&self, deploy_id: &str) -> Result<Vec<DeployRollbackRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deploy_id, triggered_by, reason, triggered_at_ms, completed_at_ms,
                    status, is_automatic
             FROM deploy_rollbacks WHERE deploy_id = ?1 ORDER BY triggered_at_ms, id",
        )?;
        let rows = stmt.query_map(params![deploy_id], |row| {
            Ok(DeployRollbackRow {
                id: row.get(0)?,
                deploy_id: row.get(1)?,
                triggered_by: row.get(2)?,
                reason: row.get(3)?,
                triggered_at_ms: row.get(4)?,
                completed_at_ms: row.get(5)?,
                status: parse_col(6, RollbackStatus::parse(&row.get::<_, String>(6)?))?,
                is_automatic: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
