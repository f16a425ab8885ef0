//! Snapshots and stage promotion.
//!
//! A snapshot is a named, mutable-metadata pointer to a single immutable
//! version. Promotions advance a snapshot through `dev < qa < staging <
//! prod` one stage at a time; promoting into staging or prod mints a
//! release.

use pandaura_store::rows::{PromotionRow, ReleaseRow, SnapshotRow, Stage};
use pandaura_store::Store;
use tracing::info;

use crate::error::VaultError;
use crate::ids::new_id;
use crate::releases::{self, CreateRelease};
use crate::versions::VersionEngine;

/// Inputs to [`VersionEngine::create_snapshot`].
#[derive(Debug, Clone)]
pub struct CreateSnapshot {
    #[allow(missing_docs)]
    pub project_id: String,
    #[allow(missing_docs)]
    pub version_id: String,
    /// Unique per project.
    pub name: String,
    #[allow(missing_docs)]
    pub description: Option<String>,
    /// Free-form labels.
    pub tags: Vec<String>,
    #[allow(missing_docs)]
    pub created_by: String,
}

/// Outcome of a promotion: the record plus the release minted, if any.
#[derive(Debug)]
pub struct PromotionOutcome {
    /// The recorded promotion.
    pub promotion: PromotionRow,
    /// Release minted when promoting into staging or prod.
    pub release: Option<ReleaseRow>,
}

impl<'a> VersionEngine<'a> {
    /// Create a snapshot pointing at a version. No file copies are made.
    pub fn create_snapshot(&self, input: CreateSnapshot) -> Result<SnapshotRow, VaultError> {
        self.store.get_version(&input.version_id)?;
        let snapshot = SnapshotRow {
            id: new_id("snap"),
            project_id: input.project_id,
            version_id: input.version_id,
            name: input.name,
            description: input.description,
            tags_json: serde_json::to_string(&input.tags)?,
            created_by: input.created_by,
            created_at_ms: Store::now_ms(),
        };
        self.store.insert_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Promote a snapshot to `to_stage`.
    ///
    /// The from-stage derives from the latest promotion (default `dev`).
    /// Stages advance strictly one step at a time; a missing predecessor
    /// fails the gate.
    pub fn promote_snapshot(
        &self,
        snapshot_id: &str,
        to_stage: Stage,
        promoted_by: &str,
        notes: Option<&str>,
    ) -> Result<PromotionOutcome, VaultError> {
        let snapshot = self.store.get_snapshot(snapshot_id)?;
        let from_stage = self
            .store
            .last_promotion(snapshot_id)?
            .map(|p| p.to_stage)
            .unwrap_or(Stage::Dev);

        let from_rank = from_stage.promotion_rank().ok_or_else(|| {
            VaultError::Validation(format!("stage '{from_stage}' is outside the promotion order"))
        })?;
        let to_rank = to_stage.promotion_rank().ok_or_else(|| {
            VaultError::Validation(format!("stage '{to_stage}' is outside the promotion order"))
        })?;
        if to_rank != from_rank + 1 {
            return Err(VaultError::PreconditionFailed(promotion_gate_message(
                from_stage, to_stage,
            )));
        }

        let promotion = PromotionRow {
            id: new_id("promo"),
            snapshot_id: snapshot_id.to_string(),
            from_stage,
            to_stage,
            promoted_by: promoted_by.to_string(),
            promoted_at_ms: Store::now_ms(),
            notes: notes.map(str::to_string),
            checks_passed: true,
        };
        self.store.insert_promotion(&promotion)?;
        info!(snapshot = snapshot_id, from = %from_stage, to = %to_stage, "snapshot promoted");

        // Promotion into staging or prod mints a release for that stage.
        let release = if matches!(to_stage, Stage::Staging | Stage::Prod) {
            Some(releases::create_release(
                self,
                CreateRelease {
                    project_id: snapshot.project_id.clone(),
                    snapshot_id: Some(snapshot.id.clone()),
                    version_id: snapshot.version_id.clone(),
                    name: Some(format!("{}-{}", snapshot.name, to_stage)),
                    environment: to_stage,
                    created_by: promoted_by.to_string(),
                },
            )?)
        } else {
            None
        };

        Ok(PromotionOutcome { promotion, release })
    }
}

/// Gate message naming the missing predecessor stage.
fn promotion_gate_message(from: Stage, to: Stage) -> String {
    match to {
        Stage::Staging => format!("requires prior QA promotion (snapshot is at {from})"),
        Stage::Prod => format!("requires prior staging promotion (snapshot is at {from})"),
        other => format!("cannot promote from {from} to {other}"),
    }
}
