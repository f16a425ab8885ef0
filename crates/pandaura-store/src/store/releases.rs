//! Release rows.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{ReleaseRow, ReleaseStatus, Stage};

const RELEASE_COLS: &str = "id, project_id, snapshot_id, version_id, name, version_label, \
                            environment, bundle_path, bundle_size, bundle_checksum, signed, \
                            signature, signed_by, status, linked_deploys, last_deployed_at_ms, \
                            metadata_json, created_at_ms";

fn map_release(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReleaseRow> {
    Ok(ReleaseRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        snapshot_id: row.get(2)?,
        version_id: row.get(3)?,
        name: row.get(4)?,
        version_label: row.get(5)?,
        environment: parse_col(6, Stage::parse(&row.get::<_, String>(6)?))?,
        bundle_path: row.get(7)?,
        bundle_size: row.get(8)?,
        bundle_checksum: row.get(9)?,
        signed: row.get(10)?,
        signature: row.get(11)?,
        signed_by: row.get(12)?,
        status: parse_col(13, ReleaseStatus::parse(&row.get::<_, String>(13)?))?,
        linked_deploys: row.get(14)?,
        last_deployed_at_ms: row.get(15)?,
        metadata_json: row.get(16)?,
        created_at_ms: row.get(17)?,
    })
}

impl Store {
    /// Insert a release row.
    pub fn insert_release(&self, release: &ReleaseRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO releases ({RELEASE_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ),
            params![
                release.id,
                release.project_id,
                release.snapshot_id,
                release.version_id,
                release.name,
                release.version_label,
                release.environment.as_str(),
                release.bundle_path,
                release.bundle_size,
                release.bundle_checksum,
                release.signed,
                release.signature,
                release.signed_by,
                release.status.as_str(),
                release.linked_deploys,
                release.last_deployed_at_ms,
                release.metadata_json,
                release.created_at_ms,
            ],
        )?;
        Ok(())
    }

    /// Fetch a release by id.
    pub fn get_release(&self, id: &str) -> Result<ReleaseRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {RELEASE_COLS} FROM releases WHERE id = ?1"),
                params![id],
                map_release,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("release", id))
    }

    /// List a project's releases, newest first.
    pub fn list_releases(&self, project_id: &str) -> Result<Vec<ReleaseRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RELEASE_COLS} FROM releases WHERE project_id = ?1
             ORDER BY created_at_ms DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], map_release)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Write a release's status.
    pub fn update_release_status(
        &self,
        id: &str,
        status: ReleaseStatus,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE releases SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("release", id));
        }
        Ok(())
    }

    /// Record a promotion on the release: replace metadata, bump
    /// `linked_deploys`, stamp the deploy time.
    pub fn record_release_promotion(
        &self,
        id: &str,
        metadata_json: &str,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE releases SET metadata_json = ?2,
                 linked_deploys = linked_deploys + 1,
                 last_deployed_at_ms = ?3
             WHERE id = ?1",
            params![id, metadata_json, now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("release", id));
        }
        Ok(())
    }
}
