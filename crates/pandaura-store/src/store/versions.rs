//! Version, version-file and changelog rows.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{ChangelogRow, FileChangeType, VersionFileRow, VersionRow, VersionStatus};

const VERSION_COLS: &str = "id, project_id, branch_id, label, author, message, status, checksum, \
                            parent_version_id, approvals, approvals_required, approvers_json, \
                            signed, signature, signed_by, signed_at, original_size, \
                            compressed_size, created_at_ms";

fn map_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionRow> {
    Ok(VersionRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        branch_id: row.get(2)?,
        label: row.get(3)?,
        author: row.get(4)?,
        message: row.get(5)?,
        status: parse_col(6, VersionStatus::parse(&row.get::<_, String>(6)?))?,
        checksum: row.get(7)?,
        parent_version_id: row.get(8)?,
        approvals: row.get(9)?,
        approvals_required: row.get(10)?,
        approvers_json: row.get(11)?,
        signed: row.get(12)?,
        signature: row.get(13)?,
        signed_by: row.get(14)?,
        signed_at: row.get(15)?,
        original_size: row.get(16)?,
        compressed_size: row.get(17)?,
        created_at_ms: row.get(18)?,
    })
}

const VFILE_COLS: &str = "id, version_id, path, file_type, change_type, lines_added, \
                          lines_deleted, size, sha256, storage_path, is_compressed, is_delta, \
                          delta_base_file_id, diff_preview";

fn map_version_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionFileRow> {
    Ok(VersionFileRow {
        id: row.get(0)?,
        version_id: row.get(1)?,
        path: row.get(2)?,
        file_type: row.get(3)?,
        change_type: parse_col(4, FileChangeType::parse(&row.get::<_, String>(4)?))?,
        lines_added: row.get(5)?,
        lines_deleted: row.get(6)?,
        size: row.get(7)?,
        sha256: row.get(8)?,
        storage_path: row.get(9)?,
        is_compressed: row.get(10)?,
        is_delta: row.get(11)?,
        delta_base_file_id: row.get(12)?,
        diff_preview: row.get(13)?,
    })
}

impl Store {
    /// Insert a version row.
    pub fn insert_version(&self, version: &VersionRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO versions ({VERSION_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                version.id,
                version.project_id,
                version.branch_id,
                version.label,
                version.author,
                version.message,
                version.status.as_str(),
                version.checksum,
                version.parent_version_id,
                version.approvals,
                version.approvals_required,
                version.approvers_json,
                version.signed,
                version.signature,
                version.signed_by,
                version.signed_at,
                version.original_size,
                version.compressed_size,
                version.created_at_ms,
            ],
        )?;
        Ok(())
    }

    /// Fetch a version by id.
    pub fn get_version(&self, id: &str) -> Result<VersionRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {VERSION_COLS} FROM versions WHERE id = ?1"),
                params![id],
                map_version,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("version", id))
    }

    /// List a project's versions, newest first.
    pub fn list_versions(&self, project_id: &str) -> Result<Vec<VersionRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VERSION_COLS} FROM versions WHERE project_id = ?1 ORDER BY created_at_ms DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], map_version)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The most recent version on a branch, if any.
    pub fn latest_version_on_branch(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> Result<Option<VersionRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLS} FROM versions
                     WHERE project_id = ?1 AND branch_id = ?2
                     ORDER BY created_at_ms DESC, rowid DESC LIMIT 1"
                ),
                params![project_id, branch_id],
                map_version,
            )
            .optional()?)
    }

    /// Write a version's status; transition legality is the caller's
    /// responsibility.
    pub fn update_version_status(
        &self,
        id: &str,
        status: VersionStatus,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE versions SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("version", id));
        }
        Ok(())
    }

    /// Record a signature; re-signing replaces signer and timestamp.
    pub fn set_version_signature(
        &self,
        id: &str,
        signature: &str,
        signed_by: &str,
        signed_at: &str,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE versions SET signed = 1, signature = ?2, signed_by = ?3, signed_at = ?4
             WHERE id = ?1",
            params![id, signature, signed_by, signed_at],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("version", id));
        }
        Ok(())
    }

    /// Replace the approvers list and count in one statement.
    pub fn update_version_approvals(
        &self,
        id: &str,
        approvals: i64,
        approvers_json: &str,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE versions SET approvals = ?2, approvers_json = ?3 WHERE id = ?1",
            params![id, approvals, approvers_json],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("version", id));
        }
        Ok(())
    }

    /// Insert a per-version file record.
    pub fn insert_version_file(&self, file: &VersionFileRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO version_files ({VFILE_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                file.id,
                file.version_id,
                file.path,
                file.file_type,
                file.change_type.as_str(),
                file.lines_added,
                file.lines_deleted,
                file.size,
                file.sha256,
                file.storage_path,
                file.is_compressed,
                file.is_delta,
                file.delta_base_file_id,
                file.diff_preview,
            ],
        )?;
        Ok(())
    }

    /// List a version's file records in path order.
    pub fn list_version_files(&self, version_id: &str) -> Result<Vec<VersionFileRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VFILE_COLS} FROM version_files WHERE version_id = ?1 ORDER BY path"
        ))?;
        let rows = stmt.query_map(params![version_id], map_version_file)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Append a changelog entry for a version.
    pub fn append_changelog(
        &self,
        version_id: &str,
        action: &str,
        actor: Option<&str>,
        detail: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO changelog (version_id, action, actor, detail, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![version_id, action, actor, detail, now_ms],
        )?;
        Ok(())
    }

    /// Read a version's changelog, oldest first.
    pub fn list_changelog(&self, version_id: &str) -> Result<Vec<ChangelogRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, version_id, action, actor, detail, created_at_ms
             FROM changelog WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![version_id], |row| {
            Ok(ChangelogRow {
                id: row.get(0)?,
                version_id: row.get(1)?,
                action: row.get(2)?,
                actor: row.get(3)?,
                detail: row.get(4)?,
                created_at_ms: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete version rows older than the newest `keep` for a project.
    /// Returns the ids removed so blob storage can prune alongside.
    pub fn prune_versions(&self, project_id: &str, keep: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM versions WHERE project_id = ?1
             ORDER BY created_at_ms DESC, rowid DESC",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![project_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let doomed: Vec<String> = ids.into_iter().skip(keep).collect();
        for id in &doomed {
            self.conn
                .execute("DELETE FROM versions WHERE id = ?1", params![id])?;
        }
        Ok(doomed)
    }
}
