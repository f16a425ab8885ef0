//! Snapshot and promotion rows.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{PromotionRow, SnapshotRow, Stage};

const SNAPSHOT_COLS: &str =
    "id, project_id, version_id, name, description, tags_json, created_by, created_at_ms";

fn map_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        version_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        tags_json: row.get(5)?,
        created_by: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}

const PROMOTION_COLS: &str =
    "id, snapshot_id, from_stage, to_stage, promoted_by, promoted_at_ms, notes, checks_passed";

fn map_promotion(row: &rusqlite::Row<'_>) -> rusqlite::Result<PromotionRow> {
    Ok(PromotionRow {
        id: row.get(0)?,
        snapshot_id: row.get(1)?,
        from_stage: parse_col(2, Stage::parse(&row.get::<_, String>(2)?))?,
        to_stage: parse_col(3, Stage::parse(&row.get::<_, String>(3)?))?,
        promoted_by: row.get(4)?,
        promoted_at_ms: row.get(5)?,
        notes: row.get(6)?,
        checks_passed: row.get(7)?,
    })
}

impl Store {
    /// Insert a snapshot; name unique within the project.
    pub fn insert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), StoreError> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO snapshots ({SNAPSHOT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                snapshot.id,
                snapshot.project_id,
                snapshot.version_id,
                snapshot.name,
                snapshot.description,
                snapshot.tags_json,
                snapshot.created_by,
                snapshot.created_at_ms,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "snapshot '{}' already exists in project {}",
                    snapshot.name, snapshot.project_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a snapshot by id.
    pub fn get_snapshot(&self, id: &str) -> Result<SnapshotRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {SNAPSHOT_COLS} FROM snapshots WHERE id = ?1"),
                params![id],
                map_snapshot,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("snapshot", id))
    }

    /// List a project's snapshots, newest first.
    pub fn list_snapshots(&self, project_id: &str) -> Result<Vec<SnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SNAPSHOT_COLS} FROM snapshots WHERE project_id = ?1
             ORDER BY created_at_ms DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], map_snapshot)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert a promotion record.
    pub fn insert_promotion(&self, promotion: &PromotionRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO snapshot_promotions ({PROMOTION_COLS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                promotion.id,
                promotion.snapshot_id,
                promotion.from_stage.as_str(),
                promotion.to_stage.as_str(),
                promotion.promoted_by,
                promotion.promoted_at_ms,
                promotion.notes,
                promotion.checks_passed,
            ],
        )?;
        Ok(())
    }

    /// A snapshot's promotions in chronological order.
    pub fn list_promotions(&self, snapshot_id: &str) -> Result<Vec<PromotionRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROMOTION_COLS} FROM snapshot_promotions
             WHERE snapshot_id = ?1 ORDER BY promoted_at_ms, id"
        ))?;
        let rows = stmt.query_map(params![snapshot_id], map_promotion)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The most recent promotion for a snapshot, if any.
    pub fn last_promotion(&self, snapshot_id: &str) -> Result<Option<PromotionRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROMOTION_COLS} FROM snapshot_promotions
                     WHERE snapshot_id = ?1 ORDER BY promoted_at_ms DESC, id DESC LIMIT 1"
                ),
                params![snapshot_id],
                map_promotion,
            )
            .optional()?)
    }
}
