//! Logic file and branch CRUD.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{BranchRow, LogicFileRow, Stage, Vendor};

const LOGIC_COLS: &str = "id, project_id, name, content, vendor, author, updated_at_ms";

fn map_logic(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogicFileRow> {
    Ok(LogicFileRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        vendor: parse_col(4, Vendor::parse(&row.get::<_, String>(4)?))?,
        author: row.get(5)?,
        updated_at_ms: row.get(6)?,
    })
}

const BRANCH_COLS: &str =
    "id, project_id, name, stage, parent_branch_id, is_default, created_at_ms";

fn map_branch(row: &rusqlite::Row<'_>) -> rusqlite::Result<BranchRow> {
    Ok(BranchRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        stage: parse_col(3, Stage::parse(&row.get::<_, String>(3)?))?,
        parent_branch_id: row.get(4)?,
        is_default: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

impl Store {
    /// Insert a logic file; name unique within the project.
    pub fn insert_logic_file(&self, file: &LogicFileRow) -> Result<(), StoreError> {
        let result = self.conn.execute(
            &format!("INSERT INTO logic_files ({LOGIC_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                file.id,
                file.project_id,
                file.name,
                file.content,
                file.vendor.as_str(),
                file.author,
                file.updated_at_ms,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "logic file '{}' already exists in project {}",
                    file.name, file.project_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a logic file by id.
    pub fn get_logic_file(&self, id: &str) -> Result<LogicFileRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {LOGIC_COLS} FROM logic_files WHERE id = ?1"),
                params![id],
                map_logic,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("logic file", id))
    }

    /// List a project's logic files by name.
    pub fn list_logic_files(&self, project_id: &str) -> Result<Vec<LogicFileRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOGIC_COLS} FROM logic_files WHERE project_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![project_id], map_logic)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Replace a logic file's content, stamping author and modified time.
    pub fn update_logic_content(
        &self,
        id: &str,
        content: &str,
        author: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE logic_files SET content = ?2, author = COALESCE(?3, author), updated_at_ms = ?4
             WHERE id = ?1",
            params![id, content, author, now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("logic file", id));
        }
        Ok(())
    }

    /// Delete a logic file.
    pub fn delete_logic_file(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM logic_files WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("logic file", id));
        }
        Ok(())
    }

    /// Insert a branch; name unique within the project among active branches.
    /// At most one default branch per project is enforced here.
    pub fn insert_branch(&self, branch: &BranchRow) -> Result<(), StoreError> {
        if branch.is_default {
            let existing: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM branches WHERE project_id = ?1 AND is_default = 1",
                params![branch.project_id],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::Conflict(format!(
                    "project {} already has a default branch",
                    branch.project_id
                )));
            }
        }
        let result = self.conn.execute(
            &format!("INSERT INTO branches ({BRANCH_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                branch.id,
                branch.project_id,
                branch.name,
                branch.stage.as_str(),
                branch.parent_branch_id,
                branch.is_default,
                branch.created_at_ms,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "branch '{}' already exists in project {}",
                    branch.name, branch.project_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a branch by id.
    pub fn get_branch(&self, id: &str) -> Result<BranchRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {BRANCH_COLS} FROM branches WHERE id = ?1"),
                params![id],
                map_branch,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("branch", id))
    }

    /// List a project's branches.
    pub fn list_branches(&self, project_id: &str) -> Result<Vec<BranchRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BRANCH_COLS} FROM branches WHERE project_id = ?1 ORDER BY created_at_ms"
        ))?;
        let rows = stmt.query_map(params![project_id], map_branch)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The project's default branch.
    pub fn default_branch(&self, project_id: &str) -> Result<Option<BranchRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {BRANCH_COLS} FROM branches WHERE project_id = ?1 AND is_default = 1"
                ),
                params![project_id],
                map_branch,
            )
            .optional()?)
    }
}
