//! Project and session CRUD.

use rusqlite::{params, OptionalExtension};

use super::Store;
use crate::error::StoreError;
use crate::rows::{ProjectRow, SessionRow};

fn map_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        connection_json: row.get(3)?,
        created_at_ms: row.get(4)?,
        updated_at_ms: row.get(5)?,
    })
}

const PROJECT_COLS: &str =
    "id, name, description, connection_json, created_at_ms, updated_at_ms";

impl Store {
    /// Insert a project row.
    pub fn insert_project(&self, project: &ProjectRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO projects (id, name, description, connection_json, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.name,
                project.description,
                project.connection_json,
                project.created_at_ms,
                project.updated_at_ms,
            ],
        )?;
        Ok(())
    }

    /// Fetch a project by id.
    pub fn get_project(&self, id: &str) -> Result<ProjectRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
                params![id],
                map_project,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("project", id))
    }

    /// List projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<ProjectRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects ORDER BY created_at_ms DESC"
        ))?;
        let rows = stmt.query_map([], map_project)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Update mutable project fields.
    pub fn update_project(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        connection_json: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE projects SET
                 name = COALESCE(?2, name),
                 description = COALESCE(?3, description),
                 connection_json = COALESCE(?4, connection_json),
                 updated_at_ms = ?5
             WHERE id = ?1",
            params![id, name, description, connection_json, now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("project", id));
        }
        Ok(())
    }

    /// Delete a project; cascades to every owned row.
    pub fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("project", id));
        }
        Ok(())
    }

    /// Insert a session row.
    pub fn insert_session(&self, session: &SessionRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_name, token, created_at_ms, expires_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.user_name,
                session.token,
                session.created_at_ms,
                session.expires_at_ms,
            ],
        )?;
        Ok(())
    }

    /// Look up a session by token, ignoring expired rows.
    pub fn get_session_by_token(
        &self,
        token: &str,
        now_ms: i64,
    ) -> Result<Option<SessionRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_name, token, created_at_ms, expires_at_ms
                 FROM sessions WHERE token = ?1 AND expires_at_ms > ?2",
                params![token, now_ms],
                |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        user_name: row.get(1)?,
                        token: row.get(2)?,
                        created_at_ms: row.get(3)?,
                        expires_at_ms: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Remove expired sessions; returns how many were dropped.
    pub fn prune_sessions(&self, now_ms: i64) -> Result<usize, StoreError> {
        Ok(self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at_ms <= ?1", params![now_ms])?)
    }
}
