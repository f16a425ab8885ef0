//! Tag CRUD.

use rusqlite::{params, OptionalExtension};

use super::{parse_col, Store};
use crate::error::StoreError;
use crate::rows::{TagLifecycle, TagRow, TagScope, TagSource, TagType, UdtMember, UdtRow};

const TAG_COLS: &str = "id, project_id, name, tag_type, udt_type, value_json, address, source, \
                        scope, lifecycle, path, alarms_json, read_only, requires_approval, \
                        updated_at_ms";

fn map_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        tag_type: parse_col(3, TagType::parse(&row.get::<_, String>(3)?))?,
        udt_type: row.get(4)?,
        value_json: row.get(5)?,
        address: row.get(6)?,
        source: parse_col(7, TagSource::parse(&row.get::<_, String>(7)?))?,
        scope: parse_col(8, TagScope::parse(&row.get::<_, String>(8)?))?,
        lifecycle: parse_col(9, TagLifecycle::parse(&row.get::<_, String>(9)?))?,
        path: row.get(10)?,
        alarms_json: row.get(11)?,
        read_only: row.get(12)?,
        requires_approval: row.get(13)?,
        updated_at_ms: row.get(14)?,
    })
}

impl Store {
    /// Insert a tag row; name must be unique within the project.
    pub fn insert_tag(&self, tag: &TagRow) -> Result<(), StoreError> {
        let result = self.conn.execute(
            &format!("INSERT INTO tags ({TAG_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
            params![
                tag.id,
                tag.project_id,
                tag.name,
                tag.tag_type.as_str(),
                tag.udt_type,
                tag.value_json,
                tag.address,
                tag.source.as_str(),
                tag.scope.as_str(),
                tag.lifecycle.as_str(),
                tag.path,
                tag.alarms_json,
                tag.read_only,
                tag.requires_approval,
                tag.updated_at_ms,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "tag '{}' already exists in project {}",
                    tag.name, tag.project_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a tag by (project, name).
    pub fn get_tag(&self, project_id: &str, name: &str) -> Result<TagRow, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {TAG_COLS} FROM tags WHERE project_id = ?1 AND name = ?2"),
                params![project_id, name],
                map_tag,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("tag", name))
    }

    /// List a project's tags in name order.
    pub fn list_tags(&self, project_id: &str) -> Result<Vec<TagRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_COLS} FROM tags WHERE project_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![project_id], map_tag)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Update a tag's current value.
    pub fn update_tag_value(
        &self,
        project_id: &str,
        name: &str,
        value_json: &str,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tags SET value_json = ?3, updated_at_ms = ?4
             WHERE project_id = ?1 AND name = ?2",
            params![project_id, name, value_json, now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("tag", name));
        }
        Ok(())
    }

    /// Update a tag's lifecycle state.
    pub fn update_tag_lifecycle(
        &self,
        project_id: &str,
        name: &str,
        lifecycle: TagLifecycle,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tags SET lifecycle = ?3, updated_at_ms = ?4
             WHERE project_id = ?1 AND name = ?2",
            params![project_id, name, lifecycle.as_str(), now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("tag", name));
        }
        Ok(())
    }

    /// Delete a tag.
    pub fn delete_tag(&self, project_id: &str, name: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM tags WHERE project_id = ?1 AND name = ?2",
            params![project_id, name],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("tag", name));
        }
        Ok(())
    }

    /// Insert a user-defined type; name unique within the project and
    /// members must decode as an ordered member list.
    pub fn insert_udt(&self, udt: &UdtRow) -> Result<(), StoreError> {
        let _: Vec<UdtMember> = serde_json::from_str(&udt.members_json)?;
        let result = self.conn.execute(
            "INSERT INTO udts (id, project_id, name, description, members_json, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                udt.id,
                udt.project_id,
                udt.name,
                udt.description,
                udt.members_json,
                udt.updated_at_ms,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "udt '{}' already exists in project {}",
                    udt.name, udt.project_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a UDT by (project, name).
    pub fn get_udt(&self, project_id: &str, name: &str) -> Result<UdtRow, StoreError> {
        self.conn
            .query_row(
                "SELECT id, project_id, name, description, members_json, updated_at_ms
                 FROM udts WHERE project_id = ?1 AND name = ?2",
                params![project_id, name],
                map_udt,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("udt", name))
    }

    /// List a project's UDTs by name.
    pub fn list_udts(&self, project_id: &str) -> Result<Vec<UdtRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, name, description, members_json, updated_at_ms
             FROM udts WHERE project_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![project_id], map_udt)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a UDT.
    pub fn delete_udt(&self, project_id: &str, name: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM udts WHERE project_id = ?1 AND name = ?2",
            params![project_id, name],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("udt", name));
        }
        Ok(())
    }
}

fn map_udt(row: &rusqlite::Row<'_>) -> rusqlite::Result<UdtRow> {
    Ok(UdtRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        members_json: row.get(4)?,
        updated_at_ms: row.get(5)?,
    })
}

/// Preview-or-apply result of a bulk tag operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BulkTagOutcome {
    /// Tags the operation touches (or would touch).
    pub affected: Vec<String>,
    /// Requested names with no matching tag.
    pub missing: Vec<String>,
    /// False when this was a dry run.
    pub applied: bool,
}

impl Store {
    /// Register an alias for a tag; aliases are unique within a project.
    pub fn add_tag_alias(
        &self,
        project_id: &str,
        alias: &str,
        tag_name: &str,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        self.get_tag(project_id, tag_name)?;
        let result = self.conn.execute(
            "INSERT INTO tag_aliases (id, project_id, alias, tag_name, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format!("alias-{project_id}-{alias}"),
                project_id,
                alias,
                tag_name,
                now_ms
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!(
                    "alias '{alias}' already exists in project {project_id}"
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve a name through the alias table; a plain tag name passes
    /// through unchanged.
    pub fn resolve_tag_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        let aliased: Option<String> = self
            .conn
            .query_row(
                "SELECT tag_name FROM tag_aliases WHERE project_id = ?1 AND alias = ?2",
                params![project_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(aliased.unwrap_or_else(|| name.to_string()))
    }

    /// Remove an alias.
    pub fn remove_tag_alias(&self, project_id: &str, alias: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM tag_aliases WHERE project_id = ?1 AND alias = ?2",
            params![project_id, alias],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("tag alias", alias));
        }
        Ok(())
    }

    /// Move a set of tags to a lifecycle state, optionally as a dry run
    /// that only reports what would change.
    pub fn bulk_update_tag_lifecycle(
        &self,
        project_id: &str,
        names: &[String],
        lifecycle: TagLifecycle,
        dry_run: bool,
        now_ms: i64,
    ) -> Result<BulkTagOutcome, StoreError> {
        let mut affected = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            let resolved = self.resolve_tag_name(project_id, name)?;
            match self.get_tag(project_id, &resolved) {
                Ok(tag) => {
                    if tag.lifecycle != lifecycle {
                        affected.push(resolved);
                    }
                }
                Err(StoreError::NotFound { .. }) => missing.push(name.clone()),
                Err(err) => return Err(err),
            }
        }
        if !dry_run {
            for name in &affected {
                self.update_tag_lifecycle(project_id, name, lifecycle, now_ms)?;
            }
        }
        Ok(BulkTagOutcome {
            affected,
            missing,
            applied: !dry_run,
        })
    }
}
