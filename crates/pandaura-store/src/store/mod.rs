//! The store handle.

mod deploys;
mod logic;
mod projects;
mod releases;
mod snapshots;
mod tags;
mod versions;

pub use tags::BulkTagOutcome;

use std::path::Path;

use rusqlite::Connection;

use crate::error::StoreError;
use crate::schema::SCHEMA;

/// Handle over the single SQLite database.
///
/// All methods take `&self`; callers serialise writes (the process is the
/// single writer).
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database; used by tests and ephemeral engines.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Wall-clock epoch milliseconds.
    #[must_use]
    pub fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Lift an enum-parse failure into a rusqlite row-mapping error.
pub(crate) fn parse_col<T>(idx: usize, result: Result<T, StoreError>) -> rusqlite::Result<T> {
    result.map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}
