//! `pandaura-store` - single relational store for Pandaura backends.
//!
//! One SQLite database holds every entity row: projects, tags, logic files,
//! sessions, branches, versions, snapshots, releases and deployments. Large
//! file content lives outside the database under the data directory; rows
//! keep paths and checksums. Open-ended metadata is stored as JSON text.
//!
//! The store assumes a single writer per process; multi-process instances
//! need external coordination.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Store errors.
pub mod error;
/// Row structs and status enums.
pub mod rows;
/// Schema DDL.
mod schema;
/// The store handle and CRUD operations.
mod store;

pub use error::StoreError;
pub use store::{BulkTagOutcome, Store};
