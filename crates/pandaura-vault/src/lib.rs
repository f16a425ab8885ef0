//! `pandaura-vault` - content-addressed version, snapshot and release engine.
//!
//! File content is stored outside the database, Brotli-compressed or as
//! line-level deltas against a base, keyed by SHA-256. On top of the blob
//! layer sit the immutable version chain, named snapshots, promotion
//! gating and signed release bundles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Content-addressed blob storage.
pub mod blob;
/// Line-level delta encoding.
pub mod delta;
/// LCS-based unified diff generation.
pub mod diff;
/// Vault errors.
pub mod error;
/// Identifier minting.
pub mod ids;
/// Release bundles and promotion.
pub mod releases;
/// Snapshots and stage promotion.
pub mod snapshots;
/// The immutable version chain.
pub mod versions;

pub use blob::BlobStore;
pub use error::VaultError;
pub use versions::VersionEngine;
