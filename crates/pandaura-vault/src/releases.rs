//! Release bundles, signing and promotion.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pandaura_store::rows::{ReleaseRow, ReleaseStatus, Stage, VersionStatus};
use pandaura_store::Store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use crate::blob::{self, BlobStore};
use crate::error::VaultError;
use crate::ids::{new_id, now_iso};
use crate::versions::VersionEngine;

/// Bundle document format version.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Inputs to [`create_release`].
#[derive(Debug, Clone)]
pub struct CreateRelease {
    #[allow(missing_docs)]
    pub project_id: String,
    #[allow(missing_docs)]
    pub snapshot_id: Option<String>,
    #[allow(missing_docs)]
    pub version_id: String,
    /// Generated from the version label when absent.
    pub name: Option<String>,
    #[allow(missing_docs)]
    pub environment: Stage,
    #[allow(missing_docs)]
    pub created_by: String,
}

/// One file inside a bundle document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleFile {
    /// Repository-relative path.
    pub path: String,
    /// Base64 of the file content.
    pub content: String,
    /// Decoded size in bytes.
    pub size: u64,
}

/// The Brotli-compressed JSON bundle document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDocument {
    /// Format version.
    pub version: u32,
    /// Owning project.
    pub project_id: String,
    /// Bundled version.
    pub version_id: String,
    /// Release that owns the bundle.
    pub release_id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Bundled files.
    pub files: Vec<BundleFile>,
}

/// Promotion entry appended to a release's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePromotion {
    /// Target environment.
    pub environment: String,
    /// Operator identity.
    pub promoted_by: String,
    /// RFC 3339 promotion time.
    pub promoted_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReleaseMetadata {
    #[serde(default)]
    promotions: Vec<ReleasePromotion>,
}

/// Build a signed release bundle from a version's files.
///
/// A release may only reference a staged or released version; a draft is
/// staged on the way in, and the underlying version always ends `released`.
pub fn create_release(
    engine: &VersionEngine<'_>,
    input: CreateRelease,
) -> Result<ReleaseRow, VaultError> {
    let version = engine.store.get_version(&input.version_id)?;
    match version.status {
        VersionStatus::Draft => {
            engine.update_status(&input.version_id, VersionStatus::Staged, &input.created_by)?;
        }
        VersionStatus::Staged | VersionStatus::Released => {}
        VersionStatus::Deprecated => {
            return Err(VaultError::PreconditionFailed(format!(
                "version {} is deprecated and cannot be released",
                input.version_id
            )));
        }
    }

    let release_id = new_id("rel");
    let created_at = now_iso();
    let files = engine.materialize_files(&input.version_id)?;
    let document = BundleDocument {
        version: BUNDLE_FORMAT_VERSION,
        project_id: input.project_id.clone(),
        version_id: input.version_id.clone(),
        release_id: release_id.clone(),
        created_at: created_at.clone(),
        files: files
            .iter()
            .map(|file| BundleFile {
                path: file.path.clone(),
                content: BASE64.encode(file.content.as_bytes()),
                size: file.content.len() as u64,
            })
            .collect(),
    };
    let json = serde_json::to_vec(&document)?;
    let compressed = blob::compress(&json)?;
    let bundle_checksum = BlobStore::checksum(&compressed);
    let bundle_rel_path = format!("bundles/{release_id}.bundle");
    engine.blobs.write_raw(&bundle_rel_path, &compressed)?;

    let mut hasher = Sha256::new();
    hasher.update(release_id.as_bytes());
    hasher.update(bundle_checksum.as_bytes());
    hasher.update(input.created_by.as_bytes());
    hasher.update(created_at.as_bytes());
    let signature = format!("{:x}", hasher.finalize());

    let release = ReleaseRow {
        id: release_id.clone(),
        project_id: input.project_id.clone(),
        snapshot_id: input.snapshot_id.clone(),
        version_id: input.version_id.clone(),
        name: input
            .name
            .unwrap_or_else(|| format!("release-{}", version.label)),
        version_label: version.label.clone(),
        environment: input.environment,
        bundle_path: bundle_rel_path,
        bundle_size: compressed.len() as i64,
        bundle_checksum,
        signed: true,
        signature: Some(signature),
        signed_by: Some(input.created_by.clone()),
        status: ReleaseStatus::Active,
        linked_deploys: 0,
        last_deployed_at_ms: None,
        metadata_json: "{}".into(),
        created_at_ms: Store::now_ms(),
    };
    engine.store.insert_release(&release)?;

    // The bundled version is now released.
    let current = engine.store.get_version(&input.version_id)?;
    if current.status == VersionStatus::Staged {
        engine.update_status(&input.version_id, VersionStatus::Released, &input.created_by)?;
    }
    info!(release = %release.id, environment = %release.environment, "release created");
    Ok(release)
}

/// Append a promotion entry to the release's metadata, bump its linked
/// deploy count and stamp the deploy time. Does not create a deployment.
pub fn promote_release(
    store: &Store,
    release_id: &str,
    environment: Stage,
    promoted_by: &str,
) -> Result<ReleaseRow, VaultError> {
    let release = store.get_release(release_id)?;
    let mut metadata: ReleaseMetadata = serde_json::from_str(&release.metadata_json)?;
    metadata.promotions.push(ReleasePromotion {
        environment: environment.to_string(),
        promoted_by: promoted_by.to_string(),
        promoted_at: now_iso(),
    });
    store.record_release_promotion(
        release_id,
        &serde_json::to_string(&metadata)?,
        Store::now_ms(),
    )?;
    Ok(store.get_release(release_id)?)
}

/// Decode and validate a bundle payload.
pub fn open_bundle(bytes: &[u8]) -> Result<BundleDocument, VaultError> {
    let json = blob::decompress(bytes)?;
    let document: BundleDocument = serde_json::from_slice(&json)?;
    if document.version != BUNDLE_FORMAT_VERSION {
        return Err(VaultError::Validation(format!(
            "unsupported bundle format version {}",
            document.version
        )));
    }
    if document.release_id.is_empty() || document.version_id.is_empty() {
        return Err(VaultError::Validation("bundle is missing identifiers".into()));
    }
    Ok(document)
}

/// Extract a bundle's files under a destination root.
pub fn extract_bundle(bytes: &[u8], dest_root: &Path) -> Result<Vec<String>, VaultError> {
    let document = open_bundle(bytes)?;
    let mut written = Vec::with_capacity(document.files.len());
    for file in &document.files {
        let decoded = BASE64
            .decode(&file.content)
            .map_err(|err| VaultError::Validation(format!("bundle file '{}': {err}", file.path)))?;
        let mut dest = dest_root.to_path_buf();
        for segment in file.path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                continue;
            }
            dest.push(segment);
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, decoded)?;
        written.push(file.path.clone());
    }
    Ok(written)
}
