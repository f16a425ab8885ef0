//! The immutable version chain.

use pandaura_store::rows::{FileChangeType, VersionFileRow, VersionRow, VersionStatus};
use pandaura_store::Store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::blob::BlobStore;
use crate::diff::{self, NamedFile, DEFAULT_CONTEXT};
use crate::error::VaultError;
use crate::ids::{new_id, now_iso};

/// Default approvals required on a fresh version.
pub const DEFAULT_APPROVALS_REQUIRED: i64 = 3;
/// Diff previews are truncated to this many lines.
pub const DIFF_PREVIEW_LINES: usize = 50;

/// One input file for a capture.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Repository-relative path.
    pub path: String,
    /// Full content.
    pub content: String,
    /// `logic`, `tag`, `config`, …
    pub file_type: String,
}

/// Inputs to [`VersionEngine::create_version`].
#[derive(Debug, Clone)]
pub struct CreateVersion {
    pub project_id: String,
    pub branch_id: String,
    pub author: String,
    pub message: String,
    pub files: Vec<NewFile>,
    /// Explicit label; auto-generated `vMAJOR.MINOR.PATCH` otherwise.
    pub label: Option<String>,
    pub approvals_required: Option<i64>,
    /// Store modified files as deltas against the parent where profitable.
    pub delta_enabled: bool,
}

#[allow(missing_docs)]
impl CreateVersion {
    #[must_use]
    pub fn new(project_id: &str, branch_id: &str, author: &str, message: &str) -> Self {
        Self {
            project_id: project_id.into(),
            branch_id: branch_id.into(),
            author: author.into(),
            message: message.into(),
            files: Vec::new(),
            label: None,
            approvals_required: None,
            delta_enabled: true,
        }
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, content: &str, file_type: &str) -> Self {
        self.files.push(NewFile {
            path: path.into(),
            content: content.into(),
            file_type: file_type.into(),
        });
        self
    }
}

/// An approver entry in the version's approvers list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approver {
    /// Approver identity.
    pub name: String,
    /// RFC 3339 approval time.
    pub timestamp: String,
}

/// Version, snapshot and release operations over the store and blob layer.
pub struct VersionEngine<'a> {
    pub(crate) store: &'a Store,
    pub(crate) blobs: &'a BlobStore,
}

impl<'a> VersionEngine<'a> {
    /// Build an engine over borrowed storage handles.
    #[must_use]
    pub fn new(store: &'a Store, blobs: &'a BlobStore) -> Self {
        Self { store, blobs }
    }

    /// Capture an immutable version from a set of files.
    pub fn create_version(&self, input: CreateVersion) -> Result<VersionRow, VaultError> {
        if input.files.is_empty() {
            return Err(VaultError::Validation("version needs at least one file".into()));
        }
        if input.author.trim().is_empty() {
            return Err(VaultError::Validation("version needs an author".into()));
        }
        self.store.get_project(&input.project_id)?;

        let parent = self
            .store
            .latest_version_on_branch(&input.project_id, &input.branch_id)?;
        let label = match &input.label {
            Some(label) => label.clone(),
            None => next_label(parent.as_ref().map(|p| p.label.as_str())),
        };
        let parent_files = match &parent {
            Some(parent) => self.materialize_files(&parent.id)?,
            None => Vec::new(),
        };
        let parent_file_rows = match &parent {
            Some(parent) => self.store.list_version_files(&parent.id)?,
            None => Vec::new(),
        };

        let version_id = new_id("ver");
        let now_ms = Store::now_ms();

        // Aggregate checksum over concat(path || content) in caller order.
        let mut hasher = Sha256::new();
        for file in &input.files {
            hasher.update(file.path.as_bytes());
            hasher.update(file.content.as_bytes());
        }
        let checksum = format!("{:x}", hasher.finalize());

        let mut original_size = 0i64;
        let mut compressed_size = 0i64;
        let mut file_rows = Vec::with_capacity(input.files.len());
        for file in &input.files {
            let parent_content = parent_files
                .iter()
                .find(|p| p.path == file.path)
                .map(|p| p.content.as_str());
            let delta_base = if input.delta_enabled {
                parent_content
            } else {
                None
            };
            let stored = self.blobs.store_file(
                &input.project_id,
                &version_id,
                &file.path,
                &file.content,
                delta_base,
            )?;

            let (change_type, lines_added, lines_deleted, diff_preview) =
                classify_against_parent(parent_content, file);
            let delta_base_file_id = if stored.is_delta {
                parent_file_rows
                    .iter()
                    .find(|row| row.path == file.path)
                    .map(|row| row.id.clone())
            } else {
                None
            };

            original_size += stored.original_size as i64;
            compressed_size += stored.stored_size as i64;
            file_rows.push(VersionFileRow {
                id: new_id("vf"),
                version_id: version_id.clone(),
                path: file.path.clone(),
                file_type: file.file_type.clone(),
                change_type,
                lines_added,
                lines_deleted,
                size: stored.original_size as i64,
                sha256: stored.sha256,
                storage_path: stored.storage_path,
                is_compressed: stored.is_compressed,
                is_delta: stored.is_delta,
                delta_base_file_id,
                diff_preview,
            });
        }

        // Parent paths absent from this capture are deletions. Tombstone
        // rows carry no stored content; the sha256 identifies what was
        // removed.
        for parent_row in &parent_file_rows {
            if parent_row.change_type == FileChangeType::Deleted {
                continue;
            }
            if input.files.iter().any(|f| f.path == parent_row.path) {
                continue;
            }
            let parent_lines = parent_files
                .iter()
                .find(|p| p.path == parent_row.path)
                .map(|p| p.content.split('\n').count() as i64)
                .unwrap_or(0);
            file_rows.push(VersionFileRow {
                id: new_id("vf"),
                version_id: version_id.clone(),
                path: parent_row.path.clone(),
                file_type: parent_row.file_type.clone(),
                change_type: FileChangeType::Deleted,
                lines_added: 0,
                lines_deleted: parent_lines,
                size: 0,
                sha256: parent_row.sha256.clone(),
                storage_path: String::new(),
                is_compressed: false,
                is_delta: false,
                delta_base_file_id: None,
                diff_preview: None,
            });
        }

        let version = VersionRow {
            id: version_id.clone(),
            project_id: input.project_id.clone(),
            branch_id: input.branch_id.clone(),
            label,
            author: input.author.clone(),
            message: input.message.clone(),
            status: VersionStatus::Draft,
            checksum,
            parent_version_id: parent.as_ref().map(|p| p.id.clone()),
            approvals: 0,
            approvals_required: input
                .approvals_required
                .unwrap_or(DEFAULT_APPROVALS_REQUIRED),
            approvers_json: "[]".into(),
            signed: false,
            signature: None,
            signed_by: None,
            signed_at: None,
            original_size,
            compressed_size,
            created_at_ms: now_ms,
        };
        self.store.insert_version(&version)?;
        for row in &file_rows {
            self.store.insert_version_file(row)?;
        }
        self.store.append_changelog(
            &version_id,
            "created",
            Some(&input.author),
            Some(&input.message),
            now_ms,
        )?;
        info!(version = %version_id, label = %version.label, files = file_rows.len(), "version created");
        Ok(version)
    }

    /// Materialise every file of a version, resolving deltas against the
    /// parent chain and verifying checksums. Deletion tombstones have no
    /// content and are skipped.
    pub fn materialize_files(&self, version_id: &str) -> Result<Vec<NamedFile>, VaultError> {
        let version = self.store.get_version(version_id)?;
        let files = self.store.list_version_files(version_id)?;
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            if file.change_type == FileChangeType::Deleted {
                continue;
            }
            let base = if file.is_delta {
                let parent_id = version.parent_version_id.as_deref().ok_or_else(|| {
                    VaultError::Validation(format!(
                        "delta file '{}' in rootless version {version_id}",
                        file.path
                    ))
                })?;
                Some(self.materialize_one(parent_id, &file.path)?)
            } else {
                None
            };
            let content = self.blobs.retrieve(
                &file.storage_path,
                file.is_compressed,
                file.is_delta,
                base.as_deref(),
                &file.sha256,
            )?;
            out.push(NamedFile {
                path: file.path,
                content,
            });
        }
        Ok(out)
    }

    fn materialize_one(&self, version_id: &str, path: &str) -> Result<String, VaultError> {
        let files = self.materialize_files(version_id)?;
        files
            .into_iter()
            .find(|f| f.path == path)
            .map(|f| f.content)
            .ok_or_else(|| {
                VaultError::NotFound(format!("file '{path}' in version {version_id}"))
            })
    }

    /// Permitted transitions: draft → staged → released → deprecated.
    pub fn update_status(
        &self,
        version_id: &str,
        next: VersionStatus,
        actor: &str,
    ) -> Result<(), VaultError> {
        let version = self.store.get_version(version_id)?;
        let allowed = matches!(
            (version.status, next),
            (VersionStatus::Draft, VersionStatus::Staged)
                | (VersionStatus::Staged, VersionStatus::Released)
                | (VersionStatus::Released, VersionStatus::Deprecated)
        );
        if !allowed {
            return Err(VaultError::Conflict(format!(
                "cannot transition version {version_id} from {} to {}",
                version.status, next
            )));
        }
        self.store.update_version_status(version_id, next)?;
        self.store.append_changelog(
            version_id,
            next.as_str(),
            Some(actor),
            None,
            Store::now_ms(),
        )?;
        Ok(())
    }

    /// Sign a version: `signature = SHA256(id || checksum || signer || time)`.
    /// Re-signing by a different identity replaces signer and timestamp.
    pub fn sign_version(&self, version_id: &str, signed_by: &str) -> Result<String, VaultError> {
        let version = self.store.get_version(version_id)?;
        if version.signed && version.signed_by.as_deref() == Some(signed_by) {
            // Idempotent for the same signer.
            return Ok(version.signature.unwrap_or_default());
        }
        let signed_at = now_iso();
        let mut hasher = Sha256::new();
        hasher.update(version.id.as_bytes());
        hasher.update(version.checksum.as_bytes());
        hasher.update(signed_by.as_bytes());
        hasher.update(signed_at.as_bytes());
        let signature = format!("{:x}", hasher.finalize());
        self.store
            .set_version_signature(version_id, &signature, signed_by, &signed_at)?;
        self.store.append_changelog(
            version_id,
            "signed",
            Some(signed_by),
            None,
            Store::now_ms(),
        )?;
        Ok(signature)
    }

    /// Record an approval; a repeat approver is rejected.
    pub fn approve_version(&self, version_id: &str, approver: &str) -> Result<i64, VaultError> {
        let version = self.store.get_version(version_id)?;
        let mut approvers: Vec<Approver> = serde_json::from_str(&version.approvers_json)?;
        if approvers.iter().any(|a| a.name == approver) {
            return Err(VaultError::Conflict(format!(
                "'{approver}' has already approved version {version_id}"
            )));
        }
        approvers.push(Approver {
            name: approver.to_string(),
            timestamp: now_iso(),
        });
        let approvals = approvers.len() as i64;
        self.store.update_version_approvals(
            version_id,
            approvals,
            &serde_json::to_string(&approvers)?,
        )?;
        self.store.append_changelog(
            version_id,
            "approved",
            Some(approver),
            None,
            Store::now_ms(),
        )?;
        Ok(approvals)
    }

    /// Compare two versions' full file sets.
    pub fn compare_versions(
        &self,
        old_version_id: &str,
        new_version_id: &str,
    ) -> Result<diff::Comparison, VaultError> {
        let old_files = self.materialize_files(old_version_id)?;
        let new_files = self.materialize_files(new_version_id)?;
        Ok(diff::compare_file_sets(&old_files, &new_files, true))
    }

    /// Retention: keep the `keep` most recent versions of a project, delete
    /// the rest along with their blobs.
    pub fn prune_versions(&self, project_id: &str, keep: usize) -> Result<usize, VaultError> {
        let doomed = self.store.prune_versions(project_id, keep)?;
        for version_id in &doomed {
            self.blobs.remove_version_dir(project_id, version_id)?;
        }
        if !doomed.is_empty() {
            info!(project = project_id, pruned = doomed.len(), "retention pruned versions");
        }
        Ok(doomed.len())
    }
}

/// Auto-generate the next `vMAJOR.MINOR.PATCH` label from the parent's.
fn next_label(parent_label: Option<&str>) -> String {
    let Some(label) = parent_label else {
        return "v1.0.0".into();
    };
    let body = label.strip_prefix('v').unwrap_or(label);
    let parts: Vec<&str> = body.split('.').collect();
    if parts.len() == 3 {
        if let (Ok(major), Ok(minor), Ok(patch)) = (
            parts[0].parse::<u64>(),
            parts[1].parse::<u64>(),
            parts[2].parse::<u64>(),
        ) {
            return format!("v{major}.{minor}.{}", patch + 1);
        }
    }
    "v1.0.0".into()
}

/// Classify a file against the parent's content and build the truncated
/// diff preview for modified files.
fn classify_against_parent(
    parent_content: Option<&str>,
    file: &NewFile,
) -> (FileChangeType, i64, i64, Option<String>) {
    match parent_content {
        None => {
            let added = file.content.split('\n').count() as i64;
            (FileChangeType::Added, added, 0, None)
        }
        Some(parent) if parent == file.content => (FileChangeType::Modified, 0, 0, None),
        Some(parent) => {
            let diff = diff::diff_files(parent, &file.content, DEFAULT_CONTEXT);
            let text = diff::unified_text(&file.path, &file.path, &diff);
            let preview: String = text
                .lines()
                .take(DIFF_PREVIEW_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            (
                FileChangeType::Modified,
                diff.summary.lines_added as i64,
                diff.summary.lines_deleted as i64,
                Some(preview),
            )
        }
    }
}
