//! Content-addressed blob storage.
//!
//! File content lives under `<data_dir>/versions/<project>/<version>/<path>`
//! as Brotli-compressed bytes of either the raw content or a line-delta
//! document. Compression and delta encoding are both kept only when they
//! actually shrink the payload.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::delta::LineDelta;
use crate::error::VaultError;

/// Brotli quality used for stored blobs and bundles.
pub const BROTLI_QUALITY: i32 = 6;
/// Brotli window size (log2).
pub const BROTLI_WINDOW: i32 = 22;
/// A delta is preferred only below this fraction of the original size.
pub const DELTA_THRESHOLD: f64 = 0.7;

/// Outcome of storing one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlob {
    /// Path relative to the data directory.
    pub storage_path: String,
    /// SHA-256 of the original content.
    pub sha256: String,
    /// Original size in bytes.
    pub original_size: u64,
    /// Bytes on disk.
    pub stored_size: u64,
    /// True when the payload is Brotli-compressed.
    pub is_compressed: bool,
    /// True when the payload is a line-delta document.
    pub is_delta: bool,
}

/// Filesystem-backed blob store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    data_dir: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `data_dir`; the directory is created lazily.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The store's root directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// SHA-256 hex digest of a byte payload.
    #[must_use]
    pub fn checksum(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Store file content for a version.
    ///
    /// When `delta_base` is supplied and the serialised delta is smaller than
    /// [`DELTA_THRESHOLD`] of the original, the delta document is stored
    /// instead of the full content. Either payload is then compressed, and
    /// the compressed form kept only if strictly smaller.
    pub fn store_file(
        &self,
        project_id: &str,
        version_id: &str,
        path: &str,
        content: &str,
        delta_base: Option<&str>,
    ) -> Result<StoredBlob, VaultError> {
        let sha256 = Self::checksum(content.as_bytes());
        let original_size = content.len() as u64;

        let (payload, is_delta) = match delta_base {
            Some(base) => {
                let delta_json = LineDelta::encode(base, content).to_json()?;
                if (delta_json.len() as f64) < DELTA_THRESHOLD * content.len() as f64 {
                    (delta_json, true)
                } else {
                    (content.to_string(), false)
                }
            }
            None => (content.to_string(), false),
        };

        let compressed = compress(payload.as_bytes())?;
        let (bytes, is_compressed) = if compressed.len() < payload.len() {
            (compressed, true)
        } else {
            (payload.into_bytes(), false)
        };

        let rel = PathBuf::from("versions")
            .join(sanitize_component(project_id))
            .join(sanitize_component(version_id))
            .join(sanitize_path(path));
        let abs = self.data_dir.join(&rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs, &bytes)?;
        debug!(path = %rel.display(), bytes = bytes.len(), is_compressed, is_delta, "stored blob");

        Ok(StoredBlob {
            storage_path: rel.to_string_lossy().replace('\\', "/"),
            sha256,
            original_size,
            stored_size: bytes.len() as u64,
            is_compressed,
            is_delta,
        })
    }

    /// Retrieve file content, inverting compression and delta encoding, and
    /// verify it against the recorded checksum.
    pub fn retrieve(
        &self,
        storage_path: &str,
        is_compressed: bool,
        is_delta: bool,
        delta_base: Option<&str>,
        expected_sha256: &str,
    ) -> Result<String, VaultError> {
        let bytes = std::fs::read(self.data_dir.join(storage_path))?;
        let payload = if is_compressed {
            decompress(&bytes)?
        } else {
            bytes
        };
        let text = String::from_utf8(payload)
            .map_err(|_| VaultError::Validation(format!("blob '{storage_path}' is not UTF-8")))?;

        let content = if is_delta {
            let base = delta_base.ok_or_else(|| {
                VaultError::Validation(format!("blob '{storage_path}' needs a delta base"))
            })?;
            LineDelta::from_json(&text)?.apply(base)?
        } else {
            text
        };

        let actual = Self::checksum(content.as_bytes());
        if actual != expected_sha256 {
            return Err(VaultError::Integrity {
                path: storage_path.to_string(),
                expected: expected_sha256.to_string(),
                actual,
            });
        }
        Ok(content)
    }

    /// Write an opaque payload (release bundles) under the data directory.
    pub fn write_raw(&self, rel_path: &str, bytes: &[u8]) -> Result<PathBuf, VaultError> {
        let abs = self.data_dir.join(rel_path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs, bytes)?;
        Ok(abs)
    }

    /// Read an opaque payload back.
    pub fn read_raw(&self, rel_path: &str) -> Result<Vec<u8>, VaultError> {
        Ok(std::fs::read(self.data_dir.join(rel_path))?)
    }

    /// Remove a version's blob directory (retention pruning).
    pub fn remove_version_dir(&self, project_id: &str, version_id: &str) -> Result<(), VaultError> {
        let dir = self
            .data_dir
            .join("versions")
            .join(sanitize_component(project_id))
            .join(sanitize_component(version_id));
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
            debug!(dir = %dir.display(), "pruned version blobs");
        }
        Ok(())
    }
}

/// Brotli-compress a payload at the store's fixed quality.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut out = Vec::new();
    let params = brotli::enc::BrotliEncoderParams {
        quality: BROTLI_QUALITY,
        lgwin: BROTLI_WINDOW,
        ..Default::default()
    };
    let mut writer = brotli::CompressorWriter::with_params(&mut out, 4096, &params);
    writer.write_all(bytes)?;
    drop(writer);
    Ok(out)
}

/// Invert [`compress`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut out = Vec::new();
    brotli::BrotliDecompress(&mut &bytes[..], &mut out)?;
    Ok(out)
}

/// Strip path separators and dot-dot segments from an id component.
fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace("..", "_")
}

/// Sanitise a repository-relative file path for on-disk storage: forward
/// slashes survive as directories, everything hostile is flattened.
fn sanitize_path(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        out.push(sanitize_component(segment));
    }
    if out.as_os_str().is_empty() {
        out.push("_");
    }
    out
}
