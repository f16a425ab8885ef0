//! Line-level delta encoding.
//!
//! A delta is an edit script of add/delete operations keyed by line number,
//! serialised as `{type:"line-delta", changes:[…]}`. Applying a delta to its
//! base reproduces the new content exactly.

use serde::{Deserialize, Serialize};

use crate::diff;
use crate::error::VaultError;

/// One edit operation. `line` is 1-based: deletes index into the base,
/// adds index into the new content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeltaChange {
    /// Insert `content` so it lands at `line` in the new file.
    Add {
        /// 1-based target line in the new content.
        line: usize,
        /// The inserted line.
        content: String,
    },
    /// Remove base line `line`.
    Delete {
        /// 1-based line in the base content.
        line: usize,
    },
}

/// A serialisable line-delta document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDelta {
    /// Always `line-delta`; rejected on decode otherwise.
    #[serde(rename = "type")]
    pub kind: String,
    /// Edit script in diff order.
    pub changes: Vec<DeltaChange>,
}

impl LineDelta {
    /// Compute the delta turning `base` into `new`.
    #[must_use]
    pub fn encode(base: &str, new: &str) -> Self {
        let changes = diff::diff_lines(base, new)
            .into_iter()
            .map(|change| match change {
                diff::Change::Add { new_line, content } => DeltaChange::Add {
                    line: new_line,
                    content,
                },
                diff::Change::Delete { old_line, .. } => DeltaChange::Delete { line: old_line },
            })
            .collect();
        Self {
            kind: "line-delta".into(),
            changes,
        }
    }

    /// Apply the delta to `base`, reproducing the new content.
    pub fn apply(&self, base: &str) -> Result<String, VaultError> {
        if self.kind != "line-delta" {
            return Err(VaultError::Validation(format!(
                "unknown delta type '{}'",
                self.kind
            )));
        }
        let mut lines: Vec<String> = split_lines(base);

        // Deletions first, highest line number first so indices stay valid.
        let mut deletes: Vec<usize> = self
            .changes
            .iter()
            .filter_map(|change| match change {
                DeltaChange::Delete { line } => Some(*line),
                DeltaChange::Add { .. } => None,
            })
            .collect();
        deletes.sort_unstable_by(|a, b| b.cmp(a));
        for line in deletes {
            if line == 0 || line > lines.len() {
                return Err(VaultError::Validation(format!(
                    "delta deletes line {line} beyond base length {}",
                    lines.len()
                )));
            }
            lines.remove(line - 1);
        }

        // Insertions in ascending target order land at their final positions.
        let mut adds: Vec<(usize, &str)> = self
            .changes
            .iter()
            .filter_map(|change| match change {
                DeltaChange::Add { line, content } => Some((*line, content.as_str())),
                DeltaChange::Delete { .. } => None,
            })
            .collect();
        adds.sort_unstable_by_key(|(line, _)| *line);
        for (line, content) in adds {
            if line == 0 || line > lines.len() + 1 {
                return Err(VaultError::Validation(format!(
                    "delta inserts line {line} beyond new length {}",
                    lines.len() + 1
                )));
            }
            lines.insert(line - 1, content.to_string());
        }

        Ok(lines.join("\n"))
    }

    /// Serialised form, used for the 70% size threshold and for storage.
    pub fn to_json(&self) -> Result<String, VaultError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored delta document.
    pub fn from_json(text: &str) -> Result<Self, VaultError> {
        let delta: Self = serde_json::from_str(text)?;
        if delta.kind != "line-delta" {
            return Err(VaultError::Validation(format!(
                "unknown delta type '{}'",
                delta.kind
            )));
        }
        Ok(delta)
    }
}

/// Split on `\n` without dropping a trailing empty segment, so joining with
/// `\n` reproduces the content byte-for-byte (trailing newlines included).
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
