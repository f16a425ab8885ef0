//! LCS-based unified diff generation.

use serde::Serialize;

/// One line-level change. Line numbers are 1-based; `old_line` indexes the
/// old content, `new_line` the new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Line present only in the new content.
    Add {
        /// 1-based position in the new content.
        new_line: usize,
        /// The added line.
        content: String,
    },
    /// Line present only in the old content.
    Delete {
        /// 1-based position in the old content.
        old_line: usize,
        /// The removed line.
        content: String,
    },
}

/// Aligned edit op covering both files in walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    /// Unchanged line at (old 1-based, new 1-based).
    Equal(usize, usize, String),
    /// Line removed from the old content.
    Delete(usize, String),
    /// Line added in the new content.
    Add(usize, String),
}

/// Per-file summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Lines only in the new content.
    pub lines_added: usize,
    /// Lines only in the old content.
    pub lines_deleted: usize,
    /// `min(added, deleted)` — a changed line counts on both sides.
    pub lines_modified: usize,
    /// True when the contents are byte-identical.
    pub is_identical: bool,
}

/// A hunk of consecutive changes with surrounding context.
#[derive(Debug, Clone, Serialize)]
pub struct Hunk {
    /// 1-based first old line covered.
    pub old_start: usize,
    /// Old lines covered.
    pub old_lines: usize,
    /// 1-based first new line covered.
    pub new_start: usize,
    /// New lines covered.
    pub new_lines: usize,
    /// Rendered lines with ` `, `+`, `-` prefixes.
    pub lines: Vec<String>,
}

/// A full single-file diff.
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    /// Summary statistics.
    pub summary: DiffSummary,
    /// Hunks in order.
    pub hunks: Vec<Hunk>,
}

/// Unchanged context lines kept on either side of a hunk.
pub const DEFAULT_CONTEXT: usize = 3;

/// Split on `\n` keeping a trailing empty segment so the line model matches
/// the delta encoder's.
fn to_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Aligned op stream between the contents via classical LCS dynamic
/// programming.
fn edit_ops(old: &str, new: &str) -> Vec<Op> {
    let old_lines = to_lines(old);
    let new_lines = to_lines(new);
    let n = old_lines.len();
    let m = new_lines.len();

    // lcs[i][j] = LCS length of old[i..] and new[j..].
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if old_lines[i] == new_lines[j] {
            ops.push(Op::Equal(i + 1, j + 1, old_lines[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(i + 1, old_lines[i].to_string()));
            i += 1;
        } else {
            ops.push(Op::Add(j + 1, new_lines[j].to_string()));
            j += 1;
        }
    }
    while i < n {
        ops.push(Op::Delete(i + 1, old_lines[i].to_string()));
        i += 1;
    }
    while j < m {
        ops.push(Op::Add(j + 1, new_lines[j].to_string()));
        j += 1;
    }
    ops
}

/// Compute the change list between two contents; equal lines are skipped.
#[must_use]
pub fn diff_lines(old: &str, new: &str) -> Vec<Change> {
    edit_ops(old, new)
        .into_iter()
        .filter_map(|op| match op {
            Op::Equal(..) => None,
            Op::Delete(old_line, content) => Some(Change::Delete { old_line, content }),
            Op::Add(new_line, content) => Some(Change::Add { new_line, content }),
        })
        .collect()
}

/// Summarise a change list.
#[must_use]
pub fn summarize(changes: &[Change], identical: bool) -> DiffSummary {
    let lines_added = changes
        .iter()
        .filter(|c| matches!(c, Change::Add { .. }))
        .count();
    let lines_deleted = changes
        .iter()
        .filter(|c| matches!(c, Change::Delete { .. }))
        .count();
    DiffSummary {
        lines_added,
        lines_deleted,
        lines_modified: lines_added.min(lines_deleted),
        is_identical: identical,
    }
}

/// Diff two contents into hunks plus summary.
#[must_use]
pub fn diff_files(old: &str, new: &str, context: usize) -> FileDiff {
    let identical = old == new;
    if identical {
        return FileDiff {
            summary: DiffSummary {
                lines_added: 0,
                lines_deleted: 0,
                lines_modified: 0,
                is_identical: true,
            },
            hunks: Vec::new(),
        };
    }
    let ops = edit_ops(old, new);
    let changes: Vec<Change> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Equal(..) => None,
            Op::Delete(old_line, content) => Some(Change::Delete {
                old_line: *old_line,
                content: content.clone(),
            }),
            Op::Add(new_line, content) => Some(Change::Add {
                new_line: *new_line,
                content: content.clone(),
            }),
        })
        .collect();
    FileDiff {
        summary: summarize(&changes, false),
        hunks: build_hunks(&ops, context),
    }
}

/// Group change ops into hunks with `context` unchanged lines on either
/// side. A new hunk starts when the run of equal lines between successive
/// changes exceeds `2*context + 1`.
fn build_hunks(ops: &[Op], context: usize) -> Vec<Hunk> {
    let change_indices: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();
    if change_indices.is_empty() {
        return Vec::new();
    }

    let gap_limit = 2 * context + 1;
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = change_indices[0];
    let mut prev = change_indices[0];
    for &idx in &change_indices[1..] {
        if idx - prev - 1 > gap_limit {
            groups.push((start, prev));
            start = idx;
        }
        prev = idx;
    }
    groups.push((start, prev));

    let mut hunks = Vec::with_capacity(groups.len());
    for (first_change, last_change) in groups {
        let span_start = first_change.saturating_sub(context);
        let span_end = (last_change + context).min(ops.len() - 1);

        let mut lines = Vec::new();
        let mut old_start = None;
        let mut new_start = None;
        let mut old_count = 0usize;
        let mut new_count = 0usize;
        for op in &ops[span_start..=span_end] {
            match op {
                Op::Equal(old_line, new_line, content) => {
                    old_start.get_or_insert(*old_line);
                    new_start.get_or_insert(*new_line);
                    old_count += 1;
                    new_count += 1;
                    lines.push(format!(" {content}"));
                }
                Op::Delete(old_line, content) => {
                    old_start.get_or_insert(*old_line);
                    old_count += 1;
                    lines.push(format!("-{content}"));
                }
                Op::Add(new_line, content) => {
                    new_start.get_or_insert(*new_line);
                    new_count += 1;
                    lines.push(format!("+{content}"));
                }
            }
        }
        hunks.push(Hunk {
            old_start: old_start.unwrap_or(1),
            old_lines: old_count,
            new_start: new_start.unwrap_or(1),
            new_lines: new_count,
            lines,
        });
    }
    hunks
}

/// Render a diff as unified text: `--- old`, `+++ new`, `@@` headers.
#[must_use]
pub fn unified_text(old_name: &str, new_name: &str, diff: &FileDiff) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- {old_name}\n+++ {new_name}\n"));
    for hunk in &diff.hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        ));
        for line in &hunk.lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Apply a change list to the old content, reproducing the new content.
/// Exposed for the round-trip law tests.
#[must_use]
pub fn apply_changes(old: &str, changes: &[Change]) -> String {
    let mut lines: Vec<String> = to_lines(old).into_iter().map(str::to_string).collect();
    let mut deletes: Vec<usize> = changes
        .iter()
        .filter_map(|c| match c {
            Change::Delete { old_line, .. } => Some(*old_line),
            Change::Add { .. } => None,
        })
        .collect();
    deletes.sort_unstable_by(|a, b| b.cmp(a));
    for line in deletes {
        if line >= 1 && line <= lines.len() {
            lines.remove(line - 1);
        }
    }
    let mut adds: Vec<(usize, &str)> = changes
        .iter()
        .filter_map(|c| match c {
            Change::Add { new_line, content } => Some((*new_line, content.as_str())),
            Change::Delete { .. } => None,
        })
        .collect();
    adds.sort_unstable_by_key(|(line, _)| *line);
    for (line, content) in adds {
        let idx = (line - 1).min(lines.len());
        lines.insert(idx, content.to_string());
    }
    lines.join("\n")
}

/// LCS similarity ratio over the larger line count, in `[0, 1]`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_lines = to_lines(a);
    let b_lines = to_lines(b);
    let max_len = a_lines.len().max(b_lines.len());
    if max_len == 0 {
        return 1.0;
    }
    let common = edit_ops(a, b)
        .iter()
        .filter(|op| matches!(op, Op::Equal(..)))
        .count();
    common as f64 / max_len as f64
}

// =============================================================================
// Multi-file comparison
// =============================================================================

/// A named file content pair for set comparison.
#[derive(Debug, Clone)]
pub struct NamedFile {
    /// Repository-relative path.
    pub path: String,
    /// Full content.
    pub content: String,
}

/// Per-file entry in a multi-file comparison.
#[derive(Debug, Clone, Serialize)]
pub struct FileComparison {
    /// Repository-relative path.
    pub path: String,
    /// `added`, `deleted`, `modified`, or `moved`.
    pub change: String,
    /// For moves: the path the content came from.
    pub moved_from: Option<String>,
    /// Line statistics.
    pub summary: DiffSummary,
    /// Unified diff text.
    pub diff: String,
}

/// Aggregate statistics over a comparison.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ComparisonTotals {
    /// Files with any change.
    pub files_changed: usize,
    /// Files only in the new set.
    pub files_added: usize,
    /// Files in both with differing content.
    pub files_modified: usize,
    /// Files only in the old set.
    pub files_deleted: usize,
    /// Sum of per-file added lines.
    pub total_lines_added: usize,
    /// Sum of per-file deleted lines.
    pub total_lines_deleted: usize,
}

/// A full multi-file comparison result.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    /// Per-file entries in path order.
    pub files: Vec<FileComparison>,
    /// Aggregate totals.
    pub totals: ComparisonTotals,
}

/// Similarity threshold above which a delete/add pair is reported as a move.
pub const MOVE_SIMILARITY: f64 = 0.8;

/// Paths carrying tag metadata are skipped; they churn on every capture.
fn is_metadata_path(path: &str) -> bool {
    path.ends_with("tags.json") || path.contains("/tags.json")
}

/// Compare two file sets, classifying each path as added, deleted, modified
/// or (when similarity permits) moved.
#[must_use]
pub fn compare_file_sets(
    old_files: &[NamedFile],
    new_files: &[NamedFile],
    detect_moves: bool,
) -> Comparison {
    let mut files = Vec::new();
    let mut totals = ComparisonTotals::default();

    let find = |set: &[NamedFile], path: &str| -> Option<String> {
        set.iter()
            .find(|f| f.path == path)
            .map(|f| f.content.clone())
    };

    let mut deleted: Vec<&NamedFile> = Vec::new();
    for old in old_files {
        if is_metadata_path(&old.path) {
            continue;
        }
        if find(new_files, &old.path).is_none() {
            deleted.push(old);
        }
    }

    let mut moved_paths: Vec<(String, String)> = Vec::new();
    for new in new_files {
        if is_metadata_path(&new.path) {
            continue;
        }
        match find(old_files, &new.path) {
            Some(old_content) => {
                if old_content != new.content {
                    let diff = diff_files(&old_content, &new.content, DEFAULT_CONTEXT);
                    totals.files_modified += 1;
                    totals.total_lines_added += diff.summary.lines_added;
                    totals.total_lines_deleted += diff.summary.lines_deleted;
                    files.push(FileComparison {
                        path: new.path.clone(),
                        change: "modified".into(),
                        moved_from: None,
                        diff: unified_text(&new.path, &new.path, &diff),
                        summary: diff.summary,
                    });
                }
            }
            None => {
                let moved_from = if detect_moves {
                    deleted
                        .iter()
                        .find(|old| similarity(&old.content, &new.content) >= MOVE_SIMILARITY)
                        .map(|old| old.path.clone())
                } else {
                    None
                };
                let diff = diff_files("", &new.content, DEFAULT_CONTEXT);
                totals.files_added += 1;
                totals.total_lines_added += diff.summary.lines_added;
                if let Some(from) = &moved_from {
                    moved_paths.push((from.clone(), new.path.clone()));
                }
                files.push(FileComparison {
                    path: new.path.clone(),
                    change: if moved_from.is_some() {
                        "moved".into()
                    } else {
                        "added".into()
                    },
                    moved_from,
                    diff: unified_text("/dev/null", &new.path, &diff),
                    summary: diff.summary,
                });
            }
        }
    }

    for old in deleted {
        if moved_paths.iter().any(|(from, _)| from == &old.path) {
            continue;
        }
        let diff = diff_files(&old.content, "", DEFAULT_CONTEXT);
        totals.files_deleted += 1;
        totals.total_lines_deleted += diff.summary.lines_deleted;
        files.push(FileComparison {
            path: old.path.clone(),
            change: "deleted".into(),
            moved_from: None,
            diff: unified_text(&old.path, "/dev/null", &diff),
            summary: diff.summary,
        });
    }

    totals.files_changed = files.len();
    Comparison { files, totals }
}
