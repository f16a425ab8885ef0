//! Source validation producing line/column issues for editor clients.

use serde::Serialize;
use smol_str::SmolStr;

use crate::lexer::line_col;
use crate::parser::parse_program;

/// Issue severity reported by [`validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// Finding severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: SmolStr,
}

/// Validation outcome for a logic source.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// True when the source lexes and parses.
    pub is_valid: bool,
    /// Findings, empty when valid.
    pub issues: Vec<Issue>,
}

/// Validate an ST source syntactically.
///
/// Unterminated `(* … *)` comments are reported as a dedicated warning before
/// the parse error they inevitably cause.
#[must_use]
pub fn validate(source: &str) -> ValidationReport {
    let mut issues = Vec::new();

    if let Some(offset) = unterminated_comment(source) {
        let (line, column) = line_col(source, offset);
        issues.push(Issue {
            line,
            column,
            severity: Severity::Warning,
            message: "unterminated block comment".into(),
        });
    }

    if let Err(err) = parse_program(source) {
        let (line, column) = line_col(source, err.pos());
        issues.push(Issue {
            line,
            column,
            severity: Severity::Error,
            message: err.to_string().into(),
        });
    }

    ValidationReport {
        is_valid: issues.iter().all(|i| i.severity != Severity::Error),
        issues,
    }
}

/// Find an `(*` with no closing `*)` after it. Comments do not nest.
fn unterminated_comment(source: &str) -> Option<u32> {
    let mut rest = source;
    let mut base = 0usize;
    while let Some(open) = rest.find("(*") {
        let after = &rest[open + 2..];
        match after.find("*)") {
            Some(close) => {
                let consumed = open + 2 + close + 2;
                base += consumed;
                rest = &rest[consumed..];
            }
            None => return Some((base + open) as u32),
        }
    }
    None
}
