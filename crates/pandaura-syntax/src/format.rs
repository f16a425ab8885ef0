//! Source re-indentation.

/// Formatting options for [`format_source`].
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Spaces per indent level.
    pub indent_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

/// Re-indent ST source line by line.
///
/// Block openers (`PROGRAM`, `VAR`, `IF`, `WHILE`, `FOR`) indent the lines
/// that follow; `END_*` closes the block, and `ELSE`/`ELSIF` sit at the level
/// of their `IF`. The line content itself is only trimmed, never reflowed.
#[must_use]
pub fn format_source(source: &str, options: FormatOptions) -> String {
    let mut depth: usize = 0;
    let mut out = String::with_capacity(source.len());
    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        let upper = line.to_ascii_uppercase();
        let first = upper.split_whitespace().next().unwrap_or("");
        let dedent_before = matches!(
            first,
            "END_PROGRAM" | "END_VAR" | "END_IF" | "END_WHILE" | "END_FOR" | "ELSE" | "ELSIF"
        );
        let indent_after = matches!(first, "PROGRAM" | "VAR" | "ELSE" | "ELSIF")
            || opens_block(&upper, first);

        if dedent_before {
            depth = depth.saturating_sub(1);
        }
        for _ in 0..depth * options.indent_width {
            out.push(' ');
        }
        out.push_str(line);
        out.push('\n');
        if indent_after {
            depth += 1;
        }
    }
    out
}

/// `IF`/`WHILE`/`FOR` open a block unless the statement closes on the same
/// line (single-line `IF x THEN y; END_IF;`).
fn opens_block(upper: &str, first: &str) -> bool {
    match first {
        "IF" => !upper.contains("END_IF"),
        "WHILE" => !upper.contains("END_WHILE"),
        "FOR" => !upper.contains("END_FOR"),
        _ => false,
    }
}
