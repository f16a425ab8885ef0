//! Pre-deploy safety checks.
//!
//! A fixed ordered suite executed in-process. Each check records outcome,
//! severity, structured details and timing; the aggregate passes iff no
//! critical check failed.

use std::collections::HashMap;

use pandaura_store::rows::{CheckSeverity, CheckStatus, CheckType, DeployCheckRow, TagRow};
use pandaura_vault::diff::NamedFile;
use serde_json::json;

/// Inputs the check suite runs against.
pub struct CheckContext<'a> {
    /// The release's materialised files.
    pub files: &'a [NamedFile],
    /// The project's tag table.
    pub tags: &'a [TagRow],
    /// Caller-estimated downtime, seconds.
    pub estimated_downtime_seconds: i64,
}

/// Warning threshold for a single file, bytes.
pub const FILE_SIZE_WARNING: usize = 1024 * 1024;
/// Warning threshold for the whole payload, bytes.
pub const PAYLOAD_SIZE_WARNING: usize = 8 * 1024 * 1024;

/// Run the fixed suite in order, producing one row per check.
#[must_use]
pub fn run_suite(deploy_id: &str, ctx: &CheckContext<'_>) -> Vec<DeployCheckRow> {
    let suite: [(&str, CheckType, CheckSeverity, CheckFn); 8] = [
        ("Static Analysis", CheckType::Syntax, CheckSeverity::Critical, static_analysis),
        ("Tag Dependencies", CheckType::Tags, CheckSeverity::Critical, tag_dependencies),
        ("Tag Conflicts", CheckType::Tags, CheckSeverity::Critical, tag_conflicts),
        (
            "Critical Tag Overwrites",
            CheckType::Tags,
            CheckSeverity::Warning,
            critical_tag_overwrites,
        ),
        (
            "IO Address Conflicts",
            CheckType::Conflicts,
            CheckSeverity::Critical,
            io_address_conflicts,
        ),
        ("Resource Checks", CheckType::Resources, CheckSeverity::Warning, resource_checks),
        (
            "File Size Validation",
            CheckType::Resources,
            CheckSeverity::Warning,
            file_size_validation,
        ),
        (
            "Estimated Downtime",
            CheckType::Resources,
            CheckSeverity::Info,
            estimated_downtime,
        ),
    ];

    suite
        .iter()
        .enumerate()
        .map(|(idx, (name, check_type, severity, run))| {
            let started = std::time::Instant::now();
            let outcome = run(ctx);
            DeployCheckRow {
                id: format!("{deploy_id}-check-{idx}"),
                deploy_id: deploy_id.to_string(),
                name: (*name).to_string(),
                check_type: *check_type,
                status: outcome.status,
                severity: *severity,
                message: Some(outcome.message),
                details_json: outcome.details.map(|d| d.to_string()),
                duration_ms: started.elapsed().as_millis() as i64,
            }
        })
        .collect()
}

/// True iff no critical check failed.
#[must_use]
pub fn all_critical_passed(checks: &[DeployCheckRow]) -> bool {
    !checks
        .iter()
        .any(|c| c.severity == CheckSeverity::Critical && c.status == CheckStatus::Failed)
}

struct Outcome {
    status: CheckStatus,
    message: String,
    details: Option<serde_json::Value>,
}

type CheckFn = fn(&CheckContext<'_>) -> Outcome;

fn logic_files<'a>(ctx: &'a CheckContext<'_>) -> impl Iterator<Item = &'a NamedFile> {
    ctx.files.iter().filter(|f| f.path.ends_with(".st"))
}

fn static_analysis(ctx: &CheckContext<'_>) -> Outcome {
    let mut findings = Vec::new();
    for file in logic_files(ctx) {
        let report = pandaura_syntax::validate::validate(&file.content);
        for issue in &report.issues {
            findings.push(json!({
                "file": file.path,
                "line": issue.line,
                "column": issue.column,
                "severity": format!("{:?}", issue.severity).to_lowercase(),
                "message": issue.message,
            }));
        }
        if !report.is_valid {
            return Outcome {
                status: CheckStatus::Failed,
                message: format!("syntax errors in {}", file.path),
                details: Some(json!({ "issues": findings })),
            };
        }
    }
    Outcome {
        status: CheckStatus::Passed,
        message: format!("{} logic files parsed", logic_files(ctx).count()),
        details: (!findings.is_empty()).then(|| json!({ "issues": findings })),
    }
}

/// Every undeclared identifier referenced by the logic must resolve to a
/// project tag.
fn tag_dependencies(ctx: &CheckContext<'_>) -> Outcome {
    let known: HashMap<String, ()> = ctx
        .tags
        .iter()
        .map(|t| (t.name.to_ascii_uppercase(), ()))
        .collect();
    let mut missing = Vec::new();
    for file in logic_files(ctx) {
        let Ok(program) = pandaura_syntax::parse_program(&file.content) else {
            // Static analysis owns syntax failures.
            continue;
        };
        for name in pandaura_syntax::analysis::external_dependencies(&program) {
            let upper = name.to_ascii_uppercase();
            if is_builtin_name(&upper) {
                continue;
            }
            if !known.contains_key(&upper) {
                missing.push(json!({ "file": file.path, "name": name }));
            }
        }
    }
    if missing.is_empty() {
        Outcome {
            status: CheckStatus::Passed,
            message: "all referenced tags resolve".into(),
            details: None,
        }
    } else {
        Outcome {
            status: CheckStatus::Failed,
            message: format!("{} unresolved tag references", missing.len()),
            details: Some(json!({ "missing": missing })),
        }
    }
}

fn tag_conflicts(ctx: &CheckContext<'_>) -> Outcome {
    let mut by_name: HashMap<String, &TagRow> = HashMap::new();
    let mut conflicts = Vec::new();
    for tag in ctx.tags {
        let key = tag.name.to_ascii_uppercase();
        if let Some(existing) = by_name.get(&key) {
            if existing.tag_type != tag.tag_type {
                conflicts.push(json!({
                    "name": tag.name,
                    "types": [existing.tag_type.as_str(), tag.tag_type.as_str()],
                }));
            }
        } else {
            by_name.insert(key, tag);
        }
    }
    if conflicts.is_empty() {
        Outcome {
            status: CheckStatus::Passed,
            message: "no conflicting tag definitions".into(),
            details: None,
        }
    } else {
        Outcome {
            status: CheckStatus::Failed,
            message: format!("{} tag type conflicts", conflicts.len()),
            details: Some(json!({ "conflicts": conflicts })),
        }
    }
}

fn critical_tag_overwrites(ctx: &CheckContext<'_>) -> Outcome {
    let protected: HashMap<String, &TagRow> = ctx
        .tags
        .iter()
        .filter(|t| t.read_only || t.requires_approval)
        .map(|t| (t.name.to_ascii_uppercase(), t))
        .collect();
    let mut overwrites = Vec::new();
    for file in logic_files(ctx) {
        let Ok(program) = pandaura_syntax::parse_program(&file.content) else {
            continue;
        };
        for name in pandaura_syntax::analysis::assigned_identifiers(&program.body) {
            if protected.contains_key(&name.to_ascii_uppercase()) {
                overwrites.push(json!({ "file": file.path, "tag": name }));
            }
        }
    }
    if overwrites.is_empty() {
        Outcome {
            status: CheckStatus::Passed,
            message: "no protected tags written".into(),
            details: None,
        }
    } else {
        Outcome {
            status: CheckStatus::Warning,
            message: format!("{} protected tags written by logic", overwrites.len()),
            details: Some(json!({ "overwrites": overwrites })),
        }
    }
}

fn io_address_conflicts(ctx: &CheckContext<'_>) -> Outcome {
    let mut by_address: HashMap<&str, &str> = HashMap::new();
    let mut conflicts = Vec::new();
    for tag in ctx.tags {
        let Some(address) = tag.address.as_deref().filter(|a| !a.is_empty()) else {
            continue;
        };
        match by_address.get(address) {
            Some(existing) => conflicts.push(json!({
                "address": address,
                "tags": [existing, &tag.name],
            })),
            None => {
                by_address.insert(address, &tag.name);
            }
        }
    }
    if conflicts.is_empty() {
        Outcome {
            status: CheckStatus::Passed,
            message: "io addresses are unique".into(),
            details: None,
        }
    } else {
        Outcome {
            status: CheckStatus::Failed,
            message: format!("{} io address conflicts", conflicts.len()),
            details: Some(json!({ "conflicts": conflicts })),
        }
    }
}

fn resource_checks(ctx: &CheckContext<'_>) -> Outcome {
    let total: usize = ctx.files.iter().map(|f| f.content.len()).sum();
    if total > PAYLOAD_SIZE_WARNING {
        Outcome {
            status: CheckStatus::Warning,
            message: format!("payload is {total} bytes"),
            details: Some(json!({ "total_bytes": total, "limit": PAYLOAD_SIZE_WARNING })),
        }
    } else {
        Outcome {
            status: CheckStatus::Passed,
            message: format!("payload {total} bytes, {} tags", ctx.tags.len()),
            details: None,
        }
    }
}

fn file_size_validation(ctx: &CheckContext<'_>) -> Outcome {
    let oversized: Vec<serde_json::Value> = ctx
        .files
        .iter()
        .filter(|f| f.content.len() > FILE_SIZE_WARNING)
        .map(|f| json!({ "path": f.path, "bytes": f.content.len() }))
        .collect();
    if oversized.is_empty() {
        Outcome {
            status: CheckStatus::Passed,
            message: "all files within size limits".into(),
            details: None,
        }
    } else {
        Outcome {
            status: CheckStatus::Warning,
            message: format!("{} files exceed {FILE_SIZE_WARNING} bytes", oversized.len()),
            details: Some(json!({ "files": oversized })),
        }
    }
}

fn estimated_downtime(ctx: &CheckContext<'_>) -> Outcome {
    Outcome {
        status: CheckStatus::Passed,
        message: format!("estimated downtime {}s", ctx.estimated_downtime_seconds),
        details: Some(json!({ "seconds": ctx.estimated_downtime_seconds })),
    }
}

fn is_builtin_name(upper: &str) -> bool {
    matches!(
        upper,
        "TO_BOOL" | "TO_INT" | "TO_REAL" | "NOW_MS" | "SCANCOUNT" | "SCANTIME_MS"
    )
}
