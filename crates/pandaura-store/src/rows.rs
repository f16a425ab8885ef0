//! Row structs and status enums mirroring the persisted schema.

#![allow(missing_docs)]

use serde::Serialize;

use crate::error::StoreError;

/// Generates a string-backed status enum with `as_str`, `parse`, `Display`
/// and string serialization. Unknown values are rejected at the edge.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// Canonical persisted spelling.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parse the persisted spelling, rejecting unknown values.
            pub fn parse(text: &str) -> Result<Self, StoreError> {
                match text {
                    $($text => Ok(Self::$variant),)+
                    other => Err(StoreError::InvalidInput(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

str_enum! {
    /// Branch / promotion stage. Ordering: `dev < qa < staging < prod`.
    Stage {
        Main => "main",
        Dev => "dev",
        Qa => "qa",
        Staging => "staging",
        Prod => "prod",
    }
}

impl Stage {
    /// Rank within the promotion ordering; `main` sits outside it.
    #[must_use]
    pub fn promotion_rank(self) -> Option<u8> {
        match self {
            Stage::Main => None,
            Stage::Dev => Some(0),
            Stage::Qa => Some(1),
            Stage::Staging => Some(2),
            Stage::Prod => Some(3),
        }
    }

    /// Parse accepting the `production` alias used by deployment clients.
    pub fn parse_environment(text: &str) -> Result<Self, StoreError> {
        match text {
            "production" => Ok(Stage::Prod),
            other => Stage::parse(other),
        }
    }
}

str_enum! {
    /// Immutable-version lifecycle.
    VersionStatus {
        Draft => "draft",
        Staged => "staged",
        Released => "released",
        Deprecated => "deprecated",
    }
}

str_enum! {
    /// Release lifecycle.
    ReleaseStatus {
        Active => "active",
        Deprecated => "deprecated",
        Archived => "archived",
    }
}

str_enum! {
    /// Deployment state machine.
    DeployStatus {
        Pending => "pending",
        Running => "running",
        Paused => "paused",
        Success => "success",
        Failed => "failed",
        RolledBack => "rolled-back",
    }
}

str_enum! {
    /// Rollout strategy.
    DeployStrategy {
        Atomic => "atomic",
        Canary => "canary",
        Staged => "staged",
    }
}

str_enum! {
    /// Approval decision state.
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

str_enum! {
    /// Approver roles required by target stage.
    ApproverRole {
        OperationsManager => "operations_manager",
        SafetyEngineer => "safety_engineer",
        LeadDeveloper => "lead_developer",
    }
}

str_enum! {
    /// Safety-check category.
    CheckType {
        Syntax => "syntax",
        Tags => "tags",
        Conflicts => "conflicts",
        Resources => "resources",
    }
}

str_enum! {
    /// Safety-check outcome.
    CheckStatus {
        Pending => "pending",
        Running => "running",
        Passed => "passed",
        Warning => "warning",
        Failed => "failed",
    }
}

str_enum! {
    /// Safety-check severity.
    CheckSeverity {
        Critical => "critical",
        Warning => "warning",
        Info => "info",
    }
}

str_enum! {
    /// Deploy log level.
    DeployLogLevel {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Success => "success",
    }
}

str_enum! {
    /// Rollback row state.
    RollbackStatus {
        Pending => "pending",
        Running => "running",
        Success => "success",
        Failed => "failed",
    }
}

str_enum! {
    /// Tag data type.
    TagType {
        Bool => "BOOL",
        Int => "INT",
        DInt => "DINT",
        Real => "REAL",
        LReal => "LREAL",
        String => "STRING",
        Time => "TIME",
        Array => "ARRAY",
        Udt => "UDT",
    }
}

str_enum! {
    /// Whether a tag mirrors the shadow runtime or live hardware.
    TagSource {
        Shadow => "shadow",
        Live => "live",
    }
}

str_enum! {
    /// Tag visibility scope.
    TagScope {
        Global => "global",
        Program => "program",
        Task => "task",
    }
}

str_enum! {
    /// Tag lifecycle.
    TagLifecycle {
        Draft => "draft",
        Active => "active",
        Deprecated => "deprecated",
        Archived => "archived",
    }
}

str_enum! {
    /// ST vendor flavour of a logic file.
    Vendor {
        Neutral => "neutral",
        Siemens => "siemens",
        Rockwell => "rockwell",
        Beckhoff => "beckhoff",
    }
}

str_enum! {
    /// Per-file change classification within a version.
    FileChangeType {
        Added => "added",
        Modified => "modified",
        Deleted => "deleted",
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Top-level project container.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Connection profile JSON: vendor, address, port, slot, rack.
    pub connection_json: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// A named ST source file.
#[derive(Debug, Clone, Serialize)]
pub struct LogicFileRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub content: String,
    pub vendor: Vendor,
    pub author: Option<String>,
    pub updated_at_ms: i64,
}

/// A named addressable variable.
#[derive(Debug, Clone, Serialize)]
pub struct TagRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub tag_type: TagType,
    pub udt_type: Option<String>,
    /// Current value as JSON.
    pub value_json: Option<String>,
    pub address: Option<String>,
    pub source: TagSource,
    pub scope: TagScope,
    pub lifecycle: TagLifecycle,
    /// Hierarchy path `area/equipment/routine`.
    pub path: Option<String>,
    /// Alarm thresholds JSON: low/high/critical.
    pub alarms_json: Option<String>,
    pub read_only: bool,
    pub requires_approval: bool,
    pub updated_at_ms: i64,
}

/// One ordered member of a user-defined type.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct UdtMember {
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udt_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named composite type with ordered members.
#[derive(Debug, Clone, Serialize)]
pub struct UdtRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Ordered members JSON: `[{name, type, udtType?, arraySize?, …}]`.
    pub members_json: String,
    pub updated_at_ms: i64,
}

/// Operator session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub user_name: String,
    pub token: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}

/// Mutable branch pointer; versions are the immutable nodes.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub stage: Stage,
    pub parent_branch_id: Option<String>,
    pub is_default: bool,
    pub created_at_ms: i64,
}

/// An immutable version capture.
#[derive(Debug, Clone, Serialize)]
pub struct VersionRow {
    pub id: String,
    pub project_id: String,
    pub branch_id: String,
    pub label: String,
    pub author: String,
    pub message: String,
    pub status: VersionStatus,
    /// SHA-256 over concatenated `path || content` of all files.
    pub checksum: String,
    pub parent_version_id: Option<String>,
    pub approvals: i64,
    pub approvals_required: i64,
    /// Approver list JSON: `[{name, timestamp}]`.
    pub approvers_json: String,
    pub signed: bool,
    pub signature: Option<String>,
    pub signed_by: Option<String>,
    pub signed_at: Option<String>,
    pub original_size: i64,
    pub compressed_size: i64,
    pub created_at_ms: i64,
}

/// Per-version file record.
#[derive(Debug, Clone, Serialize)]
pub struct VersionFileRow {
    pub id: String,
    pub version_id: String,
    pub path: String,
    pub file_type: String,
    pub change_type: FileChangeType,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub size: i64,
    pub sha256: String,
    pub storage_path: String,
    pub is_compressed: bool,
    pub is_delta: bool,
    pub delta_base_file_id: Option<String>,
    /// First 50 lines of unified diff against the parent, when modified.
    pub diff_preview: Option<String>,
}

/// A named pointer to a single version.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub id: String,
    pub project_id: String,
    pub version_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Free-form labels JSON array.
    pub tags_json: String,
    pub created_by: String,
    pub created_at_ms: i64,
}

/// Immutable promotion record.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionRow {
    pub id: String,
    pub snapshot_id: String,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub promoted_by: String,
    pub promoted_at_ms: i64,
    pub notes: Option<String>,
    pub checks_passed: bool,
}

/// Immutable signed release bundle.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRow {
    pub id: String,
    pub project_id: String,
    pub snapshot_id: Option<String>,
    pub version_id: String,
    pub name: String,
    pub version_label: String,
    pub environment: Stage,
    pub bundle_path: String,
    pub bundle_size: i64,
    pub bundle_checksum: String,
    pub signed: bool,
    pub signature: Option<String>,
    pub signed_by: Option<String>,
    pub status: ReleaseStatus,
    pub linked_deploys: i64,
    pub last_deployed_at_ms: Option<i64>,
    /// Promotion history JSON appended by `promote_release`.
    pub metadata_json: String,
    pub created_at_ms: i64,
}

/// Deployment record.
#[derive(Debug, Clone, Serialize)]
pub struct DeployRow {
    pub id: String,
    pub project_id: String,
    pub release_id: String,
    pub version_id: String,
    pub snapshot_id: Option<String>,
    pub deploy_name: String,
    pub environment: Stage,
    pub strategy: DeployStrategy,
    pub status: DeployStatus,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub estimated_downtime_seconds: i64,
    pub initiated_by: String,
    pub approved_by: Option<String>,
    pub approval_count: i64,
    pub approvals_required: i64,
    /// Target runtime ids JSON array.
    pub target_runtimes_json: String,
    pub progress_percent: i64,
    pub error_message: Option<String>,
    pub rollback_reason: Option<String>,
    pub previous_version_id: Option<String>,
    pub checks_passed: bool,
}

/// Per-deployment approval request.
#[derive(Debug, Clone, Serialize)]
pub struct DeployApprovalRow {
    pub id: String,
    pub deploy_id: String,
    pub approver_name: Option<String>,
    pub approver_role: ApproverRole,
    pub status: ApprovalStatus,
    pub comment: Option<String>,
    pub requested_at_ms: i64,
    pub responded_at_ms: Option<i64>,
    pub is_required: bool,
}

/// One safety-check result.
#[derive(Debug, Clone, Serialize)]
pub struct DeployCheckRow {
    pub id: String,
    pub deploy_id: String,
    pub name: String,
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub severity: CheckSeverity,
    pub message: Option<String>,
    /// Structured details JSON.
    pub details_json: Option<String>,
    pub duration_ms: i64,
}

/// Append-only deploy log entry.
#[derive(Debug, Clone, Serialize)]
pub struct DeployLogRow {
    pub id: i64,
    pub deploy_id: String,
    pub timestamp_ms: i64,
    pub level: DeployLogLevel,
    pub message: String,
    pub step: Option<String>,
}

/// Rollback record.
#[derive(Debug, Clone, Serialize)]
pub struct DeployRollbackRow {
    pub id: String,
    pub deploy_id: String,
    pub triggered_by: String,
    pub reason: String,
    pub triggered_at_ms: i64,
    pub completed_at_ms: Option<i64>,
    pub status: RollbackStatus,
    pub is_automatic: bool,
}

/// Version changelog entry.
#[derive(Debug, Clone, Serialize)]
pub struct ChangelogRow {
    pub id: i64,
    pub version_id: String,
    pub action: String,
    pub actor: Option<String>,
    pub detail: Option<String>,
    pub created_at_ms: i64,
}
