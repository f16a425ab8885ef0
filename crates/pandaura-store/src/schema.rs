//! Schema DDL, applied idempotently on open.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    description   TEXT,
    connection_json TEXT,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS logic_files (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    content       TEXT NOT NULL,
    vendor        TEXT NOT NULL,
    author        TEXT,
    updated_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS tags (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    tag_type      TEXT NOT NULL,
    udt_type      TEXT,
    value_json    TEXT,
    address       TEXT,
    source        TEXT NOT NULL,
    scope         TEXT NOT NULL,
    lifecycle     TEXT NOT NULL,
    path          TEXT,
    alarms_json   TEXT,
    read_only     INTEGER NOT NULL DEFAULT 0,
    requires_approval INTEGER NOT NULL DEFAULT 0,
    updated_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS tag_aliases (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    alias         TEXT NOT NULL,
    tag_name      TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, alias)
);

CREATE TABLE IF NOT EXISTS udts (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    description   TEXT,
    members_json  TEXT NOT NULL DEFAULT '[]',
    updated_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS sessions (
    id            TEXT PRIMARY KEY,
    user_name     TEXT NOT NULL,
    token         TEXT NOT NULL UNIQUE,
    created_at_ms INTEGER NOT NULL,
    expires_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS branches (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    stage         TEXT NOT NULL,
    parent_branch_id TEXT,
    is_default    INTEGER NOT NULL DEFAULT 0,
    created_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS versions (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    branch_id     TEXT NOT NULL,
    label         TEXT NOT NULL,
    author        TEXT NOT NULL,
    message       TEXT NOT NULL,
    status        TEXT NOT NULL,
    checksum      TEXT NOT NULL,
    parent_version_id TEXT,
    approvals     INTEGER NOT NULL DEFAULT 0,
    approvals_required INTEGER NOT NULL DEFAULT 3,
    approvers_json TEXT NOT NULL DEFAULT '[]',
    signed        INTEGER NOT NULL DEFAULT 0,
    signature     TEXT,
    signed_by     TEXT,
    signed_at     TEXT,
    original_size INTEGER NOT NULL DEFAULT 0,
    compressed_size INTEGER NOT NULL DEFAULT 0,
    created_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_versions_branch
    ON versions (project_id, branch_id, created_at_ms);

CREATE TABLE IF NOT EXISTS version_files (
    id            TEXT PRIMARY KEY,
    version_id    TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    path          TEXT NOT NULL,
    file_type     TEXT NOT NULL,
    change_type   TEXT NOT NULL,
    lines_added   INTEGER NOT NULL DEFAULT 0,
    lines_deleted INTEGER NOT NULL DEFAULT 0,
    size          INTEGER NOT NULL DEFAULT 0,
    sha256        TEXT NOT NULL,
    storage_path  TEXT NOT NULL,
    is_compressed INTEGER NOT NULL DEFAULT 0,
    is_delta      INTEGER NOT NULL DEFAULT 0,
    delta_base_file_id TEXT,
    diff_preview  TEXT
);

CREATE TABLE IF NOT EXISTS snapshots (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version_id    TEXT NOT NULL,
    name          TEXT NOT NULL,
    description   TEXT,
    tags_json     TEXT NOT NULL DEFAULT '[]',
    created_by    TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS snapshot_promotions (
    id            TEXT PRIMARY KEY,
    snapshot_id   TEXT NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    from_stage    TEXT NOT NULL,
    to_stage      TEXT NOT NULL,
    promoted_by   TEXT NOT NULL,
    promoted_at_ms INTEGER NOT NULL,
    notes         TEXT,
    checks_passed INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS releases (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    snapshot_id   TEXT,
    version_id    TEXT NOT NULL,
    name          TEXT NOT NULL,
    version_label TEXT NOT NULL,
    environment   TEXT NOT NULL,
    bundle_path   TEXT NOT NULL,
    bundle_size   INTEGER NOT NULL DEFAULT 0,
    bundle_checksum TEXT NOT NULL,
    signed        INTEGER NOT NULL DEFAULT 0,
    signature     TEXT,
    signed_by     TEXT,
    status        TEXT NOT NULL,
    linked_deploys INTEGER NOT NULL DEFAULT 0,
    last_deployed_at_ms INTEGER,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS deployments (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    release_id    TEXT NOT NULL,
    version_id    TEXT NOT NULL,
    snapshot_id   TEXT,
    deploy_name   TEXT NOT NULL,
    environment   TEXT NOT NULL,
    strategy      TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    started_at_ms INTEGER,
    completed_at_ms INTEGER,
    duration_seconds INTEGER,
    estimated_downtime_seconds INTEGER NOT NULL DEFAULT 0,
    initiated_by  TEXT NOT NULL,
    approved_by   TEXT,
    approval_count INTEGER NOT NULL DEFAULT 0,
    approvals_required INTEGER NOT NULL DEFAULT 0,
    target_runtimes_json TEXT NOT NULL DEFAULT '[]',
    progress_percent INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    rollback_reason TEXT,
    previous_version_id TEXT,
    checks_passed INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS deploy_approvals (
    id            TEXT PRIMARY KEY,
    deploy_id     TEXT NOT NULL REFERENCES deployments(id) ON DELETE CASCADE,
    approver_name TEXT,
    approver_role TEXT NOT NULL,
    status        TEXT NOT NULL,
    comment       TEXT,
    requested_at_ms INTEGER NOT NULL,
    responded_at_ms INTEGER,
    is_required   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS deploy_checks (
    id            TEXT PRIMARY KEY,
    deploy_id     TEXT NOT NULL REFERENCES deployments(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    check_type    TEXT NOT NULL,
    status        TEXT NOT NULL,
    severity      TEXT NOT NULL,
    message       TEXT,
    details_json  TEXT,
    duration_ms   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS deploy_logs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    deploy_id     TEXT NOT NULL REFERENCES deployments(id) ON DELETE CASCADE,
    timestamp_ms  INTEGER NOT NULL,
    level         TEXT NOT NULL,
    message       TEXT NOT NULL,
    step          TEXT
);

CREATE TABLE IF NOT EXISTS deploy_rollbacks (
    id            TEXT PRIMARY KEY,
    deploy_id     TEXT NOT NULL REFERENCES deployments(id) ON DELETE CASCADE,
    triggered_by  TEXT NOT NULL,
    reason        TEXT NOT NULL,
    triggered_at_ms INTEGER NOT NULL,
    completed_at_ms INTEGER,
    status        TEXT NOT NULL,
    is_automatic  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS changelog (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id    TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    action        TEXT NOT NULL,
    actor         TEXT,
    detail        TEXT,
    created_at_ms INTEGER NOT NULL
);
";
