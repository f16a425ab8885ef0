//! Identifier minting.

use rand::Rng;

/// Mint an opaque id `prefix_<12 hex chars>`.
///
/// Ids only need single-writer uniqueness; 48 random bits are plenty for
/// the row counts a project accumulates.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: u64 = rng.gen::<u64>() & 0xffff_ffff_ffff;
    format!("{prefix}_{suffix:012x}")
}

/// Current wall-clock time as an RFC 3339 UTC string.
#[must_use]
pub fn now_iso() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".into())
}
