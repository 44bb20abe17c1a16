//! Next-label allocation for Versions and Revisions.
//!
//! Allocation reads the current latest row without taking a lock, so two
//! concurrent callers can receive the same candidate. The loser of the race
//! fails on the active `(object_id, version_number)` unique index.

use flatjson_types::{
    parse_semantic_version, IncrementKind, ObjectId, RevisionUuid, VersionId,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::StorageResult;

/// Candidate labels for the next Version of an Object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionLabels {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl VersionLabels {
    /// Independent starting points used when there is no usable history.
    pub fn seed() -> Self {
        Self {
            major: "1.0.0".to_string(),
            minor: "0.1.0".to_string(),
            patch: "0.0.1".to_string(),
        }
    }

    pub fn get(&self, kind: IncrementKind) -> &str {
        match kind {
            IncrementKind::Major => &self.major,
            IncrementKind::Minor => &self.minor,
            IncrementKind::Patch => &self.patch,
        }
    }
}

/// The label and current count for the next Revision of a Version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRevision {
    pub next_revision: RevisionUuid,
    pub current_count: u64,
}

/// Computes candidate labels from the latest active Version of an Object.
///
/// Falls back to [`VersionLabels::seed`] when the Object has no active
/// Versions or its latest label is not a semantic version.
pub fn next_version_label(conn: &Connection, object_id: ObjectId) -> StorageResult<VersionLabels> {
    let latest: Option<String> = conn
        .query_row(
            "SELECT version_number FROM versions
             WHERE object_id = ?1 AND is_active = 1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            params![object_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    let Some(label) = latest else {
        return Ok(VersionLabels::seed());
    };
    let Some(current) = parse_semantic_version(&label) else {
        debug!("Latest version {:?} of object {} is not semver, reseeding", label, object_id);
        return Ok(VersionLabels::seed());
    };
    Ok(VersionLabels {
        major: current.bump(IncrementKind::Major).to_string(),
        minor: current.bump(IncrementKind::Minor).to_string(),
        patch: current.bump(IncrementKind::Patch).to_string(),
    })
}

/// Generates a fresh revision label and counts the active Revisions.
///
/// The label is time-ordered but not derived from the count.
pub fn next_revision_id(conn: &Connection, version_id: VersionId) -> StorageResult<NextRevision> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM revisions WHERE version_id = ?1 AND is_active = 1",
        params![version_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(NextRevision {
        next_revision: RevisionUuid::new(),
        current_count: count.max(0) as u64,
    })
}
