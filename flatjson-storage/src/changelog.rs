//! The append-only audit trail.
//!
//! Entries are only ever inserted. [`record`] must run on the same
//! transaction as the mutation it describes so both commit or neither does.

use chrono::Utc;
use flatjson_model::{ChangelogEntry, NewChangelogEntry};
use flatjson_types::{ChangelogId, ObjectId, RevisionId, VersionId};
use rusqlite::{params, Connection, ToSql};

use crate::error::StorageResult;
use crate::rows::{read_changelog, select_list, tags_to_text, CHANGELOG_COLUMNS};

/// Actor recorded when the caller does not name one.
pub const DEFAULT_ACTOR: &str = "system";

/// Appends one entry.
pub fn record(conn: &Connection, entry: NewChangelogEntry) -> StorageResult<ChangelogEntry> {
    let saved = ChangelogEntry {
        id: ChangelogId::new(),
        object_id: entry.object_id,
        version_id: entry.version_id,
        revision_id: entry.revision_id,
        entity_type: entry.entity_type,
        action: entry.action,
        details: entry.details.unwrap_or_else(|| serde_json::json!({})),
        tags: entry.tags,
        performed_by: entry
            .performed_by
            .filter(|actor| !actor.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
        performed_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO changelog
            (id, object_id, version_id, revision_id, entity_type, action, details, tags, performed_by, performed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            saved.id.to_string(),
            saved.object_id.map(|id| id.to_string()),
            saved.version_id.map(|id| id.to_string()),
            saved.revision_id.map(|id| id.to_string()),
            saved.entity_type.as_str(),
            saved.action.as_str(),
            serde_json::to_string(&saved.details)?,
            tags_to_text(&saved.tags),
            saved.performed_by,
            saved.performed_at,
        ],
    )?;
    Ok(saved)
}

/// Loads entries newest first with pagination.
pub fn list(conn: &Connection, limit: usize, offset: usize) -> StorageResult<Vec<ChangelogEntry>> {
    // SQLite reads a negative LIMIT as unbounded, so saturate instead of wrapping.
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let sql = select_sql("1 = 1", " LIMIT ?1 OFFSET ?2");
    collect(conn, &sql, &[&limit, &offset])
}

/// Returns the total number of entries.
pub fn count(conn: &Connection) -> StorageResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM changelog", [], |row| row.get(0))?;
    Ok(count.max(0) as usize)
}

pub fn for_object(conn: &Connection, id: ObjectId) -> StorageResult<Vec<ChangelogEntry>> {
    collect(conn, &select_sql("c.object_id = ?1", ""), &[&id.to_string()])
}

pub fn for_version(conn: &Connection, id: VersionId) -> StorageResult<Vec<ChangelogEntry>> {
    collect(conn, &select_sql("c.version_id = ?1", ""), &[&id.to_string()])
}

pub fn for_revision(conn: &Connection, id: RevisionId) -> StorageResult<Vec<ChangelogEntry>> {
    collect(conn, &select_sql("c.revision_id = ?1", ""), &[&id.to_string()])
}

fn select_sql(condition: &str, suffix: &str) -> String {
    format!(
        "SELECT {} FROM changelog c WHERE {condition}
         ORDER BY c.performed_at DESC, c.rowid DESC{suffix}",
        select_list("c", "", CHANGELOG_COLUMNS),
    )
}

fn collect(conn: &Connection, sql: &str, args: &[&dyn ToSql]) -> StorageResult<Vec<ChangelogEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, read_changelog)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
