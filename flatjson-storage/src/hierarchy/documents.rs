use flatjson_model::{flatten, unflatten, FlatRow, NewProperty, Property};
use flatjson_types::{ObjectId, RevisionId, VersionId};
use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::debug;

use super::{properties, HierarchyStore};
use crate::error::StorageResult;
use crate::lock::{check_lock_hierarchy, LockChain, ObjectChain, RevisionChain, VersionChain};
use crate::rows::{read_property, select_list, PROPERTY_COLUMNS};

impl HierarchyStore {
    /// Rebuilds the nested document held by a Revision's active Properties.
    pub fn unflatten_revision(&self, id: RevisionId) -> StorageResult<Value> {
        self.db.with_connection(|conn| {
            RevisionChain::load(conn, id)?;
            let rows = flat_rows(conn, "p.revision_id = ?1", &id.to_string())?;
            Ok(unflatten(&rows))
        })
    }

    /// Merges the active Properties of every active Revision of a Version.
    pub fn unflatten_version(&self, id: VersionId) -> StorageResult<Value> {
        self.db.with_connection(|conn| {
            VersionChain::load(conn, id)?;
            let rows = flat_rows(
                conn,
                "r.version_id = ?1 AND r.is_active = 1",
                &id.to_string(),
            )?;
            Ok(unflatten(&rows))
        })
    }

    /// Merges the active Properties under every active Version and Revision
    /// of an Object.
    pub fn unflatten_object(&self, id: ObjectId) -> StorageResult<Value> {
        self.db.with_connection(|conn| {
            ObjectChain::load(conn, id)?;
            let rows = flat_rows(
                conn,
                "v.object_id = ?1 AND v.is_active = 1 AND r.is_active = 1",
                &id.to_string(),
            )?;
            Ok(unflatten(&rows))
        })
    }

    /// Flattens a document and stores one Property per leaf.
    ///
    /// All leaves are written in one transaction; a conflict on any key path
    /// leaves the Revision untouched.
    pub fn ingest_document(
        &self,
        revision_id: RevisionId,
        document: &Value,
        actor: Option<&str>,
    ) -> StorageResult<Vec<Property>> {
        let entries = flatten(document)?;
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<RevisionChain>(tx, revision_id)?;
            let created = entries
                .into_iter()
                .map(|entry| {
                    let input = NewProperty::new(revision_id, entry.key_path, entry.value);
                    properties::insert_property(tx, &parent, input, actor)
                })
                .collect::<StorageResult<Vec<_>>>()?;
            debug!("Ingested {} properties into revision {}", created.len(), revision_id);
            Ok(created)
        })
    }
}

/// Active property rows matching `condition`, in revision then creation order.
fn flat_rows(conn: &Connection, condition: &str, key: &str) -> StorageResult<Vec<FlatRow>> {
    let sql = format!(
        "SELECT {} FROM properties p
         JOIN revisions r ON r.id = p.revision_id
         JOIN versions v ON v.id = r.version_id
         WHERE {condition} AND p.is_active = 1
         ORDER BY v.created_at, v.rowid, r.created_at, r.rowid, p.created_at, p.rowid",
        select_list("p", "", PROPERTY_COLUMNS)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![key], |row| {
        read_property(row, "").map(|property| property.flat_row())
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
