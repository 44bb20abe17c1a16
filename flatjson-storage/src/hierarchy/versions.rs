use chrono::Utc;
use flatjson_model::{ChangeAction, EntityKind, NewVersion, Version, VersionUpdate};
use flatjson_types::{IncrementKind, ObjectId, VersionId};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

use super::{record, revisions, settle_deleted_at, HierarchyStore, ListOptions};
use crate::allocator;
use crate::error::{StorageError, StorageResult};
use crate::lock::{check_lock_hierarchy, LockChain, ObjectChain, VersionChain};
use crate::rows::{read_version, select_list, tags_to_text, VERSION_COLUMNS};

impl HierarchyStore {
    /// Lists Versions, optionally only those of one Object.
    pub fn list_versions(
        &self,
        object_id: Option<ObjectId>,
        options: ListOptions,
    ) -> StorageResult<Vec<Version>> {
        self.db.with_connection(|conn| {
            if let Some(object_id) = object_id {
                ObjectChain::load(conn, object_id)?;
            }
            let mut versions = select_versions(conn, object_id, options.active_only())?;
            if options.with_children {
                for version in &mut versions {
                    version.revisions = Some(revisions::select_revisions(
                        conn,
                        Some(version.id),
                        options.active_only(),
                    )?);
                }
            }
            Ok(versions)
        })
    }

    /// Loads one Version with its active Revisions.
    pub fn get_version(&self, id: VersionId) -> StorageResult<Version> {
        self.db.with_connection(|conn| {
            let mut version = VersionChain::load(conn, id)?.version;
            version.revisions = Some(revisions::select_revisions(conn, Some(id), true)?);
            Ok(version)
        })
    }

    /// Creates a Version with an explicit label.
    pub fn create_version(&self, input: NewVersion, actor: Option<&str>) -> StorageResult<Version> {
        self.validate_version_label(&input.version_number)?;
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<ObjectChain>(tx, input.object_id)?;
            insert_version(
                tx,
                &parent,
                input.version_number,
                input.description,
                input.tags,
                actor,
            )
        })
    }

    /// Creates the next Version of an Object using the chosen candidate label.
    pub fn increment_version(
        &self,
        object_id: ObjectId,
        kind: IncrementKind,
        actor: Option<&str>,
    ) -> StorageResult<Version> {
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<ObjectChain>(tx, object_id)?;
            let labels = allocator::next_version_label(tx, object_id)?;
            let label = labels.get(kind).to_string();
            debug!("Allocated {} version {} for object {}", kind, label, object_id);
            insert_version(tx, &parent, label, None, BTreeSet::new(), actor)
        })
    }

    pub fn update_version(
        &self,
        id: VersionId,
        changes: VersionUpdate,
        actor: Option<&str>,
    ) -> StorageResult<Version> {
        if let Some(label) = &changes.version_number {
            self.validate_version_label(label)?;
        }
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<VersionChain>(tx, id)?;
            let before = chain.version.clone();
            let now = Utc::now();

            let mut after = before.clone();
            if let Some(label) = changes.version_number {
                after.version_number = label;
            }
            if changes.description.is_some() {
                after.description = changes.description;
            }
            if let Some(tags) = changes.tags {
                after.tags = tags;
            }
            if let Some(is_frozen) = changes.is_frozen {
                after.is_frozen = is_frozen;
            }
            if let Some(is_active) = changes.is_active {
                after.is_active = is_active;
            }
            after.deleted_at = settle_deleted_at(&before.deleted_at, before.is_active, after.is_active, now);
            after.updated_at = now;

            tx.execute(
                "UPDATE versions
                 SET version_number = ?1, description = ?2, tags = ?3, is_active = ?4,
                     is_frozen = ?5, updated_at = ?6, deleted_at = ?7
                 WHERE id = ?8",
                params![
                    after.version_number,
                    after.description,
                    tags_to_text(&after.tags),
                    after.is_active,
                    after.is_frozen,
                    after.updated_at,
                    after.deleted_at,
                    id.to_string(),
                ],
            )
            .map_err(|e| {
                StorageError::from(e).describe_conflict(|| {
                    format!(
                        "version {:?} already exists for object {}",
                        after.version_number, after.object_id
                    )
                })
            })?;

            record(
                tx,
                EntityKind::Version,
                ChangeAction::Update,
                chain.scope(),
                json!({ "old": before, "new": after }),
                actor,
            )?;
            debug!("Updated version {}", id);
            Ok(after)
        })
    }

    /// Soft-deletes a Version. Its Revisions keep their own `is_active`.
    pub fn delete_version(&self, id: VersionId, actor: Option<&str>) -> StorageResult<Version> {
        Ok(self.soft_delete::<VersionChain>(id, actor)?.version)
    }

    pub fn lock_version(&self, id: VersionId, actor: Option<&str>) -> StorageResult<Version> {
        Ok(self.set_locked::<VersionChain>(id, true, actor)?.version)
    }

    pub fn unlock_version(&self, id: VersionId, actor: Option<&str>) -> StorageResult<Version> {
        Ok(self.set_locked::<VersionChain>(id, false, actor)?.version)
    }
}

fn insert_version(
    conn: &Connection,
    parent: &ObjectChain,
    version_number: String,
    description: Option<String>,
    tags: BTreeSet<String>,
    actor: Option<&str>,
) -> StorageResult<Version> {
    let now = Utc::now();
    let version = Version {
        id: VersionId::new(),
        object_id: parent.object.id,
        version_number,
        description,
        tags,
        is_active: true,
        is_locked: false,
        is_frozen: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revisions: None,
    };
    conn.execute(
        "INSERT INTO versions (id, object_id, version_number, description, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            version.id.to_string(),
            version.object_id.to_string(),
            version.version_number,
            version.description,
            tags_to_text(&version.tags),
            version.created_at,
            version.updated_at,
        ],
    )
    .map_err(|e| {
        StorageError::from(e).describe_conflict(|| {
            format!(
                "version {:?} already exists for object {}",
                version.version_number, version.object_id
            )
        })
    })?;

    let mut scope = parent.scope();
    scope.version_id = Some(version.id);
    record(
        conn,
        EntityKind::Version,
        ChangeAction::Create,
        scope,
        json!({ "new": version }),
        actor,
    )?;
    debug!(
        "Created version {} ({}) under object {}",
        version.id, version.version_number, version.object_id
    );
    Ok(version)
}

/// Versions by creation order, optionally scoped to one Object.
pub(super) fn select_versions(
    conn: &Connection,
    object_id: Option<ObjectId>,
    active_only: bool,
) -> StorageResult<Vec<Version>> {
    let sql = format!(
        "SELECT {} FROM versions v
         WHERE (?1 IS NULL OR v.object_id = ?1) AND (?2 = 0 OR v.is_active = 1)
         ORDER BY v.created_at, v.rowid",
        select_list("v", "", VERSION_COLUMNS)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![object_id.map(|id| id.to_string()), active_only],
        |row| read_version(row, ""),
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
