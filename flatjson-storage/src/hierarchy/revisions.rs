use chrono::Utc;
use flatjson_model::{ChangeAction, EntityKind, NewRevision, Revision, RevisionUpdate};
use flatjson_types::{RevisionId, RevisionUuid, VersionId};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

use super::{properties, record, settle_deleted_at, HierarchyStore, ListOptions};
use crate::allocator;
use crate::error::{StorageError, StorageResult};
use crate::lock::{check_lock_hierarchy, LockChain, RevisionChain, VersionChain};
use crate::rows::{read_revision, select_list, tags_to_text, REVISION_COLUMNS};

impl HierarchyStore {
    /// Lists Revisions, optionally only those of one Version.
    pub fn list_revisions(
        &self,
        version_id: Option<VersionId>,
        options: ListOptions,
    ) -> StorageResult<Vec<Revision>> {
        self.db.with_connection(|conn| {
            if let Some(version_id) = version_id {
                VersionChain::load(conn, version_id)?;
            }
            let mut revisions = select_revisions(conn, version_id, options.active_only())?;
            if options.with_children {
                for revision in &mut revisions {
                    revision.properties = Some(properties::select_properties(
                        conn,
                        Some(revision.id),
                        options.active_only(),
                    )?);
                }
            }
            Ok(revisions)
        })
    }

    /// Loads one Revision with its active Properties.
    pub fn get_revision(&self, id: RevisionId) -> StorageResult<Revision> {
        self.db.with_connection(|conn| {
            let mut revision = RevisionChain::load(conn, id)?.revision;
            revision.properties = Some(properties::select_properties(conn, Some(id), true)?);
            Ok(revision)
        })
    }

    /// Creates a Revision, generating its label unless one is supplied.
    pub fn create_revision(
        &self,
        input: NewRevision,
        actor: Option<&str>,
    ) -> StorageResult<Revision> {
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<VersionChain>(tx, input.version_id)?;
            let label = input.revision_uuid.unwrap_or_default();
            insert_revision(tx, &parent, label, input.summary, input.tags, actor)
        })
    }

    /// Creates the next Revision of a Version with a freshly allocated label.
    pub fn increment_revision(
        &self,
        version_id: VersionId,
        actor: Option<&str>,
    ) -> StorageResult<Revision> {
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<VersionChain>(tx, version_id)?;
            let next = allocator::next_revision_id(tx, version_id)?;
            debug!(
                "Allocated revision {} for version {} ({} active)",
                next.next_revision, version_id, next.current_count
            );
            insert_revision(tx, &parent, next.next_revision, None, BTreeSet::new(), actor)
        })
    }

    /// Updates a Revision's summary, tags and flags. Its label is fixed.
    pub fn update_revision(
        &self,
        id: RevisionId,
        changes: RevisionUpdate,
        actor: Option<&str>,
    ) -> StorageResult<Revision> {
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<RevisionChain>(tx, id)?;
            let before = chain.revision.clone();

            let mut after = before.clone();
            if changes.summary.is_some() {
                after.summary = changes.summary;
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
            after.deleted_at =
                settle_deleted_at(&before.deleted_at, before.is_active, after.is_active, Utc::now());

            tx.execute(
                "UPDATE revisions
                 SET summary = ?1, tags = ?2, is_active = ?3, is_frozen = ?4, deleted_at = ?5
                 WHERE id = ?6",
                params![
                    after.summary,
                    tags_to_text(&after.tags),
                    after.is_active,
                    after.is_frozen,
                    after.deleted_at,
                    id.to_string(),
                ],
            )?;

            record(
                tx,
                EntityKind::Revision,
                ChangeAction::Update,
                chain.scope(),
                json!({ "old": before, "new": after }),
                actor,
            )?;
            debug!("Updated revision {}", id);
            Ok(after)
        })
    }

    /// Soft-deletes a Revision. Its Properties keep their own `is_active`.
    pub fn delete_revision(&self, id: RevisionId, actor: Option<&str>) -> StorageResult<Revision> {
        Ok(self.soft_delete::<RevisionChain>(id, actor)?.revision)
    }

    pub fn lock_revision(&self, id: RevisionId, actor: Option<&str>) -> StorageResult<Revision> {
        Ok(self.set_locked::<RevisionChain>(id, true, actor)?.revision)
    }

    pub fn unlock_revision(&self, id: RevisionId, actor: Option<&str>) -> StorageResult<Revision> {
        Ok(self.set_locked::<RevisionChain>(id, false, actor)?.revision)
    }
}

fn insert_revision(
    conn: &Connection,
    parent: &VersionChain,
    revision_uuid: RevisionUuid,
    summary: Option<String>,
    tags: BTreeSet<String>,
    actor: Option<&str>,
) -> StorageResult<Revision> {
    let revision = Revision {
        id: RevisionId::new(),
        version_id: parent.version.id,
        revision_uuid,
        summary,
        tags,
        is_active: true,
        is_locked: false,
        is_frozen: false,
        created_at: Utc::now(),
        deleted_at: None,
        properties: None,
    };
    conn.execute(
        "INSERT INTO revisions (id, version_id, revision_uuid, summary, tags, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            revision.id.to_string(),
            revision.version_id.to_string(),
            revision.revision_uuid.to_string(),
            revision.summary,
            tags_to_text(&revision.tags),
            revision.created_at,
        ],
    )
    .map_err(|e| {
        StorageError::from(e).describe_conflict(|| {
            format!("revision_uuid {} already exists", revision.revision_uuid)
        })
    })?;

    let mut scope = parent.scope();
    scope.revision_id = Some(revision.id);
    record(
        conn,
        EntityKind::Revision,
        ChangeAction::Create,
        scope,
        json!({ "new": revision }),
        actor,
    )?;
    debug!(
        "Created revision {} ({}) under version {}",
        revision.id, revision.revision_uuid, revision.version_id
    );
    Ok(revision)
}

/// Revisions by creation order, optionally scoped to one Version.
pub(super) fn select_revisions(
    conn: &Connection,
    version_id: Option<VersionId>,
    active_only: bool,
) -> StorageResult<Vec<Revision>> {
    let sql = format!(
        "SELECT {} FROM revisions r
         WHERE (?1 IS NULL OR r.version_id = ?1) AND (?2 = 0 OR r.is_active = 1)
         ORDER BY r.created_at, r.rowid",
        select_list("r", "", REVISION_COLUMNS)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![version_id.map(|id| id.to_string()), active_only],
        |row| read_revision(row, ""),
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
