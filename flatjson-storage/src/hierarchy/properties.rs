use chrono::Utc;
use flatjson_model::{ChangeAction, EntityKind, NewProperty, Property, PropertyUpdate};
use flatjson_types::{PropertyId, PropertyValue, RevisionId};
use rusqlite::{params, Connection};
use serde_json::json;
use tracing::debug;

use super::{record, require_text, settle_deleted_at, HierarchyStore, ListOptions};
use crate::error::{StorageError, StorageResult};
use crate::lock::{check_lock_hierarchy, LockChain, PropertyChain, RevisionChain};
use crate::rows::{read_property, select_list, PROPERTY_COLUMNS};

impl HierarchyStore {
    /// Lists Properties, optionally only those of one Revision.
    pub fn list_properties(
        &self,
        revision_id: Option<RevisionId>,
        options: ListOptions,
    ) -> StorageResult<Vec<Property>> {
        self.db.with_connection(|conn| {
            if let Some(revision_id) = revision_id {
                RevisionChain::load(conn, revision_id)?;
            }
            select_properties(conn, revision_id, options.active_only())
        })
    }

    pub fn get_property(&self, id: PropertyId) -> StorageResult<Property> {
        self.db
            .with_connection(|conn| Ok(PropertyChain::load(conn, id)?.property))
    }

    pub fn create_property(
        &self,
        input: NewProperty,
        actor: Option<&str>,
    ) -> StorageResult<Property> {
        require_text("key_path", &input.key_path)?;
        self.db.with_transaction(|tx| {
            let parent = check_lock_hierarchy::<RevisionChain>(tx, input.revision_id)?;
            insert_property(tx, &parent, input, actor)
        })
    }

    /// Applies a partial update.
    ///
    /// The stored text is re-validated whenever the type or value changes.
    pub fn update_property(
        &self,
        id: PropertyId,
        changes: PropertyUpdate,
        actor: Option<&str>,
    ) -> StorageResult<Property> {
        if let Some(key_path) = &changes.key_path {
            require_text("key_path", key_path)?;
        }
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<PropertyChain>(tx, id)?;
            let before = chain.property.clone();
            let now = Utc::now();

            let mut after = before.clone();
            if changes.property_type.is_some() || changes.key_value.is_some() {
                let property_type = changes.property_type.unwrap_or(before.property_type);
                let text = changes.key_value.as_deref().unwrap_or(&before.key_value);
                let value = PropertyValue::parse(property_type, text)?;
                after.property_type = value.property_type();
                after.key_value = value.to_stored_text();
            }
            if let Some(key_path) = changes.key_path {
                after.key_path = key_path;
            }
            if let Some(status) = changes.status {
                after.status = status;
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
                "UPDATE properties
                 SET property_type = ?1, key_path = ?2, key_value = ?3, status = ?4,
                     is_active = ?5, is_frozen = ?6, updated_at = ?7, deleted_at = ?8
                 WHERE id = ?9",
                params![
                    after.property_type.as_str(),
                    after.key_path,
                    after.key_value,
                    after.status.as_str(),
                    after.is_active,
                    after.is_frozen,
                    after.updated_at,
                    after.deleted_at,
                    id.to_string(),
                ],
            )
            .map_err(|e| key_path_conflict(e, &after.key_path, after.revision_id))?;

            record(
                tx,
                EntityKind::FlatProperty,
                ChangeAction::Update,
                chain.scope(),
                json!({ "old": before, "new": after }),
                actor,
            )?;
            debug!("Updated property {} ({})", id, after.key_path);
            Ok(after)
        })
    }

    pub fn delete_property(&self, id: PropertyId, actor: Option<&str>) -> StorageResult<Property> {
        Ok(self.soft_delete::<PropertyChain>(id, actor)?.property)
    }

    /// Reactivates a soft-deleted Property.
    ///
    /// Fails with a unique violation if another active Property has taken
    /// its key path in the meantime. Restoring an active Property is a no-op.
    pub fn restore_property(&self, id: PropertyId, actor: Option<&str>) -> StorageResult<Property> {
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<PropertyChain>(tx, id)?;
            let before = chain.property.clone();
            if before.is_active {
                return Ok(before);
            }

            let mut after = before.clone();
            after.is_active = true;
            after.deleted_at = None;
            after.updated_at = Utc::now();
            tx.execute(
                "UPDATE properties SET is_active = 1, deleted_at = NULL, updated_at = ?1 WHERE id = ?2",
                params![after.updated_at, id.to_string()],
            )
            .map_err(|e| key_path_conflict(e, &after.key_path, after.revision_id))?;

            record(
                tx,
                EntityKind::FlatProperty,
                ChangeAction::Restore,
                chain.scope(),
                json!({ "old": before, "new": after }),
                actor,
            )?;
            debug!("Restored property {} ({})", id, after.key_path);
            Ok(after)
        })
    }

    pub fn lock_property(&self, id: PropertyId, actor: Option<&str>) -> StorageResult<Property> {
        Ok(self.set_locked::<PropertyChain>(id, true, actor)?.property)
    }

    pub fn unlock_property(&self, id: PropertyId, actor: Option<&str>) -> StorageResult<Property> {
        Ok(self.set_locked::<PropertyChain>(id, false, actor)?.property)
    }
}

/// Inserts one Property under an already-checked Revision chain.
pub(super) fn insert_property(
    conn: &Connection,
    parent: &RevisionChain,
    input: NewProperty,
    actor: Option<&str>,
) -> StorageResult<Property> {
    let now = Utc::now();
    let property = Property {
        id: PropertyId::new(),
        property_type: input.value.property_type(),
        key_path: input.key_path,
        key_value: input.value.to_stored_text(),
        revision_id: parent.revision.id,
        status: input.status,
        is_active: true,
        is_locked: false,
        is_frozen: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    conn.execute(
        "INSERT INTO properties
            (id, property_type, key_path, key_value, revision_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            property.id.to_string(),
            property.property_type.as_str(),
            property.key_path,
            property.key_value,
            property.revision_id.to_string(),
            property.status.as_str(),
            property.created_at,
            property.updated_at,
        ],
    )
    .map_err(|e| key_path_conflict(e, &property.key_path, property.revision_id))?;

    record(
        conn,
        EntityKind::FlatProperty,
        ChangeAction::Create,
        parent.scope(),
        json!({ "new": property }),
        actor,
    )?;
    debug!(
        "Created property {} ({}) under revision {}",
        property.id, property.key_path, property.revision_id
    );
    Ok(property)
}

fn key_path_conflict(e: rusqlite::Error, key_path: &str, revision_id: RevisionId) -> StorageError {
    StorageError::from(e).describe_conflict(|| {
        format!("key_path {key_path:?} is already active in revision {revision_id}")
    })
}

/// Properties by creation order, optionally scoped to one Revision.
pub(super) fn select_properties(
    conn: &Connection,
    revision_id: Option<RevisionId>,
    active_only: bool,
) -> StorageResult<Vec<Property>> {
    let sql = format!(
        "SELECT {} FROM properties p
         WHERE (?1 IS NULL OR p.revision_id = ?1) AND (?2 = 0 OR p.is_active = 1)
         ORDER BY p.created_at, p.rowid",
        select_list("p", "", PROPERTY_COLUMNS)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![revision_id.map(|id| id.to_string()), active_only],
        |row| read_property(row, ""),
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
