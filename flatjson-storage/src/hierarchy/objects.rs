use chrono::Utc;
use flatjson_model::{ChangeAction, EntityKind, NewObject, Object, ObjectUpdate};
use flatjson_types::ObjectId;
use rusqlite::{params, Connection};
use serde_json::json;
use tracing::debug;

use super::{record, require_text, settle_deleted_at, versions, HierarchyStore, ListOptions};
use crate::error::{StorageError, StorageResult};
use crate::lock::{check_lock_hierarchy, LockChain, ObjectChain, Scope};
use crate::rows::{read_object, select_list, OBJECT_COLUMNS};

impl HierarchyStore {
    /// Lists Objects by creation order, optionally with their Versions.
    pub fn list_objects(&self, options: ListOptions) -> StorageResult<Vec<Object>> {
        self.db.with_connection(|conn| {
            let mut objects = select_objects(conn, options.active_only())?;
            if options.with_children {
                for object in &mut objects {
                    object.versions =
                        Some(versions::select_versions(conn, Some(object.id), options.active_only())?);
                }
            }
            Ok(objects)
        })
    }

    /// Loads one Object with its active Versions, each with active Revisions.
    pub fn get_object(&self, id: ObjectId) -> StorageResult<Object> {
        self.db.with_connection(|conn| {
            let mut object = ObjectChain::load(conn, id)?.object;
            let mut children = versions::select_versions(conn, Some(id), true)?;
            for version in &mut children {
                version.revisions = Some(super::revisions::select_revisions(
                    conn,
                    Some(version.id),
                    true,
                )?);
            }
            object.versions = Some(children);
            Ok(object)
        })
    }

    pub fn create_object(&self, input: NewObject, actor: Option<&str>) -> StorageResult<Object> {
        require_text("name", &input.name)?;
        self.db.with_transaction(|tx| {
            let now = Utc::now();
            let object = Object {
                id: ObjectId::new(),
                name: input.name,
                description: input.description,
                is_active: true,
                is_locked: false,
                is_frozen: false,
                created_at: now,
                updated_at: now,
                deleted_at: None,
                versions: None,
            };
            tx.execute(
                "INSERT INTO objects (id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    object.id.to_string(),
                    object.name,
                    object.description,
                    object.created_at,
                    object.updated_at,
                ],
            )
            .map_err(|e| {
                StorageError::from(e)
                    .describe_conflict(|| format!("object name {:?} already exists", object.name))
            })?;

            record(
                tx,
                EntityKind::Object,
                ChangeAction::Create,
                Scope {
                    object_id: Some(object.id),
                    ..Scope::default()
                },
                json!({ "new": object }),
                actor,
            )?;
            debug!("Created object {} ({})", object.id, object.name);
            Ok(object)
        })
    }

    pub fn update_object(
        &self,
        id: ObjectId,
        changes: ObjectUpdate,
        actor: Option<&str>,
    ) -> StorageResult<Object> {
        if let Some(name) = &changes.name {
            require_text("name", name)?;
        }
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<ObjectChain>(tx, id)?;
            let before = chain.object.clone();
            let now = Utc::now();

            let mut after = before.clone();
            if let Some(name) = changes.name {
                after.name = name;
            }
            if changes.description.is_some() {
                after.description = changes.description;
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
                "UPDATE objects
                 SET name = ?1, description = ?2, is_active = ?3, is_frozen = ?4,
                     updated_at = ?5, deleted_at = ?6
                 WHERE id = ?7",
                params![
                    after.name,
                    after.description,
                    after.is_active,
                    after.is_frozen,
                    after.updated_at,
                    after.deleted_at,
                    id.to_string(),
                ],
            )
            .map_err(|e| {
                StorageError::from(e)
                    .describe_conflict(|| format!("object name {:?} already exists", after.name))
            })?;

            record(
                tx,
                EntityKind::Object,
                ChangeAction::Update,
                chain.scope(),
                json!({ "old": before, "new": after }),
                actor,
            )?;
            debug!("Updated object {}", id);
            Ok(after)
        })
    }

    /// Soft-deletes an Object. Its Versions are left as they are.
    pub fn delete_object(&self, id: ObjectId, actor: Option<&str>) -> StorageResult<Object> {
        Ok(self.soft_delete::<ObjectChain>(id, actor)?.object)
    }

    pub fn lock_object(&self, id: ObjectId, actor: Option<&str>) -> StorageResult<Object> {
        Ok(self.set_locked::<ObjectChain>(id, true, actor)?.object)
    }

    pub fn unlock_object(&self, id: ObjectId, actor: Option<&str>) -> StorageResult<Object> {
        Ok(self.set_locked::<ObjectChain>(id, false, actor)?.object)
    }
}

fn select_objects(conn: &Connection, active_only: bool) -> StorageResult<Vec<Object>> {
    let sql = format!(
        "SELECT {} FROM objects o WHERE (?1 = 0 OR o.is_active = 1)
         ORDER BY o.created_at, o.rowid",
        select_list("o", "", OBJECT_COLUMNS)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![active_only], |row| read_object(row, ""))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
