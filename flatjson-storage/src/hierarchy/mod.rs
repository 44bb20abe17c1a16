//! The orchestrating store for the Object → Version → Revision → Property
//! hierarchy.
//!
//! Every mutation follows the same template inside one transaction:
//! 1. load the target (or, on create, its parent) and check the lock chain
//! 2. apply the change
//! 3. append a changelog entry describing it
//! 4. commit and return the resulting entity

mod documents;
mod objects;
mod properties;
mod revisions;
mod versions;

use chrono::{DateTime, Utc};
use flatjson_model::{ChangeAction, ChangelogEntry, NewChangelogEntry};
use flatjson_types::{
    is_malformed_semantic_version, is_valid_semantic_version, ObjectId, RevisionId, VersionId,
};
use rusqlite::{params, Connection};
use serde_json::json;
use std::path::Path;
use tracing::debug;

use crate::allocator::{self, NextRevision, VersionLabels};
use crate::changelog;
use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::lock::{check_lock_hierarchy, LockChain, ObjectChain, Scope, VersionChain};

/// Behavior switches for a [`HierarchyStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Require explicit Version labels to be semantic versions.
    pub require_semver: bool,
}

/// Filters for listing operations.
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Include soft-deleted rows (and soft-deleted children).
    pub include_inactive: bool,
    /// Eager-load the immediate child collection.
    pub with_children: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_inactive: false,
            with_children: true,
        }
    }
}

impl ListOptions {
    pub(crate) fn active_only(&self) -> bool {
        !self.include_inactive
    }
}

/// Public entry point for all hierarchy operations.
#[derive(Clone)]
pub struct HierarchyStore {
    db: Database,
    config: StoreConfig,
}

impl HierarchyStore {
    pub fn new(db: Database, config: StoreConfig) -> Self {
        Self { db, config }
    }

    /// Opens (or creates) a file-backed store.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StorageResult<Self> {
        Ok(Self::new(Database::open(path)?, config))
    }

    /// Opens an in-memory store with default settings (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(Database::open_in_memory()?, StoreConfig::default()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Identifier allocation ────────────────────────────────────

    /// Candidate labels for the next Version of an Object.
    pub fn next_version_label(&self, object_id: ObjectId) -> StorageResult<VersionLabels> {
        self.db.with_connection(|conn| {
            ObjectChain::load(conn, object_id)?;
            allocator::next_version_label(conn, object_id)
        })
    }

    /// A fresh revision label plus the current active Revision count.
    pub fn next_revision_id(&self, version_id: VersionId) -> StorageResult<NextRevision> {
        self.db.with_connection(|conn| {
            VersionChain::load(conn, version_id)?;
            allocator::next_revision_id(conn, version_id)
        })
    }

    // ── Changelog ────────────────────────────────────────────────

    pub fn list_changelog(&self, limit: usize, offset: usize) -> StorageResult<Vec<ChangelogEntry>> {
        self.db.with_connection(|conn| changelog::list(conn, limit, offset))
    }

    pub fn changelog_count(&self) -> StorageResult<usize> {
        self.db.with_connection(changelog::count)
    }

    pub fn changelog_for_object(&self, id: ObjectId) -> StorageResult<Vec<ChangelogEntry>> {
        self.db.with_connection(|conn| changelog::for_object(conn, id))
    }

    pub fn changelog_for_version(&self, id: VersionId) -> StorageResult<Vec<ChangelogEntry>> {
        self.db.with_connection(|conn| changelog::for_version(conn, id))
    }

    pub fn changelog_for_revision(&self, id: RevisionId) -> StorageResult<Vec<ChangelogEntry>> {
        self.db.with_connection(|conn| changelog::for_revision(conn, id))
    }

    // ── Shared mutation steps ────────────────────────────────────

    /// Sets or clears the target's own lock flag.
    ///
    /// Locking requires every strict ancestor to be unlocked; unlocking only
    /// requires the target to exist.
    fn set_locked<C: LockChain>(
        &self,
        id: C::Id,
        locked: bool,
        actor: Option<&str>,
    ) -> StorageResult<C> {
        self.db.with_transaction(|tx| {
            let chain = C::load(tx, id)?;
            if locked {
                chain.ensure_ancestors_unlocked()?;
            }
            let previous = chain.target_locked();
            if C::TRACKS_UPDATES {
                let sql = format!(
                    "UPDATE {} SET is_locked = ?1, updated_at = ?2 WHERE id = ?3",
                    C::TABLE
                );
                tx.execute(&sql, params![locked, Utc::now(), id.to_string()])?;
            } else {
                let sql = format!("UPDATE {} SET is_locked = ?1 WHERE id = ?2", C::TABLE);
                tx.execute(&sql, params![locked, id.to_string()])?;
            }

            let action = if locked { ChangeAction::Lock } else { ChangeAction::Unlock };
            record(
                tx,
                C::KIND,
                action,
                chain.scope(),
                json!({ "id": id.to_string(), "is_locked": { "old": previous, "new": locked } }),
                actor,
            )?;
            debug!("{} {} {}", action, C::KIND, id);
            C::load(tx, id)
        })
    }

    /// Flips `is_active` off and stamps `deleted_at`. Never cascades.
    fn soft_delete<C: LockChain>(&self, id: C::Id, actor: Option<&str>) -> StorageResult<C> {
        self.db.with_transaction(|tx| {
            let chain = check_lock_hierarchy::<C>(tx, id)?;
            let sql = if C::TRACKS_UPDATES {
                format!(
                    "UPDATE {} SET is_active = 0, deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
                    C::TABLE
                )
            } else {
                format!("UPDATE {} SET is_active = 0, deleted_at = ?1 WHERE id = ?2", C::TABLE)
            };
            tx.execute(&sql, params![Utc::now(), id.to_string()])?;
            let after = C::load(tx, id)?;
            let (old, new) = (chain.snapshot()?, after.snapshot()?);
            record(
                tx,
                C::KIND,
                ChangeAction::Delete,
                chain.scope(),
                json!({ "old": old, "new": new }),
                actor,
            )?;
            debug!("Soft-deleted {} {}", C::KIND, id);
            Ok(after)
        })
    }

    fn validate_version_label(&self, label: &str) -> StorageResult<()> {
        if label.trim().is_empty() {
            return Err(StorageError::ValidationFailed(
                "version_number is required".to_string(),
            ));
        }
        let rejected = if self.config.require_semver {
            !is_valid_semantic_version(label)
        } else {
            is_malformed_semantic_version(label)
        };
        if rejected {
            return Err(StorageError::ValidationFailed(format!(
                "version_number {label:?} is not a valid semantic version"
            )));
        }
        Ok(())
    }
}

/// Appends the changelog entry for a mutation on the current transaction.
fn record(
    conn: &Connection,
    kind: flatjson_model::EntityKind,
    action: ChangeAction,
    scope: Scope,
    details: serde_json::Value,
    actor: Option<&str>,
) -> StorageResult<ChangelogEntry> {
    changelog::record(
        conn,
        NewChangelogEntry::new(kind, action)
            .scoped(scope.object_id, scope.version_id, scope.revision_id)
            .with_details(details)
            .performed_by(actor),
    )
}

/// Keeps `deleted_at` consistent with an `is_active` change made by an update.
fn settle_deleted_at(
    deleted_at: &Option<DateTime<Utc>>,
    was_active: bool,
    is_active: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (was_active, is_active) {
        (true, false) => Some(now),
        (false, true) => None,
        _ => *deleted_at,
    }
}

/// Rejects blank required text fields.
fn require_text(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::ValidationFailed(format!("{field} is required")));
    }
    Ok(())
}
