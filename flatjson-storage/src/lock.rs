//! Lock hierarchy checking.
//!
//! A level may be mutated only while it and every ancestor up to the Object
//! has `is_locked = false`. `is_active` plays no part here: a soft-deleted
//! ancestor does not block its descendants.
//!
//! Each [`LockChain`] loads its target together with all ancestors in a
//! single join, so callers get the entities back without a second fetch.

use flatjson_model::{EntityKind, Object, Property, Revision, Version};
use flatjson_types::{ObjectId, PropertyId, RevisionId, VersionId};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;

use crate::error::{StorageError, StorageResult};
use crate::rows::{
    read_object, read_property, read_revision, read_version, select_list, OBJECT_COLUMNS,
    PROPERTY_COLUMNS, REVISION_COLUMNS, VERSION_COLUMNS,
};

/// Lock state of one level in a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub kind: EntityKind,
    pub id: String,
    pub is_locked: bool,
}

impl Level {
    fn new(kind: EntityKind, id: impl ToString, is_locked: bool) -> Self {
        Self {
            kind,
            id: id.to_string(),
            is_locked,
        }
    }
}

/// The ancestor ids a changelog entry is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub object_id: Option<ObjectId>,
    pub version_id: Option<VersionId>,
    pub revision_id: Option<RevisionId>,
}

/// An entity loaded with its full ancestor chain.
pub trait LockChain: Sized {
    type Id: Copy + fmt::Display;

    /// The level this chain targets.
    const KIND: EntityKind;
    /// Table holding the target rows.
    const TABLE: &'static str;
    /// Whether the target table has an `updated_at` column.
    const TRACKS_UPDATES: bool = true;

    /// Loads the target and its ancestors, failing with `NotFound` if absent.
    fn load(conn: &Connection, id: Self::Id) -> StorageResult<Self>;

    /// Levels ordered from the Object down to the target.
    fn levels(&self) -> Vec<Level>;

    fn scope(&self) -> Scope;

    /// The target entity as recorded in changelog details.
    fn snapshot(&self) -> StorageResult<serde_json::Value>;

    /// Whether the target level itself is locked.
    fn target_locked(&self) -> bool {
        self.levels().last().is_some_and(|l| l.is_locked)
    }

    /// Fails with `Locked` if the target or any ancestor is locked.
    fn ensure_unlocked(&self) -> StorageResult<()> {
        first_locked(&self.levels())
    }

    /// Fails with `Locked` if any strict ancestor is locked.
    fn ensure_ancestors_unlocked(&self) -> StorageResult<()> {
        match self.levels().split_last() {
            Some((_, ancestors)) => first_locked(ancestors),
            None => Ok(()),
        }
    }
}

/// Reports the outermost locked level.
fn first_locked(levels: &[Level]) -> StorageResult<()> {
    match levels.iter().find(|l| l.is_locked) {
        Some(level) => Err(StorageError::locked(level.kind, &level.id)),
        None => Ok(()),
    }
}

/// Loads a chain and verifies nothing in it is locked.
///
/// Must succeed before any mutation of the chain's target.
pub fn check_lock_hierarchy<C: LockChain>(conn: &Connection, id: C::Id) -> StorageResult<C> {
    let chain = C::load(conn, id)?;
    chain.ensure_unlocked()?;
    Ok(chain)
}

// ── Chains ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObjectChain {
    pub object: Object,
}

#[derive(Debug, Clone)]
pub struct VersionChain {
    pub object: Object,
    pub version: Version,
}

#[derive(Debug, Clone)]
pub struct RevisionChain {
    pub object: Object,
    pub version: Version,
    pub revision: Revision,
}

#[derive(Debug, Clone)]
pub struct PropertyChain {
    pub object: Object,
    pub version: Version,
    pub revision: Revision,
    pub property: Property,
}

impl LockChain for ObjectChain {
    type Id = ObjectId;
    const KIND: EntityKind = EntityKind::Object;
    const TABLE: &'static str = "objects";

    fn load(conn: &Connection, id: ObjectId) -> StorageResult<Self> {
        let sql = format!(
            "SELECT {} FROM objects o WHERE o.id = ?1",
            select_list("o", "o_", OBJECT_COLUMNS)
        );
        conn.query_row(&sql, params![id.to_string()], |row| {
            Ok(Self {
                object: read_object(row, "o_")?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::not_found(Self::KIND, id))
    }

    fn levels(&self) -> Vec<Level> {
        vec![Level::new(EntityKind::Object, self.object.id, self.object.is_locked)]
    }

    fn scope(&self) -> Scope {
        Scope {
            object_id: Some(self.object.id),
            ..Scope::default()
        }
    }

    fn snapshot(&self) -> StorageResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.object)?)
    }
}

impl LockChain for VersionChain {
    type Id = VersionId;
    const KIND: EntityKind = EntityKind::Version;
    const TABLE: &'static str = "versions";

    fn load(conn: &Connection, id: VersionId) -> StorageResult<Self> {
        let sql = format!(
            "SELECT {}, {} FROM versions v
             JOIN objects o ON o.id = v.object_id
             WHERE v.id = ?1",
            select_list("v", "v_", VERSION_COLUMNS),
            select_list("o", "o_", OBJECT_COLUMNS),
        );
        conn.query_row(&sql, params![id.to_string()], |row| {
            Ok(Self {
                object: read_object(row, "o_")?,
                version: read_version(row, "v_")?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::not_found(Self::KIND, id))
    }

    fn levels(&self) -> Vec<Level> {
        vec![
            Level::new(EntityKind::Object, self.object.id, self.object.is_locked),
            Level::new(EntityKind::Version, self.version.id, self.version.is_locked),
        ]
    }

    fn scope(&self) -> Scope {
        Scope {
            object_id: Some(self.object.id),
            version_id: Some(self.version.id),
            revision_id: None,
        }
    }

    fn snapshot(&self) -> StorageResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.version)?)
    }
}

impl LockChain for RevisionChain {
    type Id = RevisionId;
    const KIND: EntityKind = EntityKind::Revision;
    const TABLE: &'static str = "revisions";
    const TRACKS_UPDATES: bool = false;

    fn load(conn: &Connection, id: RevisionId) -> StorageResult<Self> {
        let sql = format!(
            "SELECT {}, {}, {} FROM revisions r
             JOIN versions v ON v.id = r.version_id
             JOIN objects o ON o.id = v.object_id
             WHERE r.id = ?1",
            select_list("r", "r_", REVISION_COLUMNS),
            select_list("v", "v_", VERSION_COLUMNS),
            select_list("o", "o_", OBJECT_COLUMNS),
        );
        conn.query_row(&sql, params![id.to_string()], |row| {
            Ok(Self {
                object: read_object(row, "o_")?,
                version: read_version(row, "v_")?,
                revision: read_revision(row, "r_")?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::not_found(Self::KIND, id))
    }

    fn levels(&self) -> Vec<Level> {
        vec![
            Level::new(EntityKind::Object, self.object.id, self.object.is_locked),
            Level::new(EntityKind::Version, self.version.id, self.version.is_locked),
            Level::new(EntityKind::Revision, self.revision.id, self.revision.is_locked),
        ]
    }

    fn scope(&self) -> Scope {
        Scope {
            object_id: Some(self.object.id),
            version_id: Some(self.version.id),
            revision_id: Some(self.revision.id),
        }
    }

    fn snapshot(&self) -> StorageResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.revision)?)
    }
}

impl LockChain for PropertyChain {
    type Id = PropertyId;
    const KIND: EntityKind = EntityKind::FlatProperty;
    const TABLE: &'static str = "properties";

    fn load(conn: &Connection, id: PropertyId) -> StorageResult<Self> {
        let sql = format!(
            "SELECT {}, {}, {}, {} FROM properties p
             JOIN revisions r ON r.id = p.revision_id
             JOIN versions v ON v.id = r.version_id
             JOIN objects o ON o.id = v.object_id
             WHERE p.id = ?1",
            select_list("p", "p_", PROPERTY_COLUMNS),
            select_list("r", "r_", REVISION_COLUMNS),
            select_list("v", "v_", VERSION_COLUMNS),
            select_list("o", "o_", OBJECT_COLUMNS),
        );
        conn.query_row(&sql, params![id.to_string()], |row| {
            Ok(Self {
                object: read_object(row, "o_")?,
                version: read_version(row, "v_")?,
                revision: read_revision(row, "r_")?,
                property: read_property(row, "p_")?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::not_found(Self::KIND, id))
    }

    fn levels(&self) -> Vec<Level> {
        vec![
            Level::new(EntityKind::Object, self.object.id, self.object.is_locked),
            Level::new(EntityKind::Version, self.version.id, self.version.is_locked),
            Level::new(EntityKind::Revision, self.revision.id, self.revision.is_locked),
            Level::new(EntityKind::FlatProperty, self.property.id, self.property.is_locked),
        ]
    }

    fn scope(&self) -> Scope {
        Scope {
            object_id: Some(self.object.id),
            version_id: Some(self.version.id),
            revision_id: Some(self.revision.id),
        }
    }

    fn snapshot(&self) -> StorageResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.property)?)
    }
}
