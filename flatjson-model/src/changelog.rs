use chrono::{DateTime, Utc};
use flatjson_types::{ChangelogId, ObjectId, RevisionId, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The hierarchy level a changelog entry (or error) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Object,
    Version,
    Revision,
    FlatProperty,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Version => "version",
            Self::Revision => "revision",
            Self::FlatProperty => "flat_property",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "version" => Ok(Self::Version),
            "revision" => Ok(Self::Revision),
            "flat_property" => Ok(Self::FlatProperty),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    Restore,
    Lock,
    Unlock,
}

impl ChangeAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "restore" => Ok(Self::Restore),
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            other => Err(format!("unknown changelog action: {other}")),
        }
    }
}

/// An immutable audit record. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: ChangelogId,
    pub object_id: Option<ObjectId>,
    pub version_id: Option<VersionId>,
    pub revision_id: Option<RevisionId>,
    pub entity_type: EntityKind,
    pub action: ChangeAction,
    pub details: serde_json::Value,
    pub tags: BTreeSet<String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// Input to the changelog recorder.
#[derive(Debug, Clone)]
pub struct NewChangelogEntry {
    pub object_id: Option<ObjectId>,
    pub version_id: Option<VersionId>,
    pub revision_id: Option<RevisionId>,
    pub entity_type: EntityKind,
    pub action: ChangeAction,
    pub details: Option<serde_json::Value>,
    pub tags: BTreeSet<String>,
    /// Defaults to `"system"` when absent.
    pub performed_by: Option<String>,
}

impl NewChangelogEntry {
    pub fn new(entity_type: EntityKind, action: ChangeAction) -> Self {
        Self {
            object_id: None,
            version_id: None,
            revision_id: None,
            entity_type,
            action,
            details: None,
            tags: BTreeSet::new(),
            performed_by: None,
        }
    }

    /// Scopes the entry to the ancestor chain it occurred under.
    pub fn scoped(
        mut self,
        object_id: Option<ObjectId>,
        version_id: Option<VersionId>,
        revision_id: Option<RevisionId>,
    ) -> Self {
        self.object_id = object_id;
        self.version_id = version_id;
        self.revision_id = revision_id;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn performed_by(mut self, actor: Option<&str>) -> Self {
        self.performed_by = actor.map(str::to_string);
        self
    }
}
