use chrono::{DateTime, Utc};
use flatjson_types::{
    ObjectId, PropertyId, PropertyType, PropertyValue, RevisionId, RevisionUuid, VersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::codec::FlatRow;

/// Root of a hierarchy branch, identified by a globally unique name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Eager-loaded children, present only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<Version>>,
}

/// A labeled lineage under an Object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub object_id: ObjectId,
    pub version_number: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Vec<Revision>>,
}

/// A snapshot under a Version. Only its flags change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub version_id: VersionId,
    pub revision_uuid: RevisionUuid,
    pub summary: Option<String>,
    pub tags: BTreeSet<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
}

/// One flattened key/value pair belonging to a Revision.
///
/// `key_value` is the stored text; [`Property::value`] reinterprets it
/// under `property_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub key_path: String,
    pub key_value: String,
    pub revision_id: RevisionId,
    pub status: PropertyStatus,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Strictly decodes the stored text.
    pub fn value(&self) -> flatjson_types::Result<PropertyValue> {
        PropertyValue::parse(self.property_type, &self.key_value)
    }

    /// The row shape consumed by [`crate::unflatten`].
    pub fn flat_row(&self) -> FlatRow {
        FlatRow {
            key_path: self.key_path.clone(),
            key_value: self.key_value.clone(),
            property_type: self.property_type,
        }
    }
}

/// Editorial status of a Property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Active,
    Draft,
    Deprecated,
}

impl PropertyStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "deprecated" => Ok(Self::Deprecated),
            other => Err(format!("unknown property status: {other}")),
        }
    }
}

// ── Inputs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewObject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVersion {
    pub object_id: ObjectId,
    pub version_number: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionUpdate {
    pub version_number: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRevision {
    pub version_id: VersionId,
    /// Explicit label; generated when absent.
    #[serde(default)]
    pub revision_uuid: Option<RevisionUuid>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevisionUpdate {
    pub summary: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub revision_id: RevisionId,
    pub key_path: String,
    pub value: PropertyValue,
    pub status: PropertyStatus,
}

impl NewProperty {
    pub fn new(revision_id: RevisionId, key_path: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            revision_id,
            key_path: key_path.into(),
            value,
            status: PropertyStatus::default(),
        }
    }

    /// Builds a property from its wire form, validating the text against the tag.
    pub fn from_text(
        revision_id: RevisionId,
        key_path: impl Into<String>,
        property_type: PropertyType,
        key_value: &str,
    ) -> flatjson_types::Result<Self> {
        let value = PropertyValue::parse(property_type, key_value)?;
        Ok(Self::new(revision_id, key_path, value))
    }

    pub fn with_status(mut self, status: PropertyStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a Property.
///
/// When only one of `property_type` / `key_value` is supplied the other is
/// taken from the stored row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyUpdate {
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub key_path: Option<String>,
    pub key_value: Option<String>,
    pub status: Option<PropertyStatus>,
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
}
