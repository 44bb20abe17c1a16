//! Column lists and row decoding shared by every query.
//!
//! Readers take a column prefix so the same decoder serves both plain
//! single-table selects (prefix `""`) and the aliased joins used to load an
//! ancestor chain in one query (prefix `"o_"`, `"v_"`, ...).

use flatjson_model::{ChangelogEntry, Object, Property, Revision, Version};
use rusqlite::types::Type;
use rusqlite::Row;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub(crate) const OBJECT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "is_active",
    "is_locked",
    "is_frozen",
    "created_at",
    "updated_at",
    "deleted_at",
];

pub(crate) const VERSION_COLUMNS: &[&str] = &[
    "id",
    "object_id",
    "version_number",
    "description",
    "tags",
    "is_active",
    "is_locked",
    "is_frozen",
    "created_at",
    "updated_at",
    "deleted_at",
];

pub(crate) const REVISION_COLUMNS: &[&str] = &[
    "id",
    "version_id",
    "revision_uuid",
    "summary",
    "tags",
    "is_active",
    "is_locked",
    "is_frozen",
    "created_at",
    "deleted_at",
];

pub(crate) const PROPERTY_COLUMNS: &[&str] = &[
    "id",
    "property_type",
    "key_path",
    "key_value",
    "revision_id",
    "status",
    "is_active",
    "is_locked",
    "is_frozen",
    "created_at",
    "updated_at",
    "deleted_at",
];

pub(crate) const CHANGELOG_COLUMNS: &[&str] = &[
    "id",
    "object_id",
    "version_id",
    "revision_id",
    "entity_type",
    "action",
    "details",
    "tags",
    "performed_by",
    "performed_at",
];

/// Renders `alias.col AS prefixcol, ...` for a select list.
pub(crate) fn select_list(alias: &str, prefix: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{alias}.{c} AS {prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn read_object(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Object> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Object {
        id: parse_text(row, &col("id"))?,
        name: row.get(col("name").as_str())?,
        description: row.get(col("description").as_str())?,
        is_active: row.get(col("is_active").as_str())?,
        is_locked: row.get(col("is_locked").as_str())?,
        is_frozen: row.get(col("is_frozen").as_str())?,
        created_at: row.get(col("created_at").as_str())?,
        updated_at: row.get(col("updated_at").as_str())?,
        deleted_at: row.get(col("deleted_at").as_str())?,
        versions: None,
    })
}

pub(crate) fn read_version(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Version> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Version {
        id: parse_text(row, &col("id"))?,
        object_id: parse_text(row, &col("object_id"))?,
        version_number: row.get(col("version_number").as_str())?,
        description: row.get(col("description").as_str())?,
        tags: read_tags(row, &col("tags"))?,
        is_active: row.get(col("is_active").as_str())?,
        is_locked: row.get(col("is_locked").as_str())?,
        is_frozen: row.get(col("is_frozen").as_str())?,
        created_at: row.get(col("created_at").as_str())?,
        updated_at: row.get(col("updated_at").as_str())?,
        deleted_at: row.get(col("deleted_at").as_str())?,
        revisions: None,
    })
}

pub(crate) fn read_revision(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Revision> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Revision {
        id: parse_text(row, &col("id"))?,
        version_id: parse_text(row, &col("version_id"))?,
        revision_uuid: parse_text(row, &col("revision_uuid"))?,
        summary: row.get(col("summary").as_str())?,
        tags: read_tags(row, &col("tags"))?,
        is_active: row.get(col("is_active").as_str())?,
        is_locked: row.get(col("is_locked").as_str())?,
        is_frozen: row.get(col("is_frozen").as_str())?,
        created_at: row.get(col("created_at").as_str())?,
        deleted_at: row.get(col("deleted_at").as_str())?,
        properties: None,
    })
}

pub(crate) fn read_property(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Property> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Property {
        id: parse_text(row, &col("id"))?,
        property_type: parse_text(row, &col("property_type"))?,
        key_path: row.get(col("key_path").as_str())?,
        key_value: row.get(col("key_value").as_str())?,
        revision_id: parse_text(row, &col("revision_id"))?,
        status: parse_text(row, &col("status"))?,
        is_active: row.get(col("is_active").as_str())?,
        is_locked: row.get(col("is_locked").as_str())?,
        is_frozen: row.get(col("is_frozen").as_str())?,
        created_at: row.get(col("created_at").as_str())?,
        updated_at: row.get(col("updated_at").as_str())?,
        deleted_at: row.get(col("deleted_at").as_str())?,
    })
}

pub(crate) fn read_changelog(row: &Row<'_>) -> rusqlite::Result<ChangelogEntry> {
    Ok(ChangelogEntry {
        id: parse_text(row, "id")?,
        object_id: parse_optional_text(row, "object_id")?,
        version_id: parse_optional_text(row, "version_id")?,
        revision_id: parse_optional_text(row, "revision_id")?,
        entity_type: parse_text(row, "entity_type")?,
        action: parse_text(row, "action")?,
        details: read_json(row, "details")?,
        tags: read_tags(row, "tags")?,
        performed_by: row.get("performed_by")?,
        performed_at: row.get("performed_at")?,
    })
}

/// Serializes a tag set for the `tags` column.
pub(crate) fn tags_to_text(tags: &BTreeSet<String>) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn read_tags(row: &Row<'_>, column: &str) -> rusqlite::Result<BTreeSet<String>> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(row, column, &raw, e))
}

fn read_json(row: &Row<'_>, column: &str) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(row, column, &raw, e))
}

fn parse_text<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e| conversion_error(row, column, &raw, e))
}

fn parse_optional_text<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| raw.parse().map_err(|e| conversion_error(row, column, &raw, e)))
        .transpose()
}

fn conversion_error(
    row: &Row<'_>,
    column: &str,
    raw: &str,
    e: impl fmt::Display,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        format!("invalid {column} {raw:?}: {e}").into(),
    )
}
