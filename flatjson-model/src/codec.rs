//! Conversion between nested JSON documents and flattened property rows.
//!
//! Paths are `.`-joined object keys; array elements use their index as the
//! segment (`tags.0`, `tags.1`). Empty objects and arrays are kept as a
//! single leaf so they survive a round trip.
//!
//! Unflattening is best-effort: a row whose text cannot be read under its
//! type tag is logged and kept as a raw string rather than failing the
//! whole document.

use flatjson_types::{PropertyType, PropertyValue};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// A stored property row as consumed by [`unflatten`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub key_path: String,
    pub key_value: String,
    pub property_type: PropertyType,
}

impl FlatRow {
    pub fn new(
        key_path: impl Into<String>,
        property_type: PropertyType,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            key_path: key_path.into(),
            key_value: key_value.into(),
            property_type,
        }
    }
}

/// A typed leaf produced by [`flatten`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub key_path: String,
    pub value: PropertyValue,
}

impl FlatEntry {
    /// The row this entry is persisted as.
    pub fn to_row(&self) -> FlatRow {
        FlatRow {
            key_path: self.key_path.clone(),
            key_value: self.value.to_stored_text(),
            property_type: self.value.property_type(),
        }
    }
}

/// Errors raised while flattening a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Only objects have key paths; scalars and arrays cannot be a root.
    #[error("document root must be a JSON object, got {0}")]
    RootNotObject(&'static str),
}

/// Flattens a JSON object into one entry per leaf.
pub fn flatten(document: &Value) -> Result<Vec<FlatEntry>, CodecError> {
    let Value::Object(root) = document else {
        return Err(CodecError::RootNotObject(json_kind(document)));
    };
    let mut entries = Vec::new();
    for (key, value) in root {
        flatten_into(key.clone(), value, &mut entries);
    }
    Ok(entries)
}

fn flatten_into(path: String, value: &Value, out: &mut Vec<FlatEntry>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{path}.{key}"), child, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(format!("{path}.{index}"), child, out);
            }
        }
        leaf => out.push(FlatEntry {
            key_path: path,
            value: PropertyValue::from_json(leaf),
        }),
    }
}

/// Rebuilds a nested document from property rows.
///
/// Rows are applied in order. Containers merge with containers; a container
/// always wins over a scalar at the same path, otherwise the later row wins.
/// Objects whose keys are exactly `0..n` come back as arrays.
pub fn unflatten<'a, I>(rows: I) -> Value
where
    I: IntoIterator<Item = &'a FlatRow>,
{
    let mut root = Map::new();
    for row in rows {
        let value = coerce_row(row);
        insert_path(&mut root, &row.key_path, value);
    }
    let mut document = Value::Object(root);
    densify_arrays(&mut document);
    document
}

fn coerce_row(row: &FlatRow) -> Value {
    match PropertyValue::coerce(row.property_type, &row.key_value) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                key_path = %row.key_path,
                property_type = %row.property_type,
                "Keeping raw text for unreadable property value: {}",
                e
            );
            Value::String(row.key_value.clone())
        }
    }
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            match current.get_mut(segment) {
                Some(slot) => merge_value(slot, value),
                None => {
                    current.insert(segment.to_string(), value);
                }
            }
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            let previous = std::mem::take(slot);
            *slot = Value::Object(into_index_map(previous));
        }
        let Some(map) = slot.as_object_mut() else {
            return;
        };
        current = map;
    }
}

fn merge_value(slot: &mut Value, incoming: Value) {
    match (is_container(slot), is_container(&incoming)) {
        (true, false) => {}
        (false, _) => *slot = incoming,
        (true, true) => {
            if !slot.is_object() {
                let previous = std::mem::take(slot);
                *slot = Value::Object(into_index_map(previous));
            }
            if let Value::Object(existing) = slot {
                for (key, child) in into_index_map(incoming) {
                    match existing.get_mut(&key) {
                        Some(target) => merge_value(target, child),
                        None => {
                            existing.insert(key, child);
                        }
                    }
                }
            }
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Objects pass through, arrays become index-keyed maps, scalars are dropped.
fn into_index_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Map::new(),
    }
}

fn densify_arrays(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                densify_arrays(child);
            }
            if is_dense_index_map(map) {
                let mut map = std::mem::take(map);
                let items = (0..map.len())
                    .filter_map(|index| map.remove(&index.to_string()))
                    .collect();
                *value = Value::Array(items);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(densify_arrays),
        _ => {}
    }
}

fn is_dense_index_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && (0..map.len()).all(|index| map.contains_key(&index.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
