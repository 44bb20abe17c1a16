use flatjson_model::{flatten, unflatten, CodecError, FlatEntry, FlatRow};
use flatjson_types::{PropertyType, PropertyValue};
use pretty_assertions::assert_eq;
use serde_json::json;

fn rows(entries: &[FlatEntry]) -> Vec<FlatRow> {
    entries.iter().map(FlatEntry::to_row).collect()
}

// ── unflatten ────────────────────────────────────────────────────

#[test]
fn unflatten_single_number() {
    let rows = vec![FlatRow::new("price", PropertyType::Number, "9.99")];
    assert_eq!(unflatten(&rows), json!({"price": 9.99}));
}

#[test]
fn unflatten_nested_paths() {
    let rows = vec![
        FlatRow::new("user.preferences.theme", PropertyType::String, "dark"),
        FlatRow::new("user.preferences.font_size", PropertyType::Number, "14"),
        FlatRow::new("user.active", PropertyType::Boolean, "true"),
        FlatRow::new("user.nickname", PropertyType::Null, ""),
    ];
    assert_eq!(
        unflatten(&rows),
        json!({
            "user": {
                "preferences": {"theme": "dark", "font_size": 14},
                "active": true,
                "nickname": null
            }
        })
    );
}

#[test]
fn unflatten_numeric_segments_become_arrays() {
    let rows = vec![
        FlatRow::new("tags.0", PropertyType::String, "a"),
        FlatRow::new("tags.1", PropertyType::String, "b"),
        FlatRow::new("matrix.0.0", PropertyType::Number, "1"),
        FlatRow::new("matrix.0.1", PropertyType::Number, "2"),
    ];
    assert_eq!(
        unflatten(&rows),
        json!({"tags": ["a", "b"], "matrix": [[1, 2]]})
    );
}

#[test]
fn unflatten_sparse_indices_stay_objects() {
    let rows = vec![
        FlatRow::new("slots.0", PropertyType::String, "a"),
        FlatRow::new("slots.2", PropertyType::String, "c"),
    ];
    assert_eq!(unflatten(&rows), json!({"slots": {"0": "a", "2": "c"}}));
}

#[test]
fn unflatten_object_and_array_rows_parse_json() {
    let rows = vec![
        FlatRow::new("meta", PropertyType::Object, r#"{"a":1}"#),
        FlatRow::new("list", PropertyType::Array, "[1,2,3]"),
    ];
    assert_eq!(unflatten(&rows), json!({"meta": {"a": 1}, "list": [1, 2, 3]}));
}

#[test]
fn unflatten_custom_is_kept_as_text() {
    let rows = vec![FlatRow::new("color", PropertyType::Custom, "#ff0000")];
    assert_eq!(unflatten(&rows), json!({"color": "#ff0000"}));
}

#[test]
fn unflatten_malformed_rows_fall_back_to_raw_text() {
    let rows = vec![
        FlatRow::new("price", PropertyType::Number, "cheap"),
        FlatRow::new("meta", PropertyType::Object, "{broken"),
        FlatRow::new("ok", PropertyType::Number, "1"),
    ];
    assert_eq!(
        unflatten(&rows),
        json!({"price": "cheap", "meta": "{broken", "ok": 1})
    );
}

#[test]
fn unflatten_later_scalar_overwrites_scalar() {
    let rows = vec![
        FlatRow::new("a", PropertyType::Number, "1"),
        FlatRow::new("a", PropertyType::Number, "2"),
    ];
    assert_eq!(unflatten(&rows), json!({"a": 2}));
}

#[test]
fn unflatten_deeper_rows_are_never_dropped() {
    let scalar_first = vec![
        FlatRow::new("a", PropertyType::Number, "1"),
        FlatRow::new("a.b", PropertyType::Number, "2"),
    ];
    let scalar_last = vec![
        FlatRow::new("a.b", PropertyType::Number, "2"),
        FlatRow::new("a", PropertyType::Number, "1"),
    ];
    assert_eq!(unflatten(&scalar_first), json!({"a": {"b": 2}}));
    assert_eq!(unflatten(&scalar_last), json!({"a": {"b": 2}}));
}

#[test]
fn unflatten_merges_object_rows_with_paths() {
    let rows = vec![
        FlatRow::new("cfg.x", PropertyType::Number, "1"),
        FlatRow::new("cfg", PropertyType::Object, r#"{"y":2}"#),
    ];
    assert_eq!(unflatten(&rows), json!({"cfg": {"x": 1, "y": 2}}));
}

#[test]
fn unflatten_extends_array_rows_by_index() {
    let rows = vec![
        FlatRow::new("tags", PropertyType::Array, r#"["a","b"]"#),
        FlatRow::new("tags.2", PropertyType::String, "c"),
    ];
    assert_eq!(unflatten(&rows), json!({"tags": ["a", "b", "c"]}));
}

#[test]
fn unflatten_empty_is_empty_object() {
    let rows: Vec<FlatRow> = Vec::new();
    assert_eq!(unflatten(&rows), json!({}));
}

// ── flatten ──────────────────────────────────────────────────────

#[test]
fn flatten_produces_dot_paths() {
    let entries = flatten(&json!({"user": {"name": "ada", "age": 36}})).unwrap();
    let mut paths: Vec<_> = entries.iter().map(|e| e.key_path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["user.age", "user.name"]);
}

#[test]
fn flatten_arrays_use_indices() {
    let entries = flatten(&json!({"tags": ["x", true]})).unwrap();
    assert_eq!(
        entries,
        vec![
            FlatEntry {
                key_path: "tags.0".into(),
                value: PropertyValue::string("x"),
            },
            FlatEntry {
                key_path: "tags.1".into(),
                value: PropertyValue::Bool(true),
            },
        ]
    );
}

#[test]
fn flatten_keeps_empty_containers_as_leaves() {
    let entries = flatten(&json!({"a": {}, "b": []})).unwrap();
    let rows = rows(&entries);
    assert_eq!(
        rows,
        vec![
            FlatRow::new("a", PropertyType::Object, "{}"),
            FlatRow::new("b", PropertyType::Array, "[]"),
        ]
    );
}

#[test]
fn flatten_rejects_non_object_roots() {
    assert_eq!(flatten(&json!([1, 2])), Err(CodecError::RootNotObject("array")));
    assert_eq!(flatten(&json!("x")), Err(CodecError::RootNotObject("string")));
}

#[test]
fn flatten_then_unflatten_restores_document() {
    let doc = json!({
        "name": "catalog",
        "price": 9.99,
        "stock": 12,
        "published": false,
        "discontinued": null,
        "dims": {"w": 1.5, "h": 2},
        "tags": ["new", "sale"],
        "variants": [{"sku": "A", "sizes": [1, 2]}, {"sku": "B", "sizes": []}],
        "empty": {}
    });
    let entries = flatten(&doc).unwrap();
    assert_eq!(unflatten(&rows(&entries)), doc);
}
