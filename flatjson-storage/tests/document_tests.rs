use flatjson_model::{NewObject, NewProperty, PropertyUpdate};
use flatjson_storage::{HierarchyStore, ListOptions, StorageError, StoreConfig};
use flatjson_types::{IncrementKind, PropertyType, PropertyValue, RevisionId, VersionId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn make_store() -> HierarchyStore {
    HierarchyStore::open_in_memory().unwrap()
}

fn object_named(store: &HierarchyStore, name: &str) -> flatjson_model::Object {
    store
        .create_object(
            NewObject {
                name: name.into(),
                description: None,
            },
            None,
        )
        .unwrap()
}

fn fresh_revision(store: &HierarchyStore) -> (VersionId, RevisionId) {
    let object = object_named(store, "catalog");
    let version = store.increment_version(object.id, IncrementKind::Patch, None).unwrap();
    let revision = store.increment_revision(version.id, None).unwrap();
    (version.id, revision.id)
}

// ── End to end ───────────────────────────────────────────────────

#[test]
fn catalog_price_scenario() {
    let store = make_store();
    let object = object_named(&store, "catalog");

    let version = store.increment_version(object.id, IncrementKind::Patch, None).unwrap();
    assert_eq!(version.version_number, "0.0.1");

    let next = store.next_revision_id(version.id).unwrap();
    assert_eq!(next.current_count, 0);
    let revision = store.increment_revision(version.id, None).unwrap();

    let input = NewProperty::from_text(revision.id, "price", PropertyType::Number, "9.99").unwrap();
    store.create_property(input, None).unwrap();

    assert_eq!(store.unflatten_revision(revision.id).unwrap(), json!({ "price": 9.99 }));
}

// ── Unflatten ────────────────────────────────────────────────────

#[test]
fn unflatten_builds_nested_document() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    for (path, value) in [
        ("user.preferences.theme", PropertyValue::string("dark")),
        ("user.preferences.font_size", PropertyValue::integer(14)),
        ("user.active", PropertyValue::bool(true)),
        ("user.tags.0", PropertyValue::string("admin")),
        ("user.tags.1", PropertyValue::string("ops")),
    ] {
        store
            .create_property(NewProperty::new(revision, path, value), None)
            .unwrap();
    }

    assert_eq!(
        store.unflatten_revision(revision).unwrap(),
        json!({
            "user": {
                "preferences": { "theme": "dark", "font_size": 14 },
                "active": true,
                "tags": ["admin", "ops"]
            }
        })
    );
}

#[test]
fn deleted_properties_are_left_out() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    store
        .create_property(NewProperty::new(revision, "a", PropertyValue::integer(1)), None)
        .unwrap();
    let b = store
        .create_property(NewProperty::new(revision, "b", PropertyValue::integer(2)), None)
        .unwrap();
    store.delete_property(b.id, None).unwrap();

    assert_eq!(store.unflatten_revision(revision).unwrap(), json!({ "a": 1 }));
}

#[test]
fn retagging_requires_readable_text() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    let property = store
        .create_property(
            NewProperty::new(revision, "config", PropertyValue::string("{broken")),
            None,
        )
        .unwrap();
    // Any text is a valid string, but not a valid object.
    let err = store
        .update_property(
            property.id,
            PropertyUpdate {
                property_type: Some(PropertyType::Object),
                ..PropertyUpdate::default()
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StorageError::ValidationFailed(_)));

    assert_eq!(
        store.unflatten_revision(revision).unwrap(),
        json!({ "config": "{broken" })
    );
}

#[test]
fn version_unflatten_merges_revisions_in_order() {
    let store = make_store();
    let (version, first) = fresh_revision(&store);
    store
        .ingest_document(first, &json!({ "name": "lamp", "price": 10 }), None)
        .unwrap();
    let second = store.increment_revision(version, None).unwrap().id;
    store
        .ingest_document(second, &json!({ "price": 12, "stock": { "warehouse": 3 } }), None)
        .unwrap();
    let third = store.increment_revision(version, None).unwrap().id;
    store
        .ingest_document(third, &json!({ "name": "discarded" }), None)
        .unwrap();
    store.delete_revision(third, None).unwrap();

    assert_eq!(
        store.unflatten_version(version).unwrap(),
        json!({ "name": "lamp", "price": 12, "stock": { "warehouse": 3 } })
    );
}

#[test]
fn object_unflatten_spans_active_versions() {
    let store = make_store();
    let object = object_named(&store, "catalog");

    let v1 = store.increment_version(object.id, IncrementKind::Major, None).unwrap();
    let r1 = store.increment_revision(v1.id, None).unwrap();
    store
        .ingest_document(r1.id, &json!({ "title": "one", "legacy": true }), None)
        .unwrap();

    let v2 = store.increment_version(object.id, IncrementKind::Major, None).unwrap();
    let r2 = store.increment_revision(v2.id, None).unwrap();
    store.ingest_document(r2.id, &json!({ "title": "two" }), None).unwrap();

    let v3 = store.increment_version(object.id, IncrementKind::Major, None).unwrap();
    let r3 = store.increment_revision(v3.id, None).unwrap();
    store.ingest_document(r3.id, &json!({ "title": "three" }), None).unwrap();
    store.delete_version(v3.id, None).unwrap();

    assert_eq!(
        store.unflatten_object(object.id).unwrap(),
        json!({ "title": "two", "legacy": true })
    );
}

#[test]
fn unflatten_of_missing_revision_is_not_found() {
    let store = make_store();
    let err = store.unflatten_revision(RevisionId::new()).unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

// ── Ingest ───────────────────────────────────────────────────────

#[test]
fn ingest_then_unflatten_reproduces_document() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    let document = json!({
        "name": "Desk Lamp",
        "price": 24.5,
        "stock": 3,
        "discontinued": false,
        "replacement": null,
        "dimensions": { "height": 40, "base": { "width": 12.25, "depth": 12.25 } },
        "colors": ["black", "white"],
        "variants": [{ "sku": "DL-1" }, { "sku": "DL-2", "bulbs": [1, 2] }],
        "notes": {},
        "labels": []
    });

    let created = store.ingest_document(revision, &document, Some("importer")).unwrap();
    assert_eq!(created.len(), 16);
    assert_eq!(store.unflatten_revision(revision).unwrap(), document);
}

#[test]
fn ingest_rejects_non_object_root() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    let err = store.ingest_document(revision, &json!([1, 2]), None).unwrap_err();
    assert!(matches!(err, StorageError::ValidationFailed(_)));
}

// ── Uniqueness and restore ───────────────────────────────────────

#[test]
fn active_key_path_is_unique_per_revision() {
    let store = make_store();
    let (version, revision) = fresh_revision(&store);
    let first = store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(1)), None)
        .unwrap();

    let err = store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(2)), None)
        .unwrap_err();
    assert!(matches!(err, StorageError::UniqueConstraintViolation(ref msg) if msg.contains("price")));

    // Same path in a different revision is fine.
    let other = store.increment_revision(version, None).unwrap();
    assert!(store
        .create_property(NewProperty::new(other.id, "price", PropertyValue::integer(3)), None)
        .is_ok());

    store.delete_property(first.id, None).unwrap();
    let replacement = store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(2)), None)
        .unwrap();
    assert_eq!(replacement.key_value, "2");
}

#[test]
fn restore_conflicts_with_replacement() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    let original = store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(1)), None)
        .unwrap();
    store.delete_property(original.id, None).unwrap();
    store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(2)), None)
        .unwrap();

    let err = store.restore_property(original.id, None).unwrap_err();
    assert!(matches!(err, StorageError::UniqueConstraintViolation(_)));
}

#[test]
fn restore_reactivates_property() {
    let store = make_store();
    let (_, revision) = fresh_revision(&store);
    let property = store
        .create_property(NewProperty::new(revision, "price", PropertyValue::integer(1)), None)
        .unwrap();
    let deleted = store.delete_property(property.id, None).unwrap();
    assert!(!deleted.is_active);
    assert!(deleted.deleted_at.is_some());

    let restored = store.restore_property(property.id, None).unwrap();
    assert!(restored.is_active);
    assert!(restored.deleted_at.is_none());

    let listed = store
        .list_properties(Some(revision), ListOptions::default())
        .unwrap();
    assert_eq!(listed.len(), 1);
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat-json.db");

    let revision = {
        let store = HierarchyStore::open(&path, StoreConfig::default()).unwrap();
        let (_, revision) = fresh_revision(&store);
        store
            .ingest_document(revision, &json!({ "price": 9.99 }), None)
            .unwrap();
        revision
    };

    let reopened = HierarchyStore::open(&path, StoreConfig::default()).unwrap();
    assert_eq!(reopened.unflatten_revision(revision).unwrap(), json!({ "price": 9.99 }));
    assert_eq!(reopened.changelog_count().unwrap(), 4);
}
