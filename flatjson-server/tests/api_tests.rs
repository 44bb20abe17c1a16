use flatjson_server::{build_router, MOUNT};
use flatjson_storage::HierarchyStore;
use pretty_assertions::assert_eq;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

/// Spin up the HTTP server on an OS-assigned port, returning the API base URL.
async fn spawn_test_server() -> String {
    let store = Arc::new(HierarchyStore::open_in_memory().unwrap());
    let app = build_router(store);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}{}", port, MOUNT)
}

async fn post(client: &Client, url: String, body: Value) -> (StatusCode, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn get(client: &Client, url: String) -> (StatusCode, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn create_object(client: &Client, base: &str, name: &str) -> String {
    let (status, body) = post(client, format!("{base}/objects"), json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Object → patch Version → Revision, returning the three ids.
async fn create_branch(client: &Client, base: &str) -> (String, String, String) {
    let object = create_object(client, base, "catalog").await;
    let (_, version) = post(
        client,
        format!("{base}/objects/{object}/increment-version"),
        json!({ "incrementType": "patch" }),
    )
    .await;
    let version = version["data"]["id"].as_str().unwrap().to_string();
    let (_, revision) = post(
        client,
        format!("{base}/versions/{version}/increment-revision"),
        json!({}),
    )
    .await;
    let revision = revision["data"]["id"].as_str().unwrap().to_string();
    (object, version, revision)
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn catalog_price_scenario() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let object = create_object(&client, &base, "catalog").await;

    let (status, version) = post(
        &client,
        format!("{base}/objects/{object}/increment-version"),
        json!({ "incrementType": "patch" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(version["data"]["version_number"], json!("0.0.1"));
    let version = version["data"]["id"].as_str().unwrap().to_string();

    let (status, next) = get(&client, format!("{base}/versions/{version}/next-revision")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["data"]["currentCount"], json!(0));
    assert!(next["data"]["nextRevision"].is_string());

    let (status, revision) = post(
        &client,
        format!("{base}/versions/{version}/increment-revision"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let revision = revision["data"]["id"].as_str().unwrap().to_string();

    let (status, property) = post(
        &client,
        base.clone(),
        json!({
            "type": "number",
            "key_path": "price",
            "key_value": "9.99",
            "revision_id": revision
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(property["data"]["type"], json!("number"));

    let (status, document) = get(&client, format!("{base}/revision/{revision}/unflatten")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document, json!({ "data": { "price": 9.99 } }));
}

#[tokio::test]
async fn next_version_returns_seed_labels() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let object = create_object(&client, &base, "catalog").await;

    let (status, body) = get(&client, format!("{base}/objects/{object}/next-version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({ "major": "1.0.0", "minor": "0.1.0", "patch": "0.0.1" })
    );
}

#[tokio::test]
async fn flatten_then_unflatten_round_trips() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (object, version, revision) = create_branch(&client, &base).await;
    let document = json!({
        "user": { "name": "Ada", "roles": ["admin", "ops"], "active": true },
        "limits": { "daily": 10.5, "none": null }
    });

    let (status, created) =
        post(&client, format!("{base}/revision/{revision}/flatten"), document.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"].as_array().unwrap().len(), 6);

    let (_, listed) = get(&client, format!("{base}/revision/{revision}")).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 6);

    for url in [
        format!("{base}/revision/{revision}/unflatten"),
        format!("{base}/version/{version}/unflatten"),
        format!("{base}/object/{object}/unflatten"),
    ] {
        let (status, body) = get(&client, url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], document);
    }
}

#[tokio::test]
async fn property_root_accepts_trailing_slash() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (_, _, revision) = create_branch(&client, &base).await;

    let (status, created) = post(
        &client,
        format!("{base}/"),
        json!({ "type": "string", "key_path": "name", "key_value": "lamp", "revision_id": revision }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = get(&client, format!("{base}/?revision_id={revision}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"][0]["id"], created["data"]["id"]);
}

#[tokio::test]
async fn update_accepts_non_string_key_value() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (_, _, revision) = create_branch(&client, &base).await;
    let (_, created) = post(
        &client,
        base.clone(),
        json!({ "type": "number", "key_path": "stock", "key_value": 5, "revision_id": revision }),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = client
        .put(format!("{base}/{id}"))
        .json(&json!({ "key_value": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["key_value"], json!("6"));
    assert_eq!(updated["data"]["type"], json!("number"));

    let resp = client
        .put(format!("{base}/{id}"))
        .json(&json!({ "type": "object", "key_value": { "in_stock": true } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, document) = get(&client, format!("{base}/revision/{revision}/unflatten")).await;
    assert_eq!(document["data"], json!({ "stock": { "in_stock": true } }));
}

// ── Error mapping ────────────────────────────────────────────────

#[tokio::test]
async fn locked_object_rejects_property_writes_with_403() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (object, _, revision) = create_branch(&client, &base).await;

    let (status, _) = post(&client, format!("{base}/objects/{object}/lock"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &client,
        base.clone(),
        json!({ "type": "string", "key_path": "name", "key_value": "lamp", "revision_id": revision }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["errors"][0].as_str().unwrap().contains("locked"));

    post(&client, format!("{base}/objects/{object}/unlock"), json!({})).await;
    let (status, _) = post(
        &client,
        base.clone(),
        json!({ "type": "string", "key_path": "name", "key_value": "lamp", "revision_id": revision }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn missing_entity_is_404() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (status, body) = get(
        &client,
        format!("{base}/objects/0190b0b0-0000-7000-8000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_name_is_409() {
    let base = spawn_test_server().await;
    let client = Client::new();
    create_object(&client, &base, "catalog").await;

    let (status, body) = post(&client, format!("{base}/objects"), json!({ "name": "catalog" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["errors"][0].as_str().unwrap().contains("catalog"));
}

#[tokio::test]
async fn duplicate_active_key_path_is_409() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let (_, _, revision) = create_branch(&client, &base).await;
    let body = json!({ "type": "number", "key_path": "price", "key_value": 1, "revision_id": revision });

    let (status, first) = post(&client, base.clone(), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&client, base.clone(), body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = first["data"]["id"].as_str().unwrap();
    let resp = client.delete(format!("{base}/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let (status, _) = post(&client, base.clone(), body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post(&client, format!("{base}/{id}/restore"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_input_is_400() {
    let base = spawn_test_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/objects"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["errors"].is_array());

    let (status, _) = post(&client, format!("{base}/objects"), json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&client, format!("{base}/objects/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, revision) = create_branch(&client, &base).await;
    let (status, _) = post(
        &client,
        base.clone(),
        json!({ "type": "number", "key_path": "price", "key_value": "cheap", "revision_id": revision }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_increment_type_is_400() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let object = create_object(&client, &base, "catalog").await;

    let (status, body) = post(
        &client,
        format!("{base}/objects/{object}/increment-version"),
        json!({ "incrementType": "huge" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].is_array());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;
    let (status, body) = get(&Client::new(), format!("{base}/objects/x/y/z")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["errors"].is_array());
}

// ── Changelog ────────────────────────────────────────────────────

#[tokio::test]
async fn performed_by_header_is_recorded() {
    let base = spawn_test_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/objects"))
        .header("X-Performed-By", "alice")
        .json(&json!({ "name": "catalog" }))
        .send()
        .await
        .unwrap();
    let created: Value = resp.json().await.unwrap();
    let object = created["data"]["id"].as_str().unwrap().to_string();
    post(&client, format!("{base}/objects/{object}/lock"), json!({})).await;

    let (status, body) = get(&client, format!("{base}/changelog/object/{object}")).await;
    assert_eq!(status, StatusCode::OK);
    let actors: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["performed_by"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actors, vec!["system", "alice"]);
}

#[tokio::test]
async fn changelog_is_paginated_newest_first() {
    let base = spawn_test_server().await;
    let client = Client::new();
    for name in ["a", "b", "c"] {
        create_object(&client, &base, name).await;
    }

    let (status, page) = get(&client, format!("{base}/changelog?limit=2&offset=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], json!(3));
    assert_eq!(page["limit"], json!(2));
    let names: Vec<_> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["details"]["new"]["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("b"), json!("a")]);

    let (_, defaults) = get(&client, format!("{base}/changelog")).await;
    assert_eq!(defaults["limit"], json!(100));
    assert_eq!(defaults["offset"], json!(0));
}
