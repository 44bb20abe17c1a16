//! HTTP API for the flat JSON property store.
//!
//! Every route lives under [`MOUNT`]. Successful responses are `{"data": ..}`;
//! failures are `{"errors": [..]}` with a status derived from the store error.

pub mod error;
pub mod extract;
pub mod handlers;

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use flatjson_storage::HierarchyStore;
use handlers::{changelog, documents, objects, properties, revisions, versions};

pub use error::{ApiError, ErrorBody};
pub use extract::{Actor, Data, PERFORMED_BY_HEADER};
pub use handlers::AppState;

/// Path prefix of the API.
pub const MOUNT: &str = "/flat-json";

/// Build the HTTP API router over the given store.
pub fn build_router(store: Arc<HierarchyStore>) -> Router {
    Router::new()
        .nest(MOUNT, api_routes())
        // `nest` maps the Property root to the bare mount path only
        .route(
            &format!("{MOUNT}/"),
            get(properties::list).post(properties::create),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Objects
        .route("/objects", get(objects::list).post(objects::create))
        .route(
            "/objects/{id}",
            get(objects::get).put(objects::update).delete(objects::delete),
        )
        .route("/objects/{id}/lock", post(objects::lock))
        .route("/objects/{id}/unlock", post(objects::unlock))
        .route("/objects/{id}/next-version", get(objects::next_version))
        .route("/objects/{id}/increment-version", post(objects::increment_version))
        // Versions
        .route("/versions", get(versions::list).post(versions::create))
        .route(
            "/versions/{id}",
            get(versions::get).put(versions::update).delete(versions::delete),
        )
        .route("/versions/{id}/lock", post(versions::lock))
        .route("/versions/{id}/unlock", post(versions::unlock))
        .route("/versions/{id}/next-revision", get(versions::next_revision))
        .route("/versions/{id}/increment-revision", post(versions::increment_revision))
        // Revisions
        .route("/revisions", get(revisions::list).post(revisions::create))
        .route(
            "/revisions/{id}",
            get(revisions::get).put(revisions::update).delete(revisions::delete),
        )
        .route("/revisions/{id}/lock", post(revisions::lock))
        .route("/revisions/{id}/unlock", post(revisions::unlock))
        // Documents
        .route("/revision/{id}", get(documents::revision_properties))
        .route("/revision/{id}/unflatten", get(documents::unflatten_revision))
        .route("/revision/{id}/flatten", post(documents::flatten_into_revision))
        .route("/version/{id}/unflatten", get(documents::unflatten_version))
        .route("/object/{id}/unflatten", get(documents::unflatten_object))
        // Changelog
        .route("/changelog", get(changelog::list))
        .route("/changelog/object/{id}", get(changelog::for_object))
        .route("/changelog/version/{id}", get(changelog::for_version))
        .route("/changelog/revision/{id}", get(changelog::for_revision))
        // Properties, rooted at the mount point
        .route("/", get(properties::list).post(properties::create))
        .route(
            "/{id}",
            get(properties::get).put(properties::update).delete(properties::delete),
        )
        .route("/{id}/restore", post(properties::restore))
        .route("/{id}/lock", post(properties::lock))
        .route("/{id}/unlock", post(properties::unlock))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            errors: vec![format!("no route for {}", uri.path())],
        }),
    )
}
