use axum::extract::State;
use flatjson_model::Property;
use flatjson_storage::ListOptions;
use flatjson_types::{ObjectId, RevisionId, VersionId};
use serde_json::Value;

use super::{created, run, ApiResult, AppState, Created};
use crate::extract::{Actor, ApiJson, ApiPath, Data};

/// Active Properties of one Revision.
pub async fn revision_properties(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
) -> ApiResult<Vec<Property>> {
    let properties = run(&store, move |s| {
        s.list_properties(Some(id), ListOptions::default())
    })
    .await?;
    Ok(Data::new(properties))
}

pub async fn unflatten_revision(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
) -> ApiResult<Value> {
    Ok(Data::new(run(&store, move |s| s.unflatten_revision(id)).await?))
}

pub async fn unflatten_version(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
) -> ApiResult<Value> {
    Ok(Data::new(run(&store, move |s| s.unflatten_version(id)).await?))
}

pub async fn unflatten_object(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
) -> ApiResult<Value> {
    Ok(Data::new(run(&store, move |s| s.unflatten_object(id)).await?))
}

/// Stores a nested document as one Property per leaf.
pub async fn flatten_into_revision(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
    actor: Actor,
    ApiJson(document): ApiJson<Value>,
) -> Created<Vec<Property>> {
    created(run(&store, move |s| s.ingest_document(id, &document, actor.as_deref())).await?)
}
