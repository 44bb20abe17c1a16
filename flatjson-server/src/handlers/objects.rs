use axum::extract::State;
use flatjson_model::{NewObject, Object, ObjectUpdate, Version};
use flatjson_storage::VersionLabels;
use flatjson_types::{IncrementKind, ObjectId};
use serde::Deserialize;

use super::{created, run, ApiResult, AppState, Created, ListQuery};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, Data};

/// Body of `POST /objects/{id}/increment-version`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementVersionBody {
    pub increment_type: IncrementKind,
}

pub async fn list(
    State(store): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Object>> {
    let options = query.options();
    let objects = run(&store, move |s| s.list_objects(options)).await?;
    Ok(Data::new(objects))
}

pub async fn get(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
) -> ApiResult<Object> {
    Ok(Data::new(run(&store, move |s| s.get_object(id)).await?))
}

pub async fn create(
    State(store): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<NewObject>,
) -> Created<Object> {
    created(run(&store, move |s| s.create_object(input, actor.as_deref())).await?)
}

pub async fn update(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
    actor: Actor,
    ApiJson(changes): ApiJson<ObjectUpdate>,
) -> ApiResult<Object> {
    let object = run(&store, move |s| s.update_object(id, changes, actor.as_deref())).await?;
    Ok(Data::new(object))
}

pub async fn delete(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
    actor: Actor,
) -> ApiResult<Object> {
    Ok(Data::new(run(&store, move |s| s.delete_object(id, actor.as_deref())).await?))
}

pub async fn lock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
    actor: Actor,
) -> ApiResult<Object> {
    Ok(Data::new(run(&store, move |s| s.lock_object(id, actor.as_deref())).await?))
}

pub async fn unlock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
    actor: Actor,
) -> ApiResult<Object> {
    Ok(Data::new(run(&store, move |s| s.unlock_object(id, actor.as_deref())).await?))
}

pub async fn next_version(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
) -> ApiResult<VersionLabels> {
    Ok(Data::new(run(&store, move |s| s.next_version_label(id)).await?))
}

pub async fn increment_version(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
    actor: Actor,
    ApiJson(body): ApiJson<IncrementVersionBody>,
) -> Created<Version> {
    let kind = body.increment_type;
    created(run(&store, move |s| s.increment_version(id, kind, actor.as_deref())).await?)
}
