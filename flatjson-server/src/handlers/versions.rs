use axum::extract::State;
use flatjson_model::{NewVersion, Revision, Version, VersionUpdate};
use flatjson_storage::{ListOptions, NextRevision};
use flatjson_types::{ObjectId, VersionId};
use serde::Deserialize;

use super::{created, run, ApiResult, AppState, Created};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, Data};

#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    pub object_id: Option<ObjectId>,
    #[serde(default)]
    pub include_inactive: bool,
    pub with_children: Option<bool>,
}

pub async fn list(
    State(store): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> ApiResult<Vec<Version>> {
    let options = ListOptions {
        include_inactive: query.include_inactive,
        with_children: query.with_children.unwrap_or(true),
    };
    let object_id = query.object_id;
    let versions = run(&store, move |s| s.list_versions(object_id, options)).await?;
    Ok(Data::new(versions))
}

pub async fn get(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
) -> ApiResult<Version> {
    Ok(Data::new(run(&store, move |s| s.get_version(id)).await?))
}

pub async fn create(
    State(store): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<NewVersion>,
) -> Created<Version> {
    created(run(&store, move |s| s.create_version(input, actor.as_deref())).await?)
}

pub async fn update(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
    actor: Actor,
    ApiJson(changes): ApiJson<VersionUpdate>,
) -> ApiResult<Version> {
    let version = run(&store, move |s| s.update_version(id, changes, actor.as_deref())).await?;
    Ok(Data::new(version))
}

pub async fn delete(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
    actor: Actor,
) -> ApiResult<Version> {
    Ok(Data::new(run(&store, move |s| s.delete_version(id, actor.as_deref())).await?))
}

pub async fn lock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
    actor: Actor,
) -> ApiResult<Version> {
    Ok(Data::new(run(&store, move |s| s.lock_version(id, actor.as_deref())).await?))
}

pub async fn unlock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
    actor: Actor,
) -> ApiResult<Version> {
    Ok(Data::new(run(&store, move |s| s.unlock_version(id, actor.as_deref())).await?))
}

pub async fn next_revision(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
) -> ApiResult<NextRevision> {
    Ok(Data::new(run(&store, move |s| s.next_revision_id(id)).await?))
}

pub async fn increment_revision(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
    actor: Actor,
) -> Created<Revision> {
    created(run(&store, move |s| s.increment_revision(id, actor.as_deref())).await?)
}
