use axum::extract::State;
use flatjson_model::{NewRevision, Revision, RevisionUpdate};
use flatjson_storage::ListOptions;
use flatjson_types::{RevisionId, VersionId};
use serde::Deserialize;

use super::{created, run, ApiResult, AppState, Created};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, Data};

#[derive(Debug, Default, Deserialize)]
pub struct RevisionQuery {
    pub version_id: Option<VersionId>,
    #[serde(default)]
    pub include_inactive: bool,
    pub with_children: Option<bool>,
}

pub async fn list(
    State(store): State<AppState>,
    ApiQuery(query): ApiQuery<RevisionQuery>,
) -> ApiResult<Vec<Revision>> {
    let options = ListOptions {
        include_inactive: query.include_inactive,
        with_children: query.with_children.unwrap_or(true),
    };
    let version_id = query.version_id;
    let revisions = run(&store, move |s| s.list_revisions(version_id, options)).await?;
    Ok(Data::new(revisions))
}

pub async fn get(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
) -> ApiResult<Revision> {
    Ok(Data::new(run(&store, move |s| s.get_revision(id)).await?))
}

pub async fn create(
    State(store): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<NewRevision>,
) -> Created<Revision> {
    created(run(&store, move |s| s.create_revision(input, actor.as_deref())).await?)
}

pub async fn update(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
    actor: Actor,
    ApiJson(changes): ApiJson<RevisionUpdate>,
) -> ApiResult<Revision> {
    let revision = run(&store, move |s| s.update_revision(id, changes, actor.as_deref())).await?;
    Ok(Data::new(revision))
}

pub async fn delete(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
    actor: Actor,
) -> ApiResult<Revision> {
    Ok(Data::new(run(&store, move |s| s.delete_revision(id, actor.as_deref())).await?))
}

pub async fn lock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
    actor: Actor,
) -> ApiResult<Revision> {
    Ok(Data::new(run(&store, move |s| s.lock_revision(id, actor.as_deref())).await?))
}

pub async fn unlock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
    actor: Actor,
) -> ApiResult<Revision> {
    Ok(Data::new(run(&store, move |s| s.unlock_revision(id, actor.as_deref())).await?))
}
