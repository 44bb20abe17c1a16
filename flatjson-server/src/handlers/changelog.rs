use axum::extract::State;
use axum::Json;
use flatjson_model::ChangelogEntry;
use flatjson_types::{ObjectId, RevisionId, VersionId};
use serde::{Deserialize, Serialize};

use super::{run, ApiResult, AppState};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery, Data};

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// One page of the unscoped changelog.
#[derive(Debug, Serialize)]
pub struct ChangelogPage {
    pub data: Vec<ChangelogEntry>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

pub async fn list(
    State(store): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<ChangelogPage>, ApiError> {
    let PageQuery { limit, offset } = page;
    let (data, total) = run(&store, move |s| {
        Ok((s.list_changelog(limit, offset)?, s.changelog_count()?))
    })
    .await?;
    Ok(Json(ChangelogPage {
        data,
        total,
        limit,
        offset,
    }))
}

pub async fn for_object(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<ObjectId>,
) -> ApiResult<Vec<ChangelogEntry>> {
    Ok(Data::new(run(&store, move |s| s.changelog_for_object(id)).await?))
}

pub async fn for_version(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<VersionId>,
) -> ApiResult<Vec<ChangelogEntry>> {
    Ok(Data::new(run(&store, move |s| s.changelog_for_version(id)).await?))
}

pub async fn for_revision(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<RevisionId>,
) -> ApiResult<Vec<ChangelogEntry>> {
    Ok(Data::new(run(&store, move |s| s.changelog_for_revision(id)).await?))
}
