//! Route handlers, one module per resource.
//!
//! Store calls hold the SQLite connection, so each one runs on the blocking
//! pool rather than on a runtime worker.

pub mod changelog;
pub mod documents;
pub mod objects;
pub mod properties;
pub mod revisions;
pub mod versions;

use axum::http::StatusCode;
use axum::Json;
use flatjson_storage::{HierarchyStore, ListOptions, StorageResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::Data;

/// Shared handler state.
pub type AppState = Arc<HierarchyStore>;

pub type ApiResult<T> = Result<Json<Data<T>>, ApiError>;

pub type Created<T> = Result<(StatusCode, Json<Data<T>>), ApiError>;

/// Runs one store operation on the blocking pool.
pub(crate) async fn run<T, F>(store: &AppState, operation: F) -> Result<T, ApiError>
where
    F: FnOnce(&HierarchyStore) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || operation(&store))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub(crate) fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Data::new(data)))
}

/// `?include_inactive=&with_children=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
    pub with_children: Option<bool>,
}

impl ListQuery {
    pub fn options(&self) -> ListOptions {
        ListOptions {
            include_inactive: self.include_inactive,
            with_children: self.with_children.unwrap_or(true),
        }
    }
}
