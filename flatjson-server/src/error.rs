//! Mapping of store failures onto HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flatjson_storage::StorageError;
use serde::Serialize;
use tracing::warn;

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Storage(StorageError),
    /// Malformed path, query or body.
    BadRequest(String),
    /// The blocking task running the store call failed.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Storage(e) => match e {
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                StorageError::Locked { .. } => StatusCode::FORBIDDEN,
                StorageError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
                StorageError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Storage(e) => e.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(msg) => format!("internal error: {msg}"),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<flatjson_types::Error> for ApiError {
    fn from(e: flatjson_types::Error) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            warn!("Request failed: {}", message);
        }
        (
            status,
            Json(ErrorBody {
                errors: vec![message],
            }),
        )
            .into_response()
    }
}
