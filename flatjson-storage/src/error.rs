//! Error types for the storage layer.

use flatjson_model::{CodecError, EntityKind};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The entity, or an ancestor it references, does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The entity or one of its ancestors is locked.
    #[error("{kind} {id} is locked")]
    Locked { kind: EntityKind, id: String },

    /// Missing or malformed input.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Duplicate object name, active key path, version label or revision uuid.
    #[error("unique constraint violated: {0}")]
    UniqueConstraintViolation(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else the persistence layer reports.
    #[error("unexpected storage failure: {0}")]
    Unexpected(String),
}

impl StorageError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn locked(kind: EntityKind, id: impl ToString) -> Self {
        Self::Locked {
            kind,
            id: id.to_string(),
        }
    }

    /// Replaces the driver's message on a unique violation with a readable one.
    pub(crate) fn describe_conflict(self, message: impl FnOnce() -> String) -> Self {
        match self {
            Self::UniqueConstraintViolation(_) => Self::UniqueConstraintViolation(message()),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::UniqueConstraintViolation(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => Self::Database(e),
        }
    }
}

impl From<flatjson_types::Error> for StorageError {
    fn from(e: flatjson_types::Error) -> Self {
        Self::ValidationFailed(e.to_string())
    }
}

impl From<CodecError> for StorageError {
    fn from(e: CodecError) -> Self {
        Self::ValidationFailed(e.to_string())
    }
}
