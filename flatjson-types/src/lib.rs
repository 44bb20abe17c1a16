//! Core type definitions for the flat JSON property store.
//!
//! This crate defines the storage-agnostic building blocks shared by the
//! model, storage and server crates:
//! - Entity identifiers (UUID v7, time-ordered)
//! - Semantic version parsing and incrementing
//! - Typed property values and their text representation

mod ids;
mod semver;
mod value;

pub use ids::{ChangelogId, ObjectId, PropertyId, RevisionId, RevisionUuid, VersionId};
pub use semver::{
    increment_semantic_version, is_malformed_semantic_version, is_valid_semantic_version,
    parse_semantic_version, IncrementKind, SemanticVersion,
};
pub use value::{PropertyType, PropertyValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown property type: {0}")]
    UnknownPropertyType(String),

    #[error("invalid {property_type} value: {reason}")]
    InvalidPropertyValue {
        property_type: PropertyType,
        reason: String,
    },

    #[error("unknown increment type: {0} (expected major, minor or patch)")]
    UnknownIncrementKind(String),
}
