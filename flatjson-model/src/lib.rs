//! Entity model for the flat JSON property store.
//!
//! Defines the four-level hierarchy and its audit trail:
//! - [`Object`] → [`Version`] → [`Revision`] → [`Property`]
//! - [`ChangelogEntry`]: one immutable record per state transition
//! - the input types accepted by create/update operations
//!
//! The [`codec`] module converts between nested JSON documents and the
//! flattened `(key_path, key_value, type)` rows Properties are stored as.

pub mod codec;
mod changelog;
mod entity;

pub use changelog::{ChangeAction, ChangelogEntry, EntityKind, NewChangelogEntry};
pub use codec::{flatten, unflatten, CodecError, FlatEntry, FlatRow};
pub use entity::{
    NewObject, NewProperty, NewRevision, NewVersion, Object, ObjectUpdate, Property,
    PropertyStatus, PropertyUpdate, Revision, RevisionUpdate, Version, VersionUpdate,
};
