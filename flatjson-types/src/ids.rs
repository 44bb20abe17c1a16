//! Identifier types for the entity hierarchy.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_id!(
    /// Identifier of an Object, the root of a hierarchy branch.
    ObjectId
);

define_id!(
    /// Identifier of a Version row.
    VersionId
);

define_id!(
    /// Identifier of a Revision row.
    ///
    /// Distinct from [`RevisionUuid`], which is the revision's public label.
    RevisionId
);

define_id!(
    /// Identifier of a flattened Property row.
    PropertyId
);

define_id!(
    /// Identifier of an append-only changelog entry.
    ChangelogId
);

define_id!(
    /// The time-ordered label allocated to each Revision.
    ///
    /// Generated server-side unless a caller supplies one explicitly. It
    /// carries no ordering guarantee beyond approximate creation order.
    RevisionUuid
);
