//! SQLite storage for the flat JSON property hierarchy.
//!
//! [`HierarchyStore`] is the entry point. It owns transaction boundaries and
//! composes the pieces below:
//! - [`lock`]: loads an entity with its ancestors and enforces the lock chain
//! - [`allocator`]: next Version labels and Revision ids
//! - [`changelog`]: the append-only audit trail
//!
//! Every mutation runs its lock check, the change and its changelog entry
//! in a single transaction.

pub mod allocator;
pub mod changelog;
mod db;
mod error;
mod hierarchy;
pub mod lock;
mod rows;

pub use allocator::{NextRevision, VersionLabels};
pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use hierarchy::{HierarchyStore, ListOptions, StoreConfig};
pub use lock::{
    check_lock_hierarchy, LockChain, ObjectChain, PropertyChain, RevisionChain, Scope,
    VersionChain,
};
