//! Connection management and the scoped transaction.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::StorageResult;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS objects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        is_locked INTEGER NOT NULL DEFAULT 0,
        is_frozen INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    );

    CREATE TABLE IF NOT EXISTS versions (
        id TEXT PRIMARY KEY,
        object_id TEXT NOT NULL REFERENCES objects(id),
        version_number TEXT NOT NULL,
        description TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        is_active INTEGER NOT NULL DEFAULT 1,
        is_locked INTEGER NOT NULL DEFAULT 0,
        is_frozen INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_versions_object ON versions(object_id);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_active_number
        ON versions(object_id, version_number) WHERE is_active = 1;

    CREATE TABLE IF NOT EXISTS revisions (
        id TEXT PRIMARY KEY,
        version_id TEXT NOT NULL REFERENCES versions(id),
        revision_uuid TEXT NOT NULL UNIQUE,
        summary TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        is_active INTEGER NOT NULL DEFAULT 1,
        is_locked INTEGER NOT NULL DEFAULT 0,
        is_frozen INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_revisions_version ON revisions(version_id);

    CREATE TABLE IF NOT EXISTS properties (
        id TEXT PRIMARY KEY,
        property_type TEXT NOT NULL,
        key_path TEXT NOT NULL,
        key_value TEXT NOT NULL,
        revision_id TEXT NOT NULL REFERENCES revisions(id),
        status TEXT NOT NULL DEFAULT 'active',
        is_active INTEGER NOT NULL DEFAULT 1,
        is_locked INTEGER NOT NULL DEFAULT 0,
        is_frozen INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_properties_revision ON properties(revision_id);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_properties_active_key_path
        ON properties(revision_id, key_path) WHERE is_active = 1;

    CREATE TABLE IF NOT EXISTS changelog (
        id TEXT PRIMARY KEY,
        object_id TEXT REFERENCES objects(id),
        version_id TEXT REFERENCES versions(id),
        revision_id TEXT REFERENCES revisions(id),
        entity_type TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '{}',
        tags TEXT NOT NULL DEFAULT '[]',
        performed_by TEXT NOT NULL DEFAULT 'system',
        performed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_changelog_object ON changelog(object_id);
    CREATE INDEX IF NOT EXISTS idx_changelog_version ON changelog(version_id);
    CREATE INDEX IF NOT EXISTS idx_changelog_revision ON changelog(revision_id);
";

/// Shared handle to the backing SQLite database.
///
/// Cloning is cheap; all clones serialize on the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        debug!("Opening flat JSON store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs read-only work against the connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Runs `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`. Returning `Err` or unwinding drops the
    /// transaction, which rolls it back before the connection is released.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // A panic inside `with_transaction` poisons the mutex, but the rollback
    // has already run by then, so the connection is still consistent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering database connection after a panicked operation");
            poisoned.into_inner()
        })
    }
}
