/// Storage layer for recorded events
///
/// This module holds the in-memory event store, which is authoritative for the
/// life of the process, and the snapshot persistence interface used to
/// hydrate it at startup and flush it periodically.

pub mod events;
pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use events::*;
pub use sqlite::*;

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Persistence task failed: {0}")]
    Task(String),
}

/// Serialized form of the whole event store
///
/// Maps category name to that category's event records, most recent first.
/// Records are plain JSON objects so categories this build does not know
/// about survive a load/save cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub categories: BTreeMap<String, Vec<serde_json::Value>>,
}

impl StoreSnapshot {
    /// Total number of records across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait defining the persistence collaborator for the event store
///
/// This trait allows swapping SQLite for another backend while the store
/// itself stays unaware of where snapshots go.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, if any
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError>;

    /// Replace the saved snapshot
    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError>;
}

/// Snapshot store that keeps the snapshot in memory only
///
/// Used by hosts that opt out of durability, and by tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<StoreSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        let guard = self.snapshot.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError> {
        let mut guard = self.snapshot.lock().map_err(|_| StorageError::LockPoisoned)?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
