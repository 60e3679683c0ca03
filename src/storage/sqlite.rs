/// SQLite implementation of the snapshot store
///
/// This module provides the concrete SQLite backend the event store is
/// hydrated from at startup and flushed to periodically.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::storage::{migrations, SnapshotStore, StorageError, StoreSnapshot};

/// SQLite-based snapshot storage
///
/// The connection is guarded by a mutex so the store can be shared with
/// background flush tasks.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open (or create) the snapshot database
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite snapshot store initialized at: {:?}", db_path);

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory database, mostly for tests
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// When the last snapshot was saved, if ever
    pub fn last_saved_at(&self) -> Result<Option<chrono::DateTime<Utc>>, StorageError> {
        let conn = self.conn()?;
        let result = conn.query_row("SELECT saved_at FROM snapshot_meta WHERE id = 1", [], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(saved_at) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(&saved_at)
                    .map_err(|e| StorageError::Connection(format!("Invalid saved_at timestamp: {}", e)))?
                    .with_timezone(&Utc);
                Ok(Some(parsed))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Query(e)),
        }
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    /// Load the saved snapshot, or None when nothing was ever saved
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        let conn = self.conn()?;

        let saved: i64 = conn.query_row("SELECT COUNT(*) FROM snapshot_meta", [], |row| row.get(0))?;
        if saved == 0 {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT category, record FROM event_snapshots ORDER BY category, position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = StoreSnapshot::default();
        for row in rows {
            let (category, record) = row?;
            let value: serde_json::Value = serde_json::from_str(&record)?;
            snapshot.categories.entry(category).or_default().push(value);
        }

        tracing::debug!(records = snapshot.len(), "Loaded snapshot from SQLite");
        Ok(Some(snapshot))
    }

    /// Replace the saved snapshot in a single transaction
    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM event_snapshots", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO event_snapshots (category, position, record) VALUES (?1, ?2, ?3)",
            )?;
            for (category, records) in &snapshot.categories {
                for (position, record) in records.iter().enumerate() {
                    let encoded = serde_json::to_string(record)?;
                    insert.execute(params![category, position as i64, encoded])?;
                }
            }
        }
        tx.execute(
            "INSERT INTO snapshot_meta (id, saved_at, record_count) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at, record_count = excluded.record_count",
            params![Utc::now().to_rfc3339(), snapshot.len() as i64],
        )?;
        tx.commit()?;

        tracing::debug!(records = snapshot.len(), "Saved snapshot to SQLite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_database_has_no_snapshot() {
        let store = SqliteSnapshotStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.last_saved_at().unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let store = SqliteSnapshotStore::in_memory().unwrap();

        let mut first = StoreSnapshot::default();
        first
            .categories
            .insert("interaction".to_string(), vec![json!({"n": 1}), json!({"n": 2})]);
        store.save(&first).unwrap();

        let mut second = StoreSnapshot::default();
        second.categories.insert("ai_usage".to_string(), vec![json!({"n": 3})]);
        second.categories.insert("interaction".to_string(), vec![]);
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.categories["ai_usage"], vec![json!({"n": 3})]);
        assert!(store.last_saved_at().unwrap().is_some());
    }

    #[test]
    fn test_positions_preserve_order() {
        let store = SqliteSnapshotStore::in_memory().unwrap();
        let records: Vec<_> = (0..12).map(|n| json!({ "n": n })).collect();
        let mut snapshot = StoreSnapshot::default();
        snapshot.categories.insert("goal_progress".to_string(), records.clone());
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.categories["goal_progress"], records);
    }
}
