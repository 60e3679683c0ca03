/// Persistence integration tests against an on-disk SQLite database
use std::sync::Arc;

use insight_engine_mcp::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod persistence_integration_tests {
    use super::*;

    fn goal(progress: f64) -> EventPayload {
        EventPayload::GoalProgress {
            goal_id: "write-thesis".to_string(),
            progress,
            started_at: None,
        }
    }

    #[tokio::test]
    async fn test_events_survive_close_and_reopen() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_path_buf();

        let server = InsightServer::new(db_path.clone(), EngineConfig::default())
            .await
            .expect("Failed to create first server");
        let recorded = server
            .orchestrator()
            .record(goal(20.0), Some("alice".to_string()), Some("s-1".to_string()))
            .unwrap();
        server.orchestrator().record(goal(35.0), Some("alice".to_string()), None).unwrap();
        server.close().await;

        let reopened = InsightServer::new(db_path, EngineConfig::default())
            .await
            .expect("Failed to create second server");
        let events = reopened
            .orchestrator()
            .query(EventCategory::GoalProgress, Some("alice"), None);

        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.id == recorded.id && e.session_id.as_deref() == Some("s-1")));
        assert!(!reopened.orchestrator().store().is_dirty());
    }

    #[test]
    fn test_sqlite_snapshot_round_trip_keeps_unknown_categories() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let store = SqliteSnapshotStore::new(temp_file.path().to_path_buf())
            .expect("Failed to create storage");
        assert!(store.load().unwrap().is_none());

        let mut snapshot = StoreSnapshot::default();
        snapshot.categories.insert(
            "mood_check".to_string(),
            vec![serde_json::json!({ "mood": "good" }), serde_json::json!({ "mood": "tired" })],
        );
        snapshot.categories.insert("interaction".to_string(), Vec::new());
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap().expect("snapshot saved");
        assert_eq!(loaded.categories["mood_check"], snapshot.categories["mood_check"]);
        assert!(store.last_saved_at().unwrap().is_some());

        // saves replace rather than append
        store.save(&StoreSnapshot::default()).unwrap();
        assert!(store.load().unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_store_dirty() {
        struct BrokenStore;

        impl SnapshotStore for BrokenStore {
            fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
                Err(StorageError::Connection("disk unplugged".to_string()))
            }

            fn save(&self, _snapshot: &StoreSnapshot) -> Result<(), StorageError> {
                Err(StorageError::Connection("disk unplugged".to_string()))
            }
        }

        // a failing load does not prevent startup
        let server = InsightServer::with_persistence(EngineConfig::default(), Arc::new(BrokenStore))
            .expect("startup tolerates a broken snapshot store");
        server.orchestrator().record(goal(5.0), None, None).unwrap();

        assert!(server.orchestrator().flush_now().await.is_err());
        assert!(server.orchestrator().store().is_dirty());

        // close swallows the error
        server.close().await;
        assert_eq!(server.orchestrator().store().len(EventCategory::GoalProgress), 1);
    }
}
