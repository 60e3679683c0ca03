/// Event store unit tests
use chrono::{Duration, Utc};
use insight_engine_mcp::config::StoreConfig;
use insight_engine_mcp::*;

#[cfg(test)]
mod store_unit_tests {
    use super::*;

    fn interaction(action: &str) -> EventPayload {
        EventPayload::Interaction {
            action: action.to_string(),
            task_id: None,
            target: None,
        }
    }

    fn store_with_cap(cap: usize) -> EventStore {
        EventStore::new(&StoreConfig {
            max_events_per_category: cap,
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_cap_holds_after_every_record() {
        let store = store_with_cap(5);
        for i in 0..25 {
            store
                .record(interaction(&format!("click-{}", i)), None, None)
                .expect("valid payload");
            assert!(store.len(EventCategory::Interaction) <= 5);
        }

        let events = store.query(EventCategory::Interaction, None, None);
        assert_eq!(events.len(), 5);
        // most recent first, and the newest survived
        assert!(events.windows(2).all(|pair| pair[0].timestamp >= pair[1].timestamp));
        assert!(matches!(
            &events[0].payload,
            EventPayload::Interaction { action, .. } if action == "click-24"
        ));
    }

    #[test]
    fn test_query_includes_global_events_for_every_user() {
        let store = store_with_cap(100);
        store.record(interaction("a"), Some("alice".to_string()), None).unwrap();
        store.record(interaction("b"), Some("bob".to_string()), None).unwrap();
        store.record(interaction("g"), None, None).unwrap();

        assert_eq!(store.query(EventCategory::Interaction, Some("alice"), None).len(), 2);
        assert_eq!(store.query(EventCategory::Interaction, Some("bob"), None).len(), 2);
        assert_eq!(store.query(EventCategory::Interaction, None, None).len(), 3);
        assert!(store.query(EventCategory::GoalProgress, Some("alice"), None).is_empty());

        let future = Utc::now() + Duration::minutes(1);
        assert!(store.query(EventCategory::Interaction, None, Some(future)).is_empty());
    }

    #[test]
    fn test_timestamps_are_assigned_by_the_store() {
        let store = store_with_cap(10);
        let before = Utc::now();
        let event = store.record(interaction("open"), None, None).unwrap();
        assert!(event.timestamp >= before);
        assert!(event.timestamp <= Utc::now());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_restore_is_additive_and_keeps_unknown_categories() {
        let source = store_with_cap(100);
        source.record(interaction("one"), None, None).unwrap();
        source.record(interaction("two"), None, None).unwrap();
        let mut snapshot = source.snapshot().unwrap();
        snapshot.categories.insert(
            "meal_logged".to_string(),
            vec![serde_json::json!({ "meal": "lunch" })],
        );

        let target = store_with_cap(100);
        target.record(interaction("three"), None, None).unwrap();

        let first = target.restore(snapshot.clone());
        assert_eq!(first.restored, 2);
        assert_eq!(first.foreign_categories, 1);
        assert_eq!(target.len(EventCategory::Interaction), 3);

        // the same events again are not duplicated
        let second = target.restore(snapshot);
        assert_eq!(second.restored, 0);
        assert_eq!(target.len(EventCategory::Interaction), 3);

        let saved = target.snapshot().unwrap();
        assert!(saved.categories.contains_key("meal_logged"));
    }

    #[test]
    fn test_restore_drops_events_past_retention() {
        let old = Event::from_existing(
            EventId::new(),
            interaction("ancient"),
            Utc::now() - Duration::days(120),
            None,
            None,
        );
        let mut snapshot = StoreSnapshot::default();
        snapshot
            .categories
            .insert("interaction".to_string(), vec![serde_json::to_value(&old).unwrap()]);

        let store = store_with_cap(100);
        store.restore(snapshot);
        assert_eq!(store.len(EventCategory::Interaction), 0);
    }

    #[test]
    fn test_slice_covers_every_category_for_one_user() {
        let store = store_with_cap(100);
        let alice = Some("alice".to_string());
        store.record(interaction("open"), alice.clone(), None).unwrap();
        store
            .record(
                EventPayload::TaskCompletion {
                    task_id: None,
                    task_category: Some("work".to_string()),
                    completed_at: Some(Utc::now()),
                    time_spent_minutes: Some(20.0),
                },
                alice.clone(),
                None,
            )
            .unwrap();
        store
            .record(
                EventPayload::GoalProgress {
                    goal_id: "g".to_string(),
                    progress: 10.0,
                    started_at: None,
                },
                alice.clone(),
                None,
            )
            .unwrap();
        store
            .record(
                EventPayload::AiUsage {
                    feature: Some("goal_analysis".to_string()),
                    intent: None,
                    satisfaction: Some(4.0),
                },
                Some("bob".to_string()),
                None,
            )
            .unwrap();

        let slice = store.slice(Some("alice"), Utc::now() - Duration::days(1));
        assert_eq!(slice.len(), 3);
        assert!(slice.ai_usage.is_empty());
        assert_eq!(store.user_ids().len(), 2);
    }
}
