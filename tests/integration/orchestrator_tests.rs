/// Orchestrator integration tests: reports, concurrency and background work
use std::sync::Arc;
use std::time::Duration;

use insight_engine_mcp::config::{AnalyticsConfig, StoreConfig};
use insight_engine_mcp::*;

#[cfg(test)]
mod orchestrator_integration_tests {
    use super::*;

    fn memory_orchestrator(config: StoreConfig) -> Arc<InsightOrchestrator> {
        Arc::new(InsightOrchestrator::open(
            config,
            AnalyticsConfig::default(),
            Arc::new(MemorySnapshotStore::new()),
        ))
    }

    fn record_day(orchestrator: &InsightOrchestrator, user: &str) {
        let user = Some(user.to_string());
        for (action, task) in [("task_start", "t1"), ("open", "t1"), ("task_end", "t1")] {
            orchestrator
                .record(
                    EventPayload::Interaction {
                        action: action.to_string(),
                        task_id: Some(task.to_string()),
                        target: None,
                    },
                    user.clone(),
                    None,
                )
                .unwrap();
        }
        orchestrator
            .record(
                EventPayload::TaskCompletion {
                    task_id: Some("t1".to_string()),
                    task_category: Some("Work".to_string()),
                    completed_at: Some(chrono::Utc::now()),
                    time_spent_minutes: Some(45.0),
                },
                user.clone(),
                None,
            )
            .unwrap();
        orchestrator
            .record(
                EventPayload::AiUsage {
                    feature: Some("goal_analysis".to_string()),
                    intent: Some("plan".to_string()),
                    satisfaction: Some(4.0),
                },
                user,
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_back_to_back_reports_have_equal_contents() {
        let orchestrator = memory_orchestrator(StoreConfig::default());
        record_day(&orchestrator, "alice");

        let first = orchestrator.generate_insights("alice", TimeRange::Week);
        let second = orchestrator.generate_insights("alice", TimeRange::Week);

        assert!(first.same_contents(&second));
        assert_eq!(first.metrics, second.metrics);
        assert_eq!(first.patterns, second.patterns);
        assert_eq!(first.metrics.task_completion_rate, 1.0);
        assert_eq!(first.metrics.ai_usage.daily_usage, 1);
        assert_eq!(first.patterns.preferred_categories, vec!["work"]);
        assert_eq!(orchestrator.history("alice").len(), 2);
    }

    #[test]
    fn test_reports_are_scoped_to_one_user() {
        let orchestrator = memory_orchestrator(StoreConfig::default());
        record_day(&orchestrator, "alice");

        let bob = orchestrator.generate_insights("bob", TimeRange::Month);
        assert_eq!(bob.metrics.productivity_score, 0);
        assert_eq!(bob.user_id, "bob");
    }

    #[test]
    fn test_concurrent_records_and_reports() {
        let orchestrator = memory_orchestrator(StoreConfig::default());

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let orchestrator = Arc::clone(&orchestrator);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        record_day(&orchestrator, &format!("user-{}", n));
                    }
                })
            })
            .collect();

        let reader = {
            let orchestrator = Arc::clone(&orchestrator);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    let report = orchestrator.generate_insights("user-0", TimeRange::Day);
                    assert!(report.metrics.task_completion_rate <= 1.0);
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        // 4 users x 25 days x 3 interactions
        assert_eq!(orchestrator.store().len(EventCategory::Interaction), 300);
        assert_eq!(orchestrator.store().len(EventCategory::TaskCompletion), 100);
        assert_eq!(orchestrator.store().user_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_background_flush_persists_without_close() {
        let persistence = Arc::new(MemorySnapshotStore::new());
        let config = StoreConfig {
            flush_interval_secs: 1,
            compaction_interval_secs: 1,
            analysis_interval_secs: 1,
            ..StoreConfig::default()
        };
        let orchestrator = Arc::new(InsightOrchestrator::open(
            config,
            AnalyticsConfig::default(),
            persistence.clone(),
        ));
        orchestrator.start_background();
        record_day(&orchestrator, "carol");

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let saved = persistence.load().unwrap().expect("periodic flush ran");
        assert_eq!(saved.len(), 5);
        assert!(!orchestrator.history("carol").is_empty());

        orchestrator.close().await;
    }
}
