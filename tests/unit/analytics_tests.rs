/// Analytics unit tests: metrics, patterns, recommendations and reports
use chrono::{DateTime, Duration, TimeZone, Utc};
use insight_engine_mcp::analytics::{metrics, patterns, recommendations};
use insight_engine_mcp::analytics::{BehaviorPatterns, ProductivityMetrics, RecommendationKind};
use insight_engine_mcp::config::AnalyticsConfig;
use insight_engine_mcp::*;

#[cfg(test)]
mod analytics_unit_tests {
    use super::*;

    fn at(timestamp: DateTime<Utc>, payload: EventPayload) -> Event {
        Event::from_existing(EventId::new(), payload, timestamp, None, None)
    }

    fn marker(timestamp: DateTime<Utc>, action: &str, task: &str) -> Event {
        at(
            timestamp,
            EventPayload::Interaction {
                action: action.to_string(),
                task_id: Some(task.to_string()),
                target: None,
            },
        )
    }

    fn completion(done: bool, minutes: Option<f64>) -> Event {
        at(
            Utc::now() - Duration::hours(1),
            EventPayload::TaskCompletion {
                task_id: None,
                task_category: None,
                completed_at: if done { Some(Utc::now()) } else { None },
                time_spent_minutes: minutes,
            },
        )
    }

    #[test]
    fn test_empty_slice_yields_zero_metrics() {
        let slice = EventSlice::from_events(Utc::now(), Vec::new());
        let result = metrics::calculate(&slice, &AnalyticsConfig::default());

        assert_eq!(result.task_completion_rate, 0.0);
        assert_eq!(result.goal_progress_rate, 0.0);
        assert_eq!(result.focus_time, 0.0);
        assert_eq!(result.ai_usage.daily_usage, 0);
        assert_eq!(result.productivity_score, 0);

        let found = patterns::identify(&slice, &AnalyticsConfig::default());
        assert!(found.peak_hours.is_empty());
        assert!(found.preferred_categories.is_empty());
        assert_eq!(found.break_patterns.break_count, 0);
    }

    #[test]
    fn test_completion_rate_stays_within_bounds() {
        let mixes = [(0, 3), (1, 3), (3, 3), (2, 7)];
        for (done, total) in mixes {
            let events: Vec<Event> = (0..total).map(|i| completion(i < done, None)).collect();
            let rate = metrics::task_completion_rate(&events);
            assert!((0.0..=1.0).contains(&rate), "rate {} out of bounds", rate);
            assert!((rate - done as f64 / total as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_average_task_time_ignores_missing_values() {
        let events = vec![
            completion(true, Some(30.0)),
            completion(true, None),
            completion(false, Some(60.0)),
        ];
        assert_eq!(metrics::average_task_time(&events), 45.0);
        assert_eq!(metrics::average_task_time(&[completion(true, None)]), 0.0);
    }

    #[test]
    fn test_focus_sessions_pair_markers_by_task() {
        let day = Utc.with_ymd_and_hms(2026, 4, 6, 9, 0, 0).unwrap();
        let events = vec![
            marker(day, "task_start", "a"),
            marker(day + Duration::minutes(10), "task_start", "b"),
            marker(day + Duration::minutes(40), "task_end", "b"),
            marker(day + Duration::minutes(90), "task_end", "a"),
            // never closed
            marker(day + Duration::hours(3), "task_start", "c"),
        ];

        // a: 90 minutes, b: 30 minutes
        assert!((metrics::focus_time_hours(&events) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_reaches_one_hundred_at_the_caps() {
        let config = AnalyticsConfig::default();
        assert_eq!(metrics::productivity_score(1.0, 8.0, 1.0, 20, &config), 100);
        assert_eq!(metrics::productivity_score(1.0, 40.0, 1.0, 500, &config), 100);
        assert_eq!(metrics::productivity_score(0.0, 0.0, 0.0, 0, &config), 0);
    }

    #[test]
    fn test_recommendations_follow_table_order() {
        let low = ProductivityMetrics {
            task_completion_rate: 0.5,
            focus_time: 1.0,
            ai_usage: analytics::AiUsageMetrics {
                daily_usage: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let patterns = BehaviorPatterns {
            peak_hours: vec!["09:00".to_string(), "14:00".to_string()],
            ..Default::default()
        };

        let kinds: Vec<RecommendationKind> =
            recommendations::generate(&low, &patterns, &AnalyticsConfig::default())
                .into_iter()
                .map(|r| r.kind)
                .collect();

        assert_eq!(
            kinds,
            vec![
                RecommendationKind::TaskDecomposition,
                RecommendationKind::TimeBlocking,
                RecommendationKind::PeakHourScheduling,
                RecommendationKind::AiAssistance,
            ]
        );
    }

    #[test]
    fn test_reports_from_the_same_slice_match() {
        let now = Utc::now();
        let events = vec![
            completion(true, Some(25.0)),
            completion(false, None),
            marker(now - Duration::hours(3), "task_start", "x"),
            marker(now - Duration::hours(2), "task_end", "x"),
            at(
                now - Duration::days(2),
                EventPayload::GoalProgress {
                    goal_id: "learn-rust".to_string(),
                    progress: 40.0,
                    started_at: Some(now - Duration::days(20)),
                },
            ),
        ];
        let slice = EventSlice::from_events(now, events);
        let engine = AnalyticsEngine::default();

        let first = engine.generate_report("alice", TimeRange::Week, &slice);
        let second = engine.generate_report("alice", TimeRange::Week, &slice);

        assert!(first.same_contents(&second));
        assert_eq!(first.metrics.task_completion_rate, 0.5);
        assert!((first.metrics.focus_time - 1.0).abs() < 1e-9);
        assert_eq!(first.predictions.goal_timelines.len(), 1);
        // 40% in 20 days -> 2%/day -> 30 days left
        assert_eq!(first.predictions.goal_timelines[0].remaining_days, Some(30));
    }
}
