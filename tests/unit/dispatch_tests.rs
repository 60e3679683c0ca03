/// AI dispatcher unit tests: rate limiting, retries and fallback
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use insight_engine_mcp::config::DispatchConfig;
use insight_engine_mcp::dispatch::{
    parse_task, CompletionError, CompletionRequest, CompletionService, FeatureRegistry,
};
use insight_engine_mcp::*;

#[cfg(test)]
mod dispatch_unit_tests {
    use super::*;

    /// Fails a fixed number of times, then answers
    struct ScriptedService {
        failures: u32,
        calls: AtomicU32,
    }

    impl ScriptedService {
        fn failing(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(CompletionError::Api {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            Ok(format!("answer for {}", request.feature_id))
        }
    }

    /// Never answers within the request timeout
    struct StalledService;

    #[async_trait]
    impl CompletionService for StalledService {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    fn config(max_requests: u32, window_ms: u64) -> DispatchConfig {
        DispatchConfig {
            max_requests_per_window: max_requests,
            window_ms,
            base_delay_ms: 5,
            request_timeout_ms: 100,
            ..DispatchConfig::default()
        }
    }

    #[test]
    fn test_natural_language_task_example() {
        let today = Utc::now().date_naive();
        let task = parse_task("Schedule a workout tomorrow at 9am #health", today);

        assert_eq!(task.category, "health");
        assert_eq!(task.due_date, today.succ_opt());
        for tag in ["health", "schedule", "workout"] {
            assert!(task.tags.iter().any(|t| t == tag), "missing tag {}", tag);
        }
    }

    #[tokio::test]
    async fn test_two_failures_then_success_counts_once() {
        let service = ScriptedService::failing(2);
        let dispatcher = AiDispatcher::new(config(10, 60_000), FeatureRegistry::default(), Some(service.clone()));

        let response = dispatcher
            .dispatch("project_planning", "Ship the beta", serde_json::json!({ "team": 3 }))
            .await
            .expect("third attempt succeeds");

        assert!(response.success);
        assert_eq!(response.source, DispatchSource::Service);
        assert_eq!(response.attempts, 3);
        assert_eq!(response.result, "answer for project_planning");
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.rate_limiter().used(), 1);
    }

    #[tokio::test]
    async fn test_cap_plus_one_is_rejected_until_the_window_elapses() {
        let dispatcher = AiDispatcher::new(config(3, 80), FeatureRegistry::default(), None);

        for _ in 0..3 {
            dispatcher
                .dispatch("goal_analysis", "Learn piano", serde_json::Value::Null)
                .await
                .expect("within the cap");
        }

        let rejected = dispatcher
            .dispatch("goal_analysis", "Learn piano", serde_json::Value::Null)
            .await;
        match rejected {
            Err(DispatchError::RateLimitExceeded { retry_after }) => {
                assert!(retry_after <= Duration::from_millis(80));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert!(!dispatcher.can_dispatch());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(dispatcher
            .dispatch("goal_analysis", "Learn piano", serde_json::Value::Null)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_timeouts_count_as_failed_attempts() {
        let cfg = DispatchConfig {
            retry_attempts: 2,
            ..config(10, 60_000)
        };
        let dispatcher = AiDispatcher::new(cfg, FeatureRegistry::default(), Some(Arc::new(StalledService)));

        let response = dispatcher
            .dispatch("time_management", "Too many meetings", serde_json::Value::Null)
            .await
            .unwrap();

        assert_eq!(response.source, DispatchSource::Fallback);
        assert_eq!(response.attempts, 2);
        assert_eq!(response.confidence, Some(0.7));
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_share_one_budget() {
        let dispatcher = Arc::new(AiDispatcher::new(config(10, 60_000), FeatureRegistry::default(), None));

        let calls = (0..25).map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                dispatcher
                    .dispatch("habit_coaching", &format!("habit {}", i), serde_json::Value::Null)
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let limited = results
            .iter()
            .filter(|r| matches!(r, Err(DispatchError::RateLimitExceeded { .. })))
            .count();
        assert_eq!(admitted, 10);
        assert_eq!(limited, 15);
    }

    #[test]
    fn test_fallback_dispatch_from_blocking_code() {
        let dispatcher = AiDispatcher::new(config(10, 60_000), FeatureRegistry::default(), None);
        let response = tokio_test::block_on(dispatcher.dispatch(
            "natural_language_task",
            "Pay the electricity bill today",
            serde_json::Value::Null,
        ))
        .unwrap();

        assert_eq!(response.source, DispatchSource::Fallback);
        assert_eq!(response.result["category"], "finance");
        assert_eq!(
            response.result["due_date"],
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );
    }
}
