/// Analytics engine for generating insight reports
///
/// This module turns an event slice into metrics, behavioral patterns,
/// rule-based recommendations and heuristic predictions, and bundles them
/// into a timestamped report.

pub mod metrics;
pub mod patterns;
pub mod predictions;
pub mod recommendations;
pub mod report;

pub use metrics::{AiUsageMetrics, IntentCount, ProductivityMetrics};
pub use patterns::{BehaviorPatterns, BreakPatterns, GoalAchievementPatterns, WorkRhythms};
pub use predictions::{
    CompletionForecast, FocusBlock, GoalForecast, Predictions, ProductivityTrend, TrendDirection,
    WorkSchedule,
};
pub use recommendations::{Priority, Recommendation, RecommendationKind};
pub use report::InsightReport;

use chrono::{Duration, Utc};

use crate::config::AnalyticsConfig;
use crate::domain::{Event, TimeRange};
use crate::storage::EventSlice;

/// Events ordered oldest first, without cloning them
pub(crate) fn chronological(events: &[Event]) -> Vec<&Event> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);
    ordered
}

/// Analytics engine for processing event slices
///
/// Stateless apart from its configuration; safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Create a new analytics engine
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// How far back a slice must reach to report on `range`
    ///
    /// Predictions compare the last week against the last month, so the
    /// slice always covers at least a month.
    pub fn lookback(range: TimeRange) -> Duration {
        range.duration().max(Duration::days(predictions::MONTH_DAYS))
    }

    /// Generate a report for one user
    ///
    /// Metrics, patterns and recommendations cover `range`; predictions use
    /// the whole slice. `slice.taken_at` is treated as "now".
    pub fn generate_report(&self, user_id: &str, range: TimeRange, slice: &EventSlice) -> InsightReport {
        let now = slice.taken_at;
        let window_start = now - range.duration();
        let window = slice.since(window_start);

        let metrics = metrics::calculate(&window, &self.config);
        let patterns = patterns::identify(&window, &self.config);
        let recommendations = recommendations::generate(&metrics, &patterns, &self.config);
        let predictions = predictions::predict(slice, &patterns, &self.config, now);

        tracing::debug!(
            user_id,
            events = window.len(),
            score = metrics.productivity_score,
            recommendations = recommendations.len(),
            "Generated insight report"
        );

        InsightReport {
            user_id: user_id.to_string(),
            time_range: range,
            window_start,
            generated_at: Utc::now(),
            metrics,
            patterns,
            recommendations,
            predictions,
        }
    }
}
