/// Insight report bundling metrics, patterns, recommendations and predictions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{BehaviorPatterns, Predictions, ProductivityMetrics, Recommendation};
use crate::domain::TimeRange;

/// Insights for one user and time range
///
/// Reports are immutable; every generation produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub user_id: String,
    pub time_range: TimeRange,
    pub window_start: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub metrics: ProductivityMetrics,
    pub patterns: BehaviorPatterns,
    pub recommendations: Vec<Recommendation>,
    pub predictions: Predictions,
}

impl InsightReport {
    /// Compare everything except the timestamps of the report itself
    pub fn same_contents(&self, other: &InsightReport) -> bool {
        self.user_id == other.user_id
            && self.time_range == other.time_range
            && self.metrics == other.metrics
            && self.patterns == other.patterns
            && self.recommendations == other.recommendations
            && self.predictions == other.predictions
    }

    /// Short plain-text rendering for chat clients
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Productivity score: {}/100 ({:?}, generated {})",
                self.metrics.productivity_score,
                self.time_range,
                self.generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
            format!(
                "Task completion: {:.0}% | Focus: {:.1}h | Goal progress: {:.0}% | AI uses: {}",
                self.metrics.task_completion_rate * 100.0,
                self.metrics.focus_time,
                self.metrics.goal_progress_rate * 100.0,
                self.metrics.ai_usage.daily_usage
            ),
        ];

        if !self.patterns.peak_hours.is_empty() {
            lines.push(format!("Peak hours: {}", self.patterns.peak_hours.join(", ")));
        }

        lines.push(format!(
            "Trend: {:?} ({} points)",
            self.predictions.productivity_trend.direction,
            self.predictions.productivity_trend.magnitude
        ));

        for recommendation in &self.recommendations {
            lines.push(format!(
                "- [{:?}] {}: {}",
                recommendation.priority, recommendation.title, recommendation.description
            ));
        }

        lines.join("\n")
    }
}
