/// Rule-based recommendations
///
/// A flat rule table evaluated in a fixed order. Every rule is independent,
/// fires at most once per report, and emission order is evaluation order.

use serde::{Deserialize, Serialize};

use crate::analytics::{BehaviorPatterns, ProductivityMetrics};
use crate::config::AnalyticsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Which rule produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    TaskDecomposition,
    TimeBlocking,
    PeakHourScheduling,
    AiAssistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
}

/// Evaluate the rule table against one report's metrics and patterns
pub fn generate(
    metrics: &ProductivityMetrics,
    patterns: &BehaviorPatterns,
    config: &AnalyticsConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if metrics.task_completion_rate < config.low_completion_threshold {
        recommendations.push(Recommendation {
            kind: RecommendationKind::TaskDecomposition,
            priority: Priority::High,
            title: "Break tasks into smaller pieces".to_string(),
            description: format!(
                "You complete {:.0}% of your tasks. Smaller, concrete steps are easier to finish.",
                metrics.task_completion_rate * 100.0
            ),
            actions: vec![
                "Split each large task into steps of under an hour".to_string(),
                "Give every step a clear definition of done".to_string(),
            ],
        });
    }

    if metrics.focus_time < config.low_focus_hours {
        recommendations.push(Recommendation {
            kind: RecommendationKind::TimeBlocking,
            priority: Priority::Medium,
            title: "Block time for focused work".to_string(),
            description: format!(
                "You logged {:.1} hours of focused work. Reserving blocks on your calendar protects it.",
                metrics.focus_time
            ),
            actions: vec![
                "Schedule two 90-minute focus blocks per day".to_string(),
                "Silence notifications during focus blocks".to_string(),
            ],
        });
    }

    if !patterns.peak_hours.is_empty() {
        recommendations.push(Recommendation {
            kind: RecommendationKind::PeakHourScheduling,
            priority: Priority::Medium,
            title: "Use your peak hours".to_string(),
            description: format!(
                "You are most active around {}. Move high-priority work into those hours.",
                patterns.peak_hours.join(", ")
            ),
            actions: vec![
                "Plan your most important task for your first peak hour".to_string(),
                "Keep meetings and admin outside peak hours".to_string(),
            ],
        });
    }

    if metrics.ai_usage.daily_usage < config.low_ai_usage {
        recommendations.push(Recommendation {
            kind: RecommendationKind::AiAssistance,
            priority: Priority::Low,
            title: "Let the assistant help".to_string(),
            description: "The AI assistant can turn notes into tasks and plan your week.".to_string(),
            actions: vec![
                "Try creating a task from a plain sentence".to_string(),
                "Ask for a weekly plan based on your goals".to_string(),
            ],
        });
    }

    recommendations
}
