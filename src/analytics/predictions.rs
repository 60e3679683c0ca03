/// Heuristic predictions
///
/// Simple extrapolations over recent versus longer-term activity. None of
/// this is a fitted model; the confidence reported is a fixed constant.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{metrics, BehaviorPatterns};
use crate::config::AnalyticsConfig;
use crate::domain::EventPayload;
use crate::storage::EventSlice;

pub const WEEK_DAYS: i64 = 7;
pub const MONTH_DAYS: i64 = 30;

const DEFAULT_START: &str = "09:00";
const DEFAULT_END: &str = "17:00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionForecast {
    pub predicted_rate: f64,
    pub confidence: f64,
}

/// Projected finish for one goal
///
/// `remaining_days` is None when no rate can be derived yet (no progress,
/// or no time elapsed since the goal started).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalForecast {
    pub goal_id: String,
    pub current_progress: f64,
    pub days_since_start: i64,
    pub remaining_days: Option<u32>,
    pub estimated_completion: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityTrend {
    pub direction: TrendDirection,
    /// Absolute score difference between the weekly and monthly windows
    pub magnitude: u32,
    pub weekly_score: u32,
    pub monthly_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusBlock {
    pub start: String,
    pub end: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub start: String,
    pub end: String,
    pub focus_blocks: Vec<FocusBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub weekly_task_completion: CompletionForecast,
    pub goal_timelines: Vec<GoalForecast>,
    pub productivity_trend: ProductivityTrend,
    pub optimal_schedule: WorkSchedule,
}

/// Build every prediction
///
/// `history` must reach back at least a month from `now` for the trend to
/// compare like with like.
pub fn predict(
    history: &EventSlice,
    patterns: &BehaviorPatterns,
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Predictions {
    let week = history.since(now - Duration::days(WEEK_DAYS));
    let month = history.since(now - Duration::days(MONTH_DAYS));

    Predictions {
        weekly_task_completion: weekly_task_completion(&week, config),
        goal_timelines: goal_timelines(history, now),
        productivity_trend: productivity_trend(&week, &month, config),
        optimal_schedule: optimal_schedule(patterns),
    }
}

/// Last week's completion rate with a fixed uplift, capped at 1
pub fn weekly_task_completion(week: &EventSlice, config: &AnalyticsConfig) -> CompletionForecast {
    let rate = metrics::task_completion_rate(&week.completions);
    CompletionForecast {
        predicted_rate: (rate * config.completion_uplift).min(1.0),
        confidence: config.prediction_confidence,
    }
}

/// Days left for each goal at its current average pace
pub fn goal_timelines(history: &EventSlice, now: DateTime<Utc>) -> Vec<GoalForecast> {
    struct GoalState {
        progress: f64,
        started: DateTime<Utc>,
    }

    let mut goals: BTreeMap<&str, GoalState> = BTreeMap::new();
    for event in &history.goals {
        if let EventPayload::GoalProgress { goal_id, progress, started_at } = &event.payload {
            let start = started_at.unwrap_or(event.timestamp);
            let state = goals.entry(goal_id.as_str()).or_insert(GoalState {
                progress: *progress,
                started: start,
            });
            // slice is oldest first, so the last update wins
            state.progress = *progress;
            state.started = state.started.min(start);
        }
    }

    goals
        .into_iter()
        .map(|(goal_id, state)| {
            let days_since_start = (now - state.started).num_days();
            let remaining_days = remaining_days(state.progress, days_since_start);
            GoalForecast {
                goal_id: goal_id.to_string(),
                current_progress: state.progress,
                days_since_start,
                remaining_days,
                estimated_completion: remaining_days
                    .map(|days| now.date_naive() + Duration::days(days as i64)),
            }
        })
        .collect()
}

/// `ceil((100 - progress) / (progress / days))`, None when the rate is undefined
pub fn remaining_days(progress: f64, days_since_start: i64) -> Option<u32> {
    if progress >= 100.0 {
        return Some(0);
    }
    if progress <= 0.0 || days_since_start <= 0 {
        return None;
    }
    let daily_rate = progress / days_since_start as f64;
    Some(((100.0 - progress) / daily_rate).ceil() as u32)
}

/// Compare the weekly and monthly productivity scores
pub fn productivity_trend(
    week: &EventSlice,
    month: &EventSlice,
    config: &AnalyticsConfig,
) -> ProductivityTrend {
    let weekly_score = metrics::calculate(week, config).productivity_score;
    let monthly_score = metrics::calculate(month, config).productivity_score;
    let difference = weekly_score as i64 - monthly_score as i64;

    let direction = match difference {
        d if d > 0 => TrendDirection::Increasing,
        d if d < 0 => TrendDirection::Decreasing,
        _ => TrendDirection::Stable,
    };

    ProductivityTrend {
        direction,
        magnitude: difference.unsigned_abs() as u32,
        weekly_score,
        monthly_score,
    }
}

/// Working day bounded by the first and last peak hour, with two fixed focus blocks
pub fn optimal_schedule(patterns: &BehaviorPatterns) -> WorkSchedule {
    let start = patterns.peak_hours.first().map(String::as_str).unwrap_or(DEFAULT_START);
    let end = patterns.peak_hours.last().map(String::as_str).unwrap_or(DEFAULT_END);

    WorkSchedule {
        start: start.to_string(),
        end: end.to_string(),
        focus_blocks: vec![
            FocusBlock {
                start: "09:00".to_string(),
                end: "11:00".to_string(),
                label: "Deep work".to_string(),
            },
            FocusBlock {
                start: "14:00".to_string(),
                end: "16:00".to_string(),
                label: "Project work".to_string(),
            },
        ],
    }
}
