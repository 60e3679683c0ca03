/// Productivity metrics calculated from an event slice
///
/// Every function here is pure and returns zero for empty input; a new user
/// with no data is the common case, not an error.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::chronological;
use crate::config::AnalyticsConfig;
use crate::domain::{Event, EventPayload, TASK_END, TASK_START};
use crate::storage::EventSlice;

/// Number of intents reported in `AiUsageMetrics::top_intents`
const TOP_INTENTS: usize = 5;

/// How often an intent showed up in AI usage events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCount {
    pub intent: String,
    pub count: u32,
}

/// AI assistant usage summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AiUsageMetrics {
    /// Number of AI usage events in the window
    pub daily_usage: u32,
    /// Mean reported satisfaction, 0 when nobody rated
    pub average_satisfaction: f64,
    /// Most frequent intents, most frequent first
    pub top_intents: Vec<IntentCount>,
}

/// Scalar productivity metrics for one user and window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProductivityMetrics {
    /// Completed tasks over closed tasks, 0 to 1
    pub task_completion_rate: f64,
    /// Mean minutes spent per task, over tasks that reported it
    pub average_task_time: f64,
    /// Hours spent in paired task_start/task_end sessions
    pub focus_time: f64,
    /// Mean goal progress, 0 to 1
    pub goal_progress_rate: f64,
    pub ai_usage: AiUsageMetrics,
    /// Weighted composite, 0 to 100
    pub productivity_score: u32,
}

/// Calculate every metric for a slice
pub fn calculate(slice: &EventSlice, config: &AnalyticsConfig) -> ProductivityMetrics {
    let task_completion_rate = task_completion_rate(&slice.completions);
    let focus_time = focus_time_hours(&slice.interactions);
    let goal_progress_rate = goal_progress_rate(&slice.goals);
    let ai_usage = ai_usage_metrics(&slice.ai_usage);

    let productivity_score = productivity_score(
        task_completion_rate,
        focus_time,
        goal_progress_rate,
        ai_usage.daily_usage,
        config,
    );

    ProductivityMetrics {
        task_completion_rate,
        average_task_time: average_task_time(&slice.completions),
        focus_time,
        goal_progress_rate,
        ai_usage,
        productivity_score,
    }
}

/// Share of task completion events that carry a completion timestamp
pub fn task_completion_rate(completions: &[Event]) -> f64 {
    let mut total = 0usize;
    let mut completed = 0usize;
    for event in completions {
        if let EventPayload::TaskCompletion { completed_at, .. } = &event.payload {
            total += 1;
            if completed_at.is_some() {
                completed += 1;
            }
        }
    }

    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

/// Mean time spent per task, ignoring tasks that did not report it
pub fn average_task_time(completions: &[Event]) -> f64 {
    let reported: Vec<f64> = completions
        .iter()
        .filter_map(|event| match &event.payload {
            EventPayload::TaskCompletion { time_spent_minutes, .. } => *time_spent_minutes,
            _ => None,
        })
        .collect();

    mean(&reported)
}

/// Total focus time in hours
///
/// Sessions are opened by a `task_start` interaction and closed by the next
/// `task_end` for the same task id. A second start before an end replaces
/// the first; starts that are never closed are dropped.
pub fn focus_time_hours(interactions: &[Event]) -> f64 {
    let mut open: HashMap<Option<&str>, DateTime<Utc>> = HashMap::new();
    let mut total = Duration::zero();

    for event in chronological(interactions) {
        if let EventPayload::Interaction { action, task_id, .. } = &event.payload {
            let key = task_id.as_deref();
            match action.as_str() {
                TASK_START => {
                    open.insert(key, event.timestamp);
                }
                TASK_END => {
                    if let Some(started) = open.remove(&key) {
                        total = total + (event.timestamp - started);
                    }
                }
                _ => {}
            }
        }
    }

    total.num_milliseconds().max(0) as f64 / 3_600_000.0
}

/// Mean goal progress scaled to 0-1
pub fn goal_progress_rate(goals: &[Event]) -> f64 {
    let progress: Vec<f64> = goals
        .iter()
        .filter_map(|event| match &event.payload {
            EventPayload::GoalProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();

    mean(&progress) / 100.0
}

/// Usage count, mean satisfaction and the most frequent intents
///
/// Intents with equal counts keep the order they were first seen in.
pub fn ai_usage_metrics(ai_usage: &[Event]) -> AiUsageMetrics {
    let mut daily_usage = 0u32;
    let mut ratings = Vec::new();
    let mut intents: Vec<IntentCount> = Vec::new();

    for event in chronological(ai_usage) {
        if let EventPayload::AiUsage { intent, satisfaction, .. } = &event.payload {
            daily_usage += 1;
            if let Some(score) = satisfaction {
                ratings.push(*score);
            }
            if let Some(intent) = intent.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
                match intents.iter_mut().find(|c| c.intent == intent) {
                    Some(existing) => existing.count += 1,
                    None => intents.push(IntentCount {
                        intent: intent.to_string(),
                        count: 1,
                    }),
                }
            }
        }
    }

    // stable sort keeps first-seen order among ties
    intents.sort_by(|a, b| b.count.cmp(&a.count));
    intents.truncate(TOP_INTENTS);

    AiUsageMetrics {
        daily_usage,
        average_satisfaction: mean(&ratings),
        top_intents: intents,
    }
}

/// Weighted 0-100 composite of the four headline metrics
pub fn productivity_score(
    task_completion_rate: f64,
    focus_time: f64,
    goal_progress_rate: f64,
    daily_usage: u32,
    config: &AnalyticsConfig,
) -> u32 {
    let weights = &config.weights;
    let focus = focus_time.min(config.focus_cap_hours) / config.focus_cap_hours;
    let usage = (daily_usage as f64).min(config.usage_cap) / config.usage_cap;

    let composite = weights.task_completion * task_completion_rate
        + weights.focus * focus
        + weights.goal_progress * goal_progress_rate
        + weights.ai_usage * usage;

    (100.0 * composite).round().clamp(0.0, 100.0) as u32
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventId;

    fn at(minutes_ago: i64, payload: EventPayload) -> Event {
        Event::from_existing(
            EventId::new(),
            payload,
            Utc::now() - Duration::minutes(minutes_ago),
            Some("u1".to_string()),
            None,
        )
    }

    fn completion(done: bool, minutes: Option<f64>) -> EventPayload {
        EventPayload::TaskCompletion {
            task_id: None,
            task_category: Some("work".to_string()),
            completed_at: if done { Some(Utc::now()) } else { None },
            time_spent_minutes: minutes,
        }
    }

    fn marker(action: &str, task: &str) -> EventPayload {
        EventPayload::Interaction {
            action: action.to_string(),
            task_id: Some(task.to_string()),
            target: None,
        }
    }

    fn usage(intent: Option<&str>, satisfaction: Option<f64>) -> EventPayload {
        EventPayload::AiUsage {
            feature: None,
            intent: intent.map(str::to_string),
            satisfaction,
        }
    }

    #[test]
    fn test_empty_slice_scores_zero() {
        let slice = EventSlice::from_events(Utc::now(), Vec::new());
        let metrics = calculate(&slice, &AnalyticsConfig::default());

        assert_eq!(metrics.task_completion_rate, 0.0);
        assert_eq!(metrics.goal_progress_rate, 0.0);
        assert_eq!(metrics.focus_time, 0.0);
        assert_eq!(metrics.ai_usage.daily_usage, 0);
        assert_eq!(metrics.productivity_score, 0);
    }

    #[test]
    fn test_completion_rate_and_average_time() {
        let events = vec![
            at(30, completion(true, Some(20.0))),
            at(20, completion(false, None)),
            at(10, completion(true, Some(40.0))),
            at(5, completion(true, None)),
        ];

        assert_eq!(task_completion_rate(&events), 0.75);
        assert_eq!(average_task_time(&events), 30.0);
    }

    #[test]
    fn test_focus_pairs_markers_and_drops_unmatched_starts() {
        let events = vec![
            at(180, marker(TASK_START, "a")),
            at(120, marker(TASK_END, "a")),
            // interleaved task b: 30 minutes
            at(100, marker(TASK_START, "b")),
            at(70, marker(TASK_END, "b")),
            // never closed
            at(60, marker(TASK_START, "c")),
            // end without a start
            at(50, marker(TASK_END, "d")),
        ];

        let hours = focus_time_hours(&events);
        assert!((hours - 1.5).abs() < 1e-9, "got {}", hours);
    }

    #[test]
    fn test_goal_progress_rate_is_scaled() {
        let goal = |p: f64| EventPayload::GoalProgress {
            goal_id: "g".to_string(),
            progress: p,
            started_at: None,
        };
        let events = vec![at(10, goal(20.0)), at(5, goal(60.0))];
        assert!((goal_progress_rate(&events) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_top_intents_break_ties_by_first_seen() {
        let events = vec![
            at(70, usage(Some("plan"), Some(4.0))),
            at(60, usage(Some("summarize"), None)),
            at(50, usage(Some("draft"), Some(2.0))),
            at(40, usage(Some("summarize"), None)),
            at(30, usage(Some("plan"), None)),
            at(25, usage(Some("e"), None)),
            at(20, usage(Some("f"), None)),
            at(15, usage(Some("g"), None)),
            at(10, usage(None, None)),
        ];

        let metrics = ai_usage_metrics(&events);
        assert_eq!(metrics.daily_usage, 9);
        assert_eq!(metrics.average_satisfaction, 3.0);
        let names: Vec<_> = metrics.top_intents.iter().map(|c| c.intent.as_str()).collect();
        assert_eq!(names, vec!["plan", "summarize", "draft", "e", "f"]);
    }

    #[test]
    fn test_score_weights_saturate() {
        let config = AnalyticsConfig::default();
        assert_eq!(productivity_score(1.0, 12.0, 1.0, 40, &config), 100);
        assert_eq!(productivity_score(1.0, 0.0, 0.0, 0, &config), 30);
        assert_eq!(productivity_score(1.0, 8.0, 0.0, 0, &config), 55);
    }
}
