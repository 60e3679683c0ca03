/// Behavioral patterns identified from an event slice
///
/// Pure functions over the same slice the metrics use: when a user works,
/// what they work on, and how they take breaks.

use chrono::{FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::chronological;
use crate::config::AnalyticsConfig;
use crate::domain::{Event, EventPayload};
use crate::storage::EventSlice;

/// Number of peak hours and preferred categories reported
const TOP_N: usize = 3;

/// Goal timeline statistics reported until goals carry lifecycle data
const PLACEHOLDER_TIMELINE_DAYS: u32 = 30;
const PLACEHOLDER_MILESTONE_HIT_RATE: f64 = 0.75;

/// Share of interactions in each part of the day, each 0 to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkRhythms {
    /// 06:00 to 12:00
    pub morning: f64,
    /// 12:00 to 18:00
    pub afternoon: f64,
    /// 18:00 to 24:00
    pub evening: f64,
}

/// Observed breaks plus the standing break recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BreakPatterns {
    pub average_break_minutes: f64,
    pub break_count: u32,
    pub recommended_interval_minutes: u32,
    pub recommended_duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GoalAchievementPatterns {
    /// Mean reported progress, 0 to 100
    pub average_progress: f64,
    pub goals_tracked: u32,
    pub typical_timeline_days: u32,
    pub milestone_hit_rate: f64,
}

/// Every pattern for one user and window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BehaviorPatterns {
    /// "HH:00" strings in ascending hour order
    pub peak_hours: Vec<String>,
    pub preferred_categories: Vec<String>,
    pub work_rhythms: WorkRhythms,
    pub break_patterns: BreakPatterns,
    pub goal_achievement: GoalAchievementPatterns,
}

/// Identify every pattern for a slice
pub fn identify(slice: &EventSlice, config: &AnalyticsConfig) -> BehaviorPatterns {
    BehaviorPatterns {
        peak_hours: peak_hours(&slice.interactions, config),
        preferred_categories: preferred_categories(&slice.completions),
        work_rhythms: work_rhythms(&slice.interactions, config),
        break_patterns: break_patterns(&slice.interactions, config),
        goal_achievement: goal_achievement(&slice.goals),
    }
}

/// Hour of day (0-23) of an event in the configured offset
pub fn local_hour(event: &Event, config: &AnalyticsConfig) -> u32 {
    let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    event.timestamp.with_timezone(&offset).hour()
}

fn hourly_counts(interactions: &[Event], config: &AnalyticsConfig) -> [u32; 24] {
    let mut counts = [0u32; 24];
    for event in interactions {
        counts[local_hour(event, config) as usize] += 1;
    }
    counts
}

/// Hours whose activity reaches the peak threshold of the busiest hour
///
/// Qualifying hours are ranked by count (earlier hour first on ties), the
/// top three are kept and reported in ascending hour order.
pub fn peak_hours(interactions: &[Event], config: &AnalyticsConfig) -> Vec<String> {
    let counts = hourly_counts(interactions, config);
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }

    let threshold = max as f64 * config.peak_threshold;
    let mut qualifying: Vec<usize> = (0..24).filter(|&h| counts[h] as f64 >= threshold).collect();
    qualifying.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
    qualifying.truncate(TOP_N);
    qualifying.sort_unstable();

    qualifying.into_iter().map(|h| format!("{:02}:00", h)).collect()
}

/// Most frequent task categories among completions
pub fn preferred_categories(completions: &[Event]) -> Vec<String> {
    let mut counts: Vec<(String, u32)> = Vec::new();
    for event in chronological(completions) {
        if let EventPayload::TaskCompletion { task_category: Some(category), .. } = &event.payload {
            let category = category.trim().to_lowercase();
            if category.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|(name, _)| *name == category) {
                Some((_, count)) => *count += 1,
                None => counts.push((category, 1)),
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(TOP_N).map(|(name, _)| name).collect()
}

/// Share of interactions in the morning, afternoon and evening
///
/// Night-time interactions (00:00 to 06:00) count towards the total but
/// towards none of the three parts.
pub fn work_rhythms(interactions: &[Event], config: &AnalyticsConfig) -> WorkRhythms {
    if interactions.is_empty() {
        return WorkRhythms::default();
    }

    let (mut morning, mut afternoon, mut evening) = (0u32, 0u32, 0u32);
    for event in interactions {
        match local_hour(event, config) {
            6..=11 => morning += 1,
            12..=17 => afternoon += 1,
            18..=23 => evening += 1,
            _ => {}
        }
    }

    let total = interactions.len() as f64;
    WorkRhythms {
        morning: morning as f64 / total,
        afternoon: afternoon as f64 / total,
        evening: evening as f64 / total,
    }
}

/// Gaps between consecutive interactions longer than the break threshold
pub fn break_patterns(interactions: &[Event], config: &AnalyticsConfig) -> BreakPatterns {
    let ordered = chronological(interactions);
    let gap_threshold = chrono::Duration::minutes(config.break_gap_minutes);

    let breaks: Vec<f64> = ordered
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .filter(|gap| *gap > gap_threshold)
        .map(|gap| gap.num_seconds() as f64 / 60.0)
        .collect();

    let average_break_minutes = if breaks.is_empty() {
        0.0
    } else {
        breaks.iter().sum::<f64>() / breaks.len() as f64
    };

    BreakPatterns {
        average_break_minutes,
        break_count: breaks.len() as u32,
        recommended_interval_minutes: config.recommended_break_interval_minutes,
        recommended_duration_minutes: config.recommended_break_duration_minutes,
    }
}

/// Average goal progress plus placeholder milestone statistics
pub fn goal_achievement(goals: &[Event]) -> GoalAchievementPatterns {
    let mut ids: Vec<&str> = Vec::new();
    let mut progress = Vec::new();
    for event in goals {
        if let EventPayload::GoalProgress { goal_id, progress: p, .. } = &event.payload {
            progress.push(*p);
            if !ids.contains(&goal_id.as_str()) {
                ids.push(goal_id);
            }
        }
    }

    if progress.is_empty() {
        return GoalAchievementPatterns::default();
    }

    GoalAchievementPatterns {
        average_progress: progress.iter().sum::<f64>() / progress.len() as f64,
        goals_tracked: ids.len() as u32,
        typical_timeline_days: PLACEHOLDER_TIMELINE_DAYS,
        milestone_hit_rate: PLACEHOLDER_MILESTONE_HIT_RATE,
    }
}
