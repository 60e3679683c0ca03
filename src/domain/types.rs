/// Core types and enums used throughout the domain layer
///
/// This module defines the fundamental types like EventCategory, TimeRange and ID types
/// that are used by Event and the analytics reports.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a recorded event
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass an event ID where a user or session ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an event ID from a string (useful for snapshot loading)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categories of recorded user activity
///
/// Each category owns its own ordered collection inside the event store and
/// has a known payload shape (see `EventPayload`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Generic UI interactions, including `task_start`/`task_end` focus markers
    Interaction,
    /// A task was completed (or closed without completion)
    TaskCompletion,
    /// Progress update on a goal
    GoalProgress,
    /// A use of the AI assistant
    AiUsage,
}

impl EventCategory {
    /// Every category, in the order they are stored and snapshotted
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Interaction,
        EventCategory::TaskCompletion,
        EventCategory::GoalProgress,
        EventCategory::AiUsage,
    ];

    /// Stable snake_case name used as the snapshot key
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Interaction => "interaction",
            EventCategory::TaskCompletion => "task_completion",
            EventCategory::GoalProgress => "goal_progress",
            EventCategory::AiUsage => "ai_usage",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interaction" => Ok(EventCategory::Interaction),
            "task_completion" => Ok(EventCategory::TaskCompletion),
            "goal_progress" => Ok(EventCategory::GoalProgress),
            "ai_usage" => Ok(EventCategory::AiUsage),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

/// Analysis window for an insight report
///
/// The window always ends at the moment the report is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Last 24 hours
    Day,
    /// Last 7 days
    Week,
    /// Last 30 days
    #[default]
    Month,
    /// Last 90 days
    Quarter,
}

impl TimeRange {
    /// Length of the window
    pub fn duration(&self) -> Duration {
        Duration::days(self.days())
    }

    /// Length of the window in whole days
    pub fn days(&self) -> i64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
        }
    }
}

impl FromStr for TimeRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "1d" | "today" => Ok(TimeRange::Day),
            "week" | "7d" => Ok(TimeRange::Week),
            "month" | "30d" => Ok(TimeRange::Month),
            "quarter" | "90d" => Ok(TimeRange::Quarter),
            other => Err(DomainError::InvalidTimeRange(other.to_string())),
        }
    }
}
