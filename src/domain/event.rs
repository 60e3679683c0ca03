/// Event entity for recorded user activity
///
/// This module defines the immutable Event record and its category-specific
/// payload. Events are created by the event store, never mutated, and only
/// removed by retention compaction.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, EventCategory, EventId};

/// Interaction action that opens a focus session
pub const TASK_START: &str = "task_start";
/// Interaction action that closes a focus session
pub const TASK_END: &str = "task_end";

/// Category-specific event data
///
/// The payload is a tagged union keyed by category so every category has a
/// known field set. Unknown fields are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EventPayload {
    /// A UI interaction such as opening a screen or starting a task
    Interaction {
        /// What happened (`task_start` and `task_end` delimit focus sessions)
        action: String,
        /// Task the interaction belongs to, used to pair focus markers
        #[serde(default)]
        task_id: Option<String>,
        /// Screen or element the interaction touched
        #[serde(default)]
        target: Option<String>,
    },
    /// A task was closed
    TaskCompletion {
        #[serde(default)]
        task_id: Option<String>,
        /// Task category (work, health, ...)
        #[serde(default)]
        task_category: Option<String>,
        /// Set when the task was actually completed
        #[serde(default)]
        completed_at: Option<DateTime<Utc>>,
        /// Time spent on the task in minutes
        #[serde(default)]
        time_spent_minutes: Option<f64>,
    },
    /// A progress update on a goal
    GoalProgress {
        goal_id: String,
        /// Percentage complete, 0 to 100
        progress: f64,
        /// When work on the goal began
        #[serde(default)]
        started_at: Option<DateTime<Utc>>,
    },
    /// A use of the AI assistant
    AiUsage {
        #[serde(default)]
        feature: Option<String>,
        /// What the user was trying to do
        #[serde(default)]
        intent: Option<String>,
        /// Satisfaction rating, 0 to 5
        #[serde(default)]
        satisfaction: Option<f64>,
    },
}

impl EventPayload {
    /// The category this payload belongs to
    pub fn category(&self) -> EventCategory {
        match self {
            EventPayload::Interaction { .. } => EventCategory::Interaction,
            EventPayload::TaskCompletion { .. } => EventCategory::TaskCompletion,
            EventPayload::GoalProgress { .. } => EventCategory::GoalProgress,
            EventPayload::AiUsage { .. } => EventCategory::AiUsage,
        }
    }

    /// Check numeric fields at the boundary
    ///
    /// Shapes are guaranteed by the type; this rejects values the analytics
    /// would otherwise silently skew on (NaN, negative durations, progress
    /// outside 0-100).
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            EventPayload::Interaction { action, .. } => {
                if action.trim().is_empty() {
                    return Err(DomainError::InvalidPayload {
                        message: "Interaction action cannot be empty".to_string(),
                    });
                }
            }
            EventPayload::TaskCompletion { time_spent_minutes, .. } => {
                if let Some(minutes) = time_spent_minutes {
                    if !minutes.is_finite() || *minutes < 0.0 {
                        return Err(DomainError::InvalidPayload {
                            message: format!("Time spent must be a non-negative number, got {}", minutes),
                        });
                    }
                }
            }
            EventPayload::GoalProgress { goal_id, progress, .. } => {
                if goal_id.trim().is_empty() {
                    return Err(DomainError::InvalidPayload {
                        message: "Goal progress requires a goal_id".to_string(),
                    });
                }
                if !progress.is_finite() || *progress < 0.0 || *progress > 100.0 {
                    return Err(DomainError::InvalidPayload {
                        message: format!("Goal progress must be between 0 and 100, got {}", progress),
                    });
                }
            }
            EventPayload::AiUsage { satisfaction, .. } => {
                if let Some(score) = satisfaction {
                    if !score.is_finite() || *score < 0.0 || *score > 5.0 {
                        return Err(DomainError::InvalidPayload {
                            message: format!("Satisfaction must be between 0 and 5, got {}", score),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// An immutable timestamped record of something a user did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub category: EventCategory,
    pub payload: EventPayload,
    /// Set by the store at record time, never by the caller
    pub timestamp: DateTime<Utc>,
    /// Events without a user are global and visible to every user
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl Event {
    /// Create a new event stamped with a fresh id and the current time
    pub(crate) fn new(
        payload: EventPayload,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Self, DomainError> {
        payload.validate()?;

        Ok(Self {
            id: EventId::new(),
            category: payload.category(),
            payload,
            timestamp: Utc::now(),
            user_id,
            session_id,
        })
    }

    /// Create an event from existing data (used when restoring snapshots)
    ///
    /// This constructor assumes data was validated when first recorded.
    pub fn from_existing(
        id: EventId,
        payload: EventPayload,
        timestamp: DateTime<Utc>,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            id,
            category: payload.category(),
            payload,
            timestamp,
            user_id,
            session_id,
        }
    }

    /// Whether this event is visible to the given user
    pub fn is_visible_to(&self, user_id: Option<&str>) -> bool {
        match (user_id, self.user_id.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(owner)) => wanted == owner,
        }
    }
}
