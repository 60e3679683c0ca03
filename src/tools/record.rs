/// Tools for recording and querying events
///
/// This module implements the event_record and event_query MCP tools.

use chrono::{Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Event, EventCategory, EventPayload};
use crate::orchestrator::InsightOrchestrator;

/// Parameters for recording an event
///
/// `category` selects which payload fields apply.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordEventParams {
    #[serde(flatten)]
    pub event: EventPayload,
    /// User the event belongs to; omit for global events
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// Response from recording an event
#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    pub success: bool,
    pub message: String,
    pub event_id: String,
    pub category: EventCategory,
}

/// Record an event in the store
pub fn record_event(
    orchestrator: &InsightOrchestrator,
    params: RecordEventParams,
) -> Result<RecordEventResponse, DomainError> {
    let event = orchestrator.record(params.event, params.user_id, params.session_id)?;

    Ok(RecordEventResponse {
        success: true,
        message: format!("Recorded {} event {}", event.category, event.id),
        event_id: event.id.to_string(),
        category: event.category,
    })
}

/// Parameters for querying events
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryEventsParams {
    /// interaction, task_completion, goal_progress or ai_usage
    pub category: String,
    pub user_id: Option<String>,
    /// Only events from the last N days
    pub since_days: Option<i64>,
    /// Maximum number of events returned (default 50)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryEventsResponse {
    pub total: usize,
    pub events: Vec<Event>,
}

/// Events of one category, most recent first
pub fn query_events(
    orchestrator: &InsightOrchestrator,
    params: QueryEventsParams,
) -> Result<QueryEventsResponse, DomainError> {
    let category: EventCategory = params.category.parse()?;
    let since = match params.since_days {
        Some(days) if days < 0 => {
            return Err(DomainError::InvalidTimeRange(format!("since_days must not be negative, got {}", days)))
        }
        Some(days) => Some(Utc::now() - Duration::days(days)),
        None => None,
    };

    let mut events = orchestrator.query(category, params.user_id.as_deref(), since);
    let total = events.len();
    events.truncate(params.limit.unwrap_or(50));

    Ok(QueryEventsResponse { total, events })
}
