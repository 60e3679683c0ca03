/// Tools for insight reports
///
/// This module implements the insights_generate and insights_history MCP
/// tools on top of the orchestrator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::InsightReport;
use crate::domain::{DomainError, TimeRange};
use crate::orchestrator::InsightOrchestrator;

/// Parameters for generating insights
#[derive(Debug, Deserialize, JsonSchema)]
pub struct InsightsParams {
    pub user_id: String,
    /// day, week, month or quarter (defaults to month)
    pub time_range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub message: String,
    pub report: InsightReport,
}

/// Generate a fresh report for a user
pub fn generate_insights(
    orchestrator: &InsightOrchestrator,
    params: InsightsParams,
) -> Result<InsightsResponse, DomainError> {
    if params.user_id.trim().is_empty() {
        return Err(DomainError::InvalidPayload {
            message: "user_id cannot be empty".to_string(),
        });
    }

    let range = match params.time_range.as_deref() {
        Some(range) => range.parse()?,
        None => TimeRange::default(),
    };

    let report = orchestrator.generate_insights(&params.user_id, range);
    Ok(InsightsResponse {
        message: report.summary(),
        report,
    })
}

/// Parameters for reading past reports
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HistoryParams {
    pub user_id: String,
    /// Maximum number of reports returned, most recent first
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub message: String,
    pub reports: Vec<InsightReport>,
}

pub fn insights_history(orchestrator: &InsightOrchestrator, params: HistoryParams) -> HistoryResponse {
    let mut reports = orchestrator.history(&params.user_id);
    if let Some(limit) = params.limit {
        reports.truncate(limit);
    }

    let message = if reports.is_empty() {
        format!("No reports generated yet for {}", params.user_id)
    } else {
        reports
            .iter()
            .map(|r| {
                format!(
                    "{} {:?}: score {}, {} recommendation(s)",
                    r.generated_at.format("%Y-%m-%d %H:%M"),
                    r.time_range,
                    r.metrics.productivity_score,
                    r.recommendations.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    HistoryResponse { message, reports }
}
