/// Tools for the AI dispatcher
///
/// This module implements the ai_dispatch and ai_features MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dispatch::{AiDispatcher, DispatchError, DispatchResponse};

/// Parameters for dispatching an AI request
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AiDispatchParams {
    /// Feature identifier, see ai_features
    pub feature: String,
    pub prompt: String,
    /// Free-form context forwarded to the completion service
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

pub async fn ai_dispatch(
    dispatcher: &AiDispatcher,
    params: AiDispatchParams,
) -> Result<DispatchResponse, DispatchError> {
    dispatcher
        .dispatch(
            &params.feature,
            &params.prompt,
            params.context.unwrap_or(serde_json::Value::Null),
        )
        .await
}

/// Parameters for listing features (none required)
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct FeaturesParams {}

#[derive(Debug, Serialize)]
pub struct FeatureInfo {
    pub identifier: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<FeatureInfo>,
    /// Dispatches left in the current rate-limit window
    pub remaining_requests: u32,
    pub service_configured: bool,
}

pub fn list_features(dispatcher: &AiDispatcher) -> FeaturesResponse {
    FeaturesResponse {
        features: dispatcher
            .features()
            .iter()
            .map(|f| FeatureInfo {
                identifier: f.identifier.clone(),
                description: f.description.clone(),
            })
            .collect(),
        remaining_requests: dispatcher.rate_limiter().remaining(),
        service_configured: dispatcher.has_service(),
    }
}
