/// Completion service collaborator
///
/// The dispatcher talks to an external language-model service through the
/// `CompletionService` trait. `HttpCompletionService` posts JSON to a
/// configured endpoint; tests substitute their own implementations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DispatchConfig;

/// Model parameters forwarded with every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&DispatchConfig> for ModelParams {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// One delivery attempt's input
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub feature_id: String,
    pub prompt: String,
    pub context: serde_json::Value,
    pub params: ModelParams,
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

/// External completion service
///
/// Results are opaque text; the dispatcher only checks they are non-empty.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Completion service reached over HTTP
pub struct HttpCompletionService {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionService {
    /// Build a client from dispatch configuration
    ///
    /// Fails when no endpoint is configured or the API key is not a valid header value.
    pub fn new(config: &DispatchConfig) -> Result<Self, CompletionError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| CompletionError::Config("dispatch.endpoint is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = config.resolved_api_key() {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| CompletionError::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout() + Duration::from_millis(250))
            .default_headers(headers)
            .build()
            .map_err(|e| CompletionError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        Ok(parsed.result.or(parsed.text).unwrap_or_default())
    }
}
