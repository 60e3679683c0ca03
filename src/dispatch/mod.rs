/// AI request dispatcher
///
/// Routes a feature request to the completion service under a shared rate
/// limit, retries failed deliveries with linear backoff and falls back to
/// deterministic local responses once delivery is exhausted.

pub mod client;
pub mod fallback;
pub mod features;
pub mod rate_limit;

pub use client::{CompletionError, CompletionRequest, CompletionService, HttpCompletionService, ModelParams};
pub use fallback::{parse_task, AdviceTemplate, FallbackResolver, ParsedTask};
pub use features::{FeatureDescriptor, FeatureRegistry};
pub use rate_limit::{RateLimitWindow, RateLimiter};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::config::DispatchConfig;

/// Errors surfaced by [`AiDispatcher::dispatch`]
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Rate limit exceeded, retry after {}ms", retry_after.as_millis())]
    RateLimitExceeded { retry_after: Duration },

    #[error("Delivery failed after {attempts} attempt(s): {last_error}")]
    DeliveryFailure { attempts: u32, last_error: String },

    #[error("Dispatcher configuration error: {0}")]
    Configuration(String),
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchSource {
    Service,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub result: serde_json::Value,
    pub source: DispatchSource,
    /// Set on fallback responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Delivery attempts made before this response
    pub attempts: u32,
}

/// Dispatcher owning the feature registry, rate limit and completion service
pub struct AiDispatcher {
    features: FeatureRegistry,
    limiter: RateLimiter,
    service: Option<Arc<dyn CompletionService>>,
    fallback: FallbackResolver,
    config: DispatchConfig,
}

impl AiDispatcher {
    /// Build a dispatcher, connecting to the configured endpoint if there is one
    pub fn from_config(config: DispatchConfig) -> Result<Self, DispatchError> {
        let service: Option<Arc<dyn CompletionService>> = match config.endpoint {
            Some(_) => {
                let client = HttpCompletionService::new(&config)
                    .map_err(|e| DispatchError::Configuration(e.to_string()))?;
                tracing::info!(endpoint = client.endpoint(), "Using HTTP completion service");
                Some(Arc::new(client))
            }
            None => {
                tracing::info!("No completion endpoint configured, dispatches resolve locally");
                None
            }
        };
        Ok(Self::new(config, FeatureRegistry::default(), service))
    }

    pub fn new(
        config: DispatchConfig,
        features: FeatureRegistry,
        service: Option<Arc<dyn CompletionService>>,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(config.max_requests_per_window, config.window()),
            features,
            service,
            fallback: FallbackResolver::new(),
            config,
        }
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn can_dispatch(&self) -> bool {
        self.limiter.can_dispatch()
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Dispatch one logical request
    ///
    /// Consumes exactly one unit of the rate limit however many delivery
    /// attempts follow. Unknown features consume nothing.
    pub async fn dispatch(
        &self,
        feature_id: &str,
        prompt: &str,
        context: serde_json::Value,
    ) -> Result<DispatchResponse, DispatchError> {
        let feature = self
            .features
            .get(feature_id)
            .ok_or_else(|| DispatchError::UnknownFeature(feature_id.to_string()))?;

        self.limiter.try_acquire().map_err(|retry_after| {
            tracing::warn!(feature = feature_id, ?retry_after, "Dispatch rejected by rate limit");
            DispatchError::RateLimitExceeded { retry_after }
        })?;

        let (attempts, last_error) = match &self.service {
            Some(service) => {
                let request = CompletionRequest {
                    feature_id: feature.identifier.clone(),
                    prompt: feature.render_prompt(prompt),
                    context,
                    params: ModelParams::from(&self.config),
                };
                match self.deliver(service.as_ref(), &request).await {
                    Ok((result, attempts)) => {
                        tracing::debug!(feature = feature_id, attempts, "Dispatch delivered");
                        return Ok(DispatchResponse {
                            success: true,
                            result: serde_json::Value::String(result),
                            source: DispatchSource::Service,
                            confidence: None,
                            attempts,
                        });
                    }
                    Err(failure) => failure,
                }
            }
            None => (0, "no completion service configured".to_string()),
        };

        if !self.config.fallback_enabled {
            return Err(DispatchError::DeliveryFailure {
                attempts,
                last_error,
            });
        }

        tracing::info!(feature = feature_id, attempts, %last_error, "Resolving dispatch with fallback");
        let result = self.fallback.resolve(feature_id, prompt, Utc::now().date_naive());
        Ok(DispatchResponse {
            success: true,
            result,
            source: DispatchSource::Fallback,
            confidence: Some(self.config.fallback_confidence),
            attempts,
        })
    }

    /// Attempt delivery with linear backoff
    ///
    /// Returns the result and attempt count, or the attempt count and last error.
    async fn deliver(
        &self,
        service: &dyn CompletionService,
        request: &CompletionRequest,
    ) -> Result<(String, u32), (u32, String)> {
        let max_attempts = self.config.retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match tokio::time::timeout(self.config.request_timeout(), service.complete(request)).await {
                Ok(Ok(result)) if !result.trim().is_empty() => return Ok((result, attempt)),
                Ok(Ok(_)) => last_error = "completion service returned an empty result".to_string(),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "request timed out after {}ms",
                        self.config.request_timeout().as_millis()
                    )
                }
            }

            if attempt < max_attempts {
                let delay = self.config.base_delay() * attempt;
                tracing::warn!(
                    feature = %request.feature_id,
                    attempt,
                    max_attempts,
                    error = %last_error,
                    "Delivery failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!(
            feature = %request.feature_id,
            attempts = max_attempts,
            error = %last_error,
            "Delivery attempts exhausted"
        );
        Err((max_attempts, last_error))
    }
}
