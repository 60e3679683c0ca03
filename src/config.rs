/// Configuration loading and management
///
/// Every tunable constant of the engine (retention, score weights, rule
/// thresholds, rate limits, retry policy) lives here. Defaults match the
/// documented behavior; a TOML file can override any of them, which is mostly
/// useful for tests and staging hosts.
///
/// The default file location is `$XDG_CONFIG_HOME/insight-engine/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("insight-engine").join("config.toml"))
    }

    /// Load configuration from an explicit path, or from the default path when present
    ///
    /// A missing default file is not an error; built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(explicit) => explicit.to_path_buf(),
            None => match Self::default_path() {
                Some(default) if default.exists() => default,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.analytics.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}

/// Upper bound on retention, about a century
const MAX_RETENTION_DAYS: i64 = 36_500;

/// Event store retention and background job intervals
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum age of an event before compaction drops it
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Maximum number of events kept per category
    #[serde(default = "default_max_events")]
    pub max_events_per_category: usize,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    #[serde(default = "default_compaction_interval")]
    pub compaction_interval_secs: u64,

    /// Periodic re-analysis of every known user; 0 disables it
    #[serde(default = "default_analysis_interval")]
    pub analysis_interval_secs: u64,

    /// Number of reports kept per user in the history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_events_per_category: default_max_events(),
            flush_interval_secs: default_flush_interval(),
            compaction_interval_secs: default_compaction_interval(),
            analysis_interval_secs: default_analysis_interval(),
            history_limit: default_history_limit(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_days <= 0 || self.retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::Invalid(format!(
                "store.retention_days must be between 1 and {}, got {}",
                MAX_RETENTION_DAYS, self.retention_days
            )));
        }
        if self.max_events_per_category == 0 {
            return Err(ConfigError::Invalid(
                "store.max_events_per_category must be at least 1".to_string(),
            ));
        }
        if self.flush_interval_secs == 0 || self.compaction_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "store flush and compaction intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn default_retention_days() -> i64 {
    90
}

fn default_max_events() -> usize {
    1000
}

fn default_flush_interval() -> u64 {
    30
}

fn default_compaction_interval() -> u64 {
    3600
}

fn default_analysis_interval() -> u64 {
    1800
}

fn default_history_limit() -> usize {
    10
}

/// Weights of the productivity score composite
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ScoreWeights {
    pub task_completion: f64,
    pub focus: f64,
    pub goal_progress: f64,
    pub ai_usage: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            task_completion: 0.30,
            focus: 0.25,
            goal_progress: 0.25,
            ai_usage: 0.20,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.task_completion + self.focus + self.goal_progress + self.ai_usage
    }
}

/// Thresholds and constants used by metrics, patterns, rules and predictions
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Focus hours at which the focus component of the score saturates
    #[serde(default = "default_focus_cap_hours")]
    pub focus_cap_hours: f64,

    /// AI uses at which the AI component of the score saturates
    #[serde(default = "default_usage_cap")]
    pub usage_cap: f64,

    /// Fraction of the busiest hour's count an hour needs to be a peak hour
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f64,

    /// Gap between interactions, in minutes, that counts as a break
    #[serde(default = "default_break_gap_minutes")]
    pub break_gap_minutes: i64,

    #[serde(default = "default_break_interval_minutes")]
    pub recommended_break_interval_minutes: u32,

    #[serde(default = "default_break_duration_minutes")]
    pub recommended_break_duration_minutes: u32,

    /// Offset from UTC used when bucketing events by hour of day
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default = "default_completion_threshold")]
    pub low_completion_threshold: f64,

    #[serde(default = "default_focus_threshold")]
    pub low_focus_hours: f64,

    #[serde(default = "default_ai_usage_threshold")]
    pub low_ai_usage: u32,

    /// Inflation applied to the weekly completion rate prediction
    #[serde(default = "default_completion_uplift")]
    pub completion_uplift: f64,

    #[serde(default = "default_prediction_confidence")]
    pub prediction_confidence: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            focus_cap_hours: default_focus_cap_hours(),
            usage_cap: default_usage_cap(),
            peak_threshold: default_peak_threshold(),
            break_gap_minutes: default_break_gap_minutes(),
            recommended_break_interval_minutes: default_break_interval_minutes(),
            recommended_break_duration_minutes: default_break_duration_minutes(),
            utc_offset_minutes: 0,
            low_completion_threshold: default_completion_threshold(),
            low_focus_hours: default_focus_threshold(),
            low_ai_usage: default_ai_usage_threshold(),
            completion_uplift: default_completion_uplift(),
            prediction_confidence: default_prediction_confidence(),
        }
    }
}

impl AnalyticsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let numbers = [
            ("weights.task_completion", self.weights.task_completion),
            ("weights.focus", self.weights.focus),
            ("weights.goal_progress", self.weights.goal_progress),
            ("weights.ai_usage", self.weights.ai_usage),
            ("focus_cap_hours", self.focus_cap_hours),
            ("usage_cap", self.usage_cap),
            ("peak_threshold", self.peak_threshold),
            ("low_completion_threshold", self.low_completion_threshold),
            ("low_focus_hours", self.low_focus_hours),
            ("completion_uplift", self.completion_uplift),
            ("prediction_confidence", self.prediction_confidence),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "analytics.{} must be a finite number, got {}",
                name, value
            )));
        }
        if (self.weights.sum() - 1.0).abs() > 1e-9 {
            return Err(ConfigError::Invalid(format!(
                "analytics.weights must sum to 1.0, got {}",
                self.weights.sum()
            )));
        }
        if self.focus_cap_hours <= 0.0 || self.usage_cap <= 0.0 {
            return Err(ConfigError::Invalid(
                "analytics focus and usage caps must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.peak_threshold) {
            return Err(ConfigError::Invalid(
                "analytics.peak_threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(
                "analytics.utc_offset_minutes must be less than a day".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_focus_cap_hours() -> f64 {
    8.0
}

fn default_usage_cap() -> f64 {
    20.0
}

fn default_peak_threshold() -> f64 {
    0.8
}

fn default_break_gap_minutes() -> i64 {
    5
}

fn default_break_interval_minutes() -> u32 {
    90
}

fn default_break_duration_minutes() -> u32 {
    15
}

fn default_completion_threshold() -> f64 {
    0.7
}

fn default_focus_threshold() -> f64 {
    2.0
}

fn default_ai_usage_threshold() -> u32 {
    5
}

fn default_completion_uplift() -> f64 {
    1.1
}

fn default_prediction_confidence() -> f64 {
    0.8
}

/// AI dispatcher limits, retry policy and completion service endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Requests allowed per rate-limit window
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u32,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Delivery attempts per dispatch, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before retry n is `base_delay_ms * n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single delivery attempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,

    /// Confidence reported on fallback responses
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    /// Completion service URL; without one every dispatch resolves locally
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key (can also use INSIGHT_ENGINE_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_ms: default_window_ms(),
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            fallback_enabled: default_fallback_enabled(),
            fallback_confidence: default_fallback_confidence(),
            endpoint: None,
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl DispatchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests_per_window == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_requests_per_window must be at least 1".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.window_ms == 0 || self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch window and request timeout must be positive".to_string(),
            ));
        }
        if !self.temperature.is_finite() {
            return Err(ConfigError::Invalid(
                "dispatch.temperature must be a finite number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback_confidence) {
            return Err(ConfigError::Invalid(
                "dispatch.fallback_confidence must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// API key from config, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("INSIGHT_ENGINE_API_KEY").ok())
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_fallback_enabled() -> bool {
    true
}

fn default_fallback_confidence() -> f64 {
    0.7
}

fn default_model() -> String {
    "default".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
