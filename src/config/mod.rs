use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

use crate::services::decoder::RetryPolicy;
use crate::services::preview::PreviewSettings;

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// Gemini API key
    #[garde(length(min = 1))]
    pub gemini_api_key: String,

    /// Gemini model used for classification
    #[serde(default = "default_gemini_model")]
    #[garde(length(min = 1))]
    pub gemini_model: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_base_url")]
    #[garde(length(min = 1))]
    pub gemini_base_url: String,

    /// Upper bound on one classification call, in seconds
    #[serde(default = "default_classify_timeout_secs")]
    #[garde(range(min = 1))]
    pub classify_timeout_secs: u64,

    /// Decode attempts before an upload is reported undecodable
    #[serde(default = "default_decode_max_attempts")]
    #[garde(range(min = 1, max = 100))]
    pub decode_max_attempts: u32,

    /// Pause between decode attempts, in milliseconds
    #[serde(default = "default_decode_retry_interval_ms")]
    #[garde(range(min = 1))]
    pub decode_retry_interval_ms: u64,

    /// Preview refresh cadence, in milliseconds
    #[serde(default = "default_preview_interval_ms")]
    #[garde(range(min = 1))]
    pub preview_interval_ms: u64,

    #[serde(default = "default_preview_max_width")]
    #[garde(range(min = 1))]
    pub preview_max_width: u32,

    #[serde(default = "default_preview_max_height")]
    #[garde(range(min = 1))]
    pub preview_max_height: u32,

    /// Number of results kept in the display log
    #[serde(default = "default_result_log_capacity")]
    #[garde(range(min = 1))]
    pub result_log_capacity: usize,

    /// Largest accepted upload body, in bytes
    #[serde(default = "default_max_upload_bytes")]
    #[garde(range(min = 1))]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_classify_timeout_secs() -> u64 {
    30
}

fn default_decode_max_attempts() -> u32 {
    5
}

fn default_decode_retry_interval_ms() -> u64 {
    20
}

fn default_preview_interval_ms() -> u64 {
    30
}

fn default_preview_max_width() -> u32 {
    400
}

fn default_preview_max_height() -> u32 {
    300
}

fn default_result_log_capacity() -> usize {
    50
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build from explicit key/value pairs (upper-case names, as in the environment).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn decode_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.decode_max_attempts,
            interval: Duration::from_millis(self.decode_retry_interval_ms),
        }
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }

    pub fn preview_settings(&self) -> PreviewSettings {
        PreviewSettings {
            interval: Duration::from_millis(self.preview_interval_ms),
            max_width: self.preview_max_width,
            max_height: self.preview_max_height,
            decode: self.decode_policy(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
