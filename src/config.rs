//! Environment-driven configuration
//!
//! | key                   | default            |
//! |-----------------------|--------------------|
//! | `GCP_PROJECT_ID`      | required           |
//! | `GCP_LOCATION`        | `us-central1`      |
//! | `GEMINI_MODEL`        | `gemini-2.5-flash` |
//! | `LLM_MAX_TOKENS`      | `1024`             |
//! | `LLM_TEMPERATURE`     | unset              |
//! | `TOOL_MAX_ITERATIONS` | `5`                |
//! | `TOOL_TIMEOUT_MS`     | unset (no limit)   |
//! | `MODEL_TIMEOUT_MS`    | unset (no limit)   |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::core::config::GenerationConfig;
use crate::llm::gemini::GeminiModel;

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for the model client and the tool-calling loop
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub project_id: String,
    pub location: String,
    pub model: GeminiModel,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub max_iterations: usize,
    pub tool_timeout: Option<Duration>,
    pub model_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let project_id = get("GCP_PROJECT_ID").ok_or(ConfigError::Missing("GCP_PROJECT_ID"))?;
        let location = get("GCP_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let model = match get("GEMINI_MODEL") {
            Some(value) => parse("GEMINI_MODEL", value)?,
            None => GeminiModel::Gemini25Flash,
        };
        let max_tokens = get("LLM_MAX_TOKENS")
            .map(|value| parse("LLM_MAX_TOKENS", value))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = get("LLM_TEMPERATURE")
            .map(|value| parse("LLM_TEMPERATURE", value))
            .transpose()?;
        let max_iterations: usize = get("TOOL_MAX_ITERATIONS")
            .map(|value| parse("TOOL_MAX_ITERATIONS", value))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "TOOL_MAX_ITERATIONS",
                value: "0".to_string(),
            });
        }
        let tool_timeout = get("TOOL_TIMEOUT_MS")
            .map(|value| parse("TOOL_TIMEOUT_MS", value).map(Duration::from_millis))
            .transpose()?;
        let model_timeout = get("MODEL_TIMEOUT_MS")
            .map(|value| parse("MODEL_TIMEOUT_MS", value).map(Duration::from_millis))
            .transpose()?;

        Ok(Self {
            project_id,
            location,
            model,
            max_tokens,
            temperature,
            max_iterations,
            tool_timeout,
            model_timeout,
        })
    }

    /// Generation parameters for model requests
    pub fn generation_config(&self) -> GenerationConfig {
        let config = GenerationConfig::new(self.max_tokens);
        match self.temperature {
            Some(temperature) => config.with_temperature(temperature),
            None => config,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
