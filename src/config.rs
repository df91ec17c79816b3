//! Configuration
//!
//! Model credentials, tool server endpoints and per-conversation options.
//! Values can be built in code with the `with_*` setters or read from
//! `TOOLCHAT_*` environment variables.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOOLS_ENDPOINT: &str = "/api/mcp/list-tools";
pub const DEFAULT_TOOLS_EXECUTION: &str = "/api/mcp/call-tool";
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Completion endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Bearer token. Never serialized back out.
    #[serde(
        skip_serializing,
        default = "empty_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f32,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: empty_secret(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ModelConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = SecretString::from(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Full URL of the streaming completion endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Read the configuration from the environment, falling back to defaults.
    ///
    /// - `TOOLCHAT_BASE_URL`
    /// - `TOOLCHAT_API_KEY`
    /// - `TOOLCHAT_MODEL`
    /// - `TOOLCHAT_TEMPERATURE`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TOOLCHAT_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(key) = std::env::var("TOOLCHAT_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Ok(model) = std::env::var("TOOLCHAT_MODEL") {
            config.model = model;
        }
        if let Ok(t) = std::env::var("TOOLCHAT_TEMPERATURE") {
            config.temperature = t.parse().map_err(|_| {
                ChatError::ConfigurationError(format!("Invalid TOOLCHAT_TEMPERATURE: {t}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ChatError::ConfigurationError(
                "base_url must not be empty".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::ConfigurationError("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ChatError::ConfigurationError(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Tool server endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Catalog listing endpoint (`GET`).
    pub endpoint_url: String,
    /// Execution base URL; `/<server>?tool_name=<name>` is appended.
    pub execution_url: String,
    /// Per-call timeout applied by the HTTP tool executor. Serialized as
    /// seconds; fractions are allowed.
    #[serde(
        default = "default_tool_timeout",
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub timeout: Duration,
}

fn default_tool_timeout() -> Duration {
    DEFAULT_TOOL_TIMEOUT
}

fn serialize_secs<S>(timeout: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(timeout.as_secs_f64())
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_TOOLS_ENDPOINT.to_string(),
            execution_url: DEFAULT_TOOLS_EXECUTION.to_string(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl ToolsConfig {
    pub fn new(endpoint_url: impl Into<String>, execution_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            execution_url: execution_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execution URL for `tool_name` hosted on `server`.
    pub fn execution_url_for(&self, server: &str, tool_name: &str) -> String {
        format!(
            "{}/{}?tool_name={}",
            self.execution_url.trim_end_matches('/'),
            urlencoding::encode(server),
            urlencoding::encode(tool_name)
        )
    }
}

/// Per-conversation switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Advertise the selected tools to the model.
    pub use_tools: bool,
    /// Upper bound on rounds per `run`. `0` is treated as `1`.
    pub max_rounds: usize,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            use_tools: true,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ChatOptions {
    pub fn with_tools(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub(crate) fn effective_max_rounds(&self) -> usize {
        self.max_rounds.max(1)
    }
}
