//! Error Types
//!
//! The crate-wide error enum. Only transport-level and configuration
//! failures ever leave the orchestrator as `Err`; tool failures are turned
//! into tool messages instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors produced by the chat core.
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// Network-level failure (connection refused, TLS, DNS, ...).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The completion endpoint answered with a non-2xx status.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The response body broke while a round was streaming.
    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A finalized call names a synthetic id the catalog does not know.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecutionError { tool: String, message: String },

    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Round bookkeeping went out of sync with the log.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ChatError {
    /// Build an `ApiError` without details.
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether sending the same request again could plausibly succeed.
    ///
    /// Nothing in this crate retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::StreamError(_) | Self::TimeoutError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Whether this failure belongs to a single tool call rather than the round.
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_) | Self::ToolExecutionError { .. }
        )
    }
}
