//! Tool execution
//!
//! [`ToolExecutor`] is the seam between the orchestrator and whatever runs
//! the tools. [`HttpToolExecutor`] talks to the tool server gateway:
//! `POST <execution_url>/<server>?tool_name=<name>` with the call arguments
//! as JSON body.

use async_trait::async_trait;
use serde_json::Value;

use super::catalog::CatalogEntry;
use crate::config::ToolsConfig;
use crate::error::{ChatError, Result};

/// Message used when a failed execution response carries no `detail`.
pub const DEFAULT_TOOL_FAILURE: &str = "Tool execution failed";

/// Executes a resolved tool with parsed JSON arguments.
///
/// Timeouts are the executor's responsibility; any `Err` is recorded by the
/// orchestrator as an error tool message.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool: &CatalogEntry, arguments: Value) -> Result<Value>;
}

/// Tool executor backed by the HTTP tool gateway.
#[derive(Debug, Clone)]
pub struct HttpToolExecutor {
    client: reqwest::Client,
    config: ToolsConfig,
}

impl HttpToolExecutor {
    pub fn new(config: ToolsConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ToolsConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn execute(&self, tool: &CatalogEntry, arguments: Value) -> Result<Value> {
        let url = self.config.execution_url_for(&tool.server, &tool.spec.name);
        tracing::debug!(url = %url, tool = %tool.spec.name, "executing tool");

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout())
            .json(&arguments)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::TimeoutError(format!(
                        "tool '{}' timed out after {:?}",
                        tool.spec.name,
                        self.config.timeout()
                    ))
                } else {
                    ChatError::ToolExecutionError {
                        tool: tool.spec.name.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ChatError::ToolExecutionError {
            tool: tool.spec.name.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").cloned())
                .map(|detail| match detail {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| DEFAULT_TOOL_FAILURE.to_string());
            tracing::warn!(tool = %tool.spec.name, status = status.as_u16(), %message, "tool call failed");
            return Err(ChatError::ToolExecutionError {
                tool: tool.spec.name.clone(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())))
    }
}
