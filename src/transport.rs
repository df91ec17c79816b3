//! Completion transport
//!
//! Opens the streamed completion and hands back the raw response body as a
//! byte stream. Decoding happens in [`crate::streaming`].

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;

use crate::config::ModelConfig;
use crate::error::{ChatError, Result};
use crate::request::CompletionRequest;

/// Raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send `request` and return the body stream once the status is known to
    /// be successful. Non-2xx answers are errors.
    async fn open_stream(
        &self,
        config: &ModelConfig,
        request: &CompletionRequest,
    ) -> Result<ByteStream>;
}

/// `reqwest`-backed transport for OpenAI-compatible endpoints.
#[derive(Debug, Clone, Default)]
pub struct HttpCompletionTransport {
    client: reqwest::Client,
}

impl HttpCompletionTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionTransport for HttpCompletionTransport {
    async fn open_stream(
        &self,
        config: &ModelConfig,
        request: &CompletionRequest,
    ) -> Result<ByteStream> {
        let url = config.completions_url();
        tracing::debug!(url = %url, model = %request.model, messages = request.messages.len(), "opening completion stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(config.api_key())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .or_else(|| (!text.is_empty()).then(|| serde_json::Value::String(text.clone())));
            let reason = status.canonical_reason().unwrap_or("");
            return Err(ChatError::ApiError {
                code: status.as_u16(),
                message: format!("{} {}", status.as_u16(), reason).trim().to_string(),
                details,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::StreamError(e.to_string())));
        Ok(Box::pin(stream))
    }
}
