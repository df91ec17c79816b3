//! Orchestrator for multi-round tool calling
//!
//! Drives one conversation turn: stream a round into an assistant
//! placeholder → execute the requested tool calls → append their results →
//! stream the next round, until a round requests no tools.
//!
//! The conversation log is the only state. It is mutated in place and the
//! observer is called synchronously after every mutation, which is how
//! partial output reaches the UI.

mod observer;

pub use observer::{ConversationObserver, NoopObserver};

use std::sync::Arc;

use crate::config::{ChatOptions, ModelConfig, ToolsConfig};
use crate::error::{ChatError, Result};
use crate::request::CompletionRequest;
use crate::streaming::{StreamDecoder, StreamFrame, ToolCallAccumulator};
use crate::tools::{HttpToolExecutor, ToolCatalog, ToolExecutor};
use crate::transport::{CompletionTransport, HttpCompletionTransport};
use crate::types::{AssistantMessage, Conversation, Message, ToolCall, ToolMessage};

/// Prefix of the text that replaces a placeholder when its round fails.
pub const ERROR_PREFIX: &str = "Error: ";

/// Result of a single round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    /// Final assistant text of the round.
    pub content: String,
    /// Tool calls requested by the model in this round.
    pub tool_calls: Vec<ToolCall>,
    /// Tool messages appended for those calls, in call order.
    pub tool_messages: Vec<ToolMessage>,
}

/// Summary of one `run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rounds: Vec<RoundResult>,
    /// The loop stopped because `max_rounds` was reached while the model was
    /// still requesting tools.
    pub round_limit_reached: bool,
}

impl RunSummary {
    /// Total tool calls executed across all rounds.
    pub fn tool_call_count(&self) -> usize {
        self.rounds.iter().map(|r| r.tool_calls.len()).sum()
    }
}

/// Streams rounds against the completion endpoint and executes tool calls.
#[derive(Clone)]
pub struct Orchestrator {
    model: ModelConfig,
    options: ChatOptions,
    transport: Arc<dyn CompletionTransport>,
    executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.model)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        model: ModelConfig,
        transport: Arc<dyn CompletionTransport>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            model,
            options: ChatOptions::default(),
            transport,
            executor,
        }
    }

    /// Orchestrator using the HTTP completion transport and HTTP tool gateway.
    pub fn http(model: ModelConfig, tools: ToolsConfig) -> Self {
        let client = reqwest::Client::new();
        Self::new(
            model,
            Arc::new(HttpCompletionTransport::with_client(client.clone())),
            Arc::new(HttpToolExecutor::with_client(client, tools)),
        )
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Append a user message and run the turn it starts.
    ///
    /// Blank input is ignored and leaves the log untouched.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
        catalog: &ToolCatalog,
        observer: &dyn ConversationObserver,
    ) -> Result<RunSummary> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(RunSummary::default());
        }
        conversation.push(Message::user(text));
        observer.on_update(conversation);
        self.run(conversation, catalog, observer).await
    }

    /// Run rounds until the model stops requesting tools.
    ///
    /// Fails on configuration errors (before the log is touched) and on
    /// transport errors; in the latter case the failing round's placeholder
    /// already shows the error. Tool failures never fail the run.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        catalog: &ToolCatalog,
        observer: &dyn ConversationObserver,
    ) -> Result<RunSummary> {
        self.model.validate()?;

        let max_rounds = self.options.effective_max_rounds();
        let mut summary = RunSummary::default();

        for round_idx in 0..max_rounds {
            let placeholder = conversation.push(AssistantMessage::placeholder());
            observer.on_update(conversation);
            tracing::debug!(round = round_idx, placeholder, "starting round");

            let round = match self
                .run_round(conversation, placeholder, catalog, observer)
                .await
            {
                Ok(round) => round,
                Err(e) => {
                    tracing::error!(round = round_idx, error = %e, "round failed");
                    fail_round(conversation, placeholder, &e);
                    observer.on_update(conversation);
                    return Err(e);
                }
            };

            let requested_tools = !round.tool_calls.is_empty();
            summary.rounds.push(round);
            if !requested_tools {
                tracing::debug!(rounds = summary.rounds.len(), "turn finished");
                return Ok(summary);
            }
        }

        tracing::warn!(
            max_rounds,
            "round limit reached while the model was still requesting tools"
        );
        summary.round_limit_reached = true;
        Ok(summary)
    }

    async fn run_round(
        &self,
        conversation: &mut Conversation,
        placeholder: usize,
        catalog: &ToolCatalog,
        observer: &dyn ConversationObserver,
    ) -> Result<RoundResult> {
        let tools = if self.options.use_tools {
            catalog.schema()
        } else {
            Vec::new()
        };
        let history = conversation.messages().get(..placeholder).ok_or_else(|| {
            ChatError::InternalError(format!("placeholder {placeholder} is past the log end"))
        })?;
        let request = CompletionRequest::new(&self.model, history, tools);

        let body = self.transport.open_stream(&self.model, &request).await?;
        let mut decoder = StreamDecoder::new(body);
        let mut calls = ToolCallAccumulator::new();

        while let Some(frame) = decoder.next_frame().await? {
            match frame {
                StreamFrame::Content { content } => {
                    conversation.assistant_mut(placeholder)?.content = content;
                }
                StreamFrame::ToolCallDelta(delta) => {
                    calls.apply(&delta);
                    let message = conversation.assistant_mut(placeholder)?;
                    message.tool_calls = calls.snapshot();
                    message.is_processing_tools = true;
                }
                StreamFrame::Done => break,
            }
            observer.on_update(conversation);
        }

        let mut tool_calls = calls.finish();
        for call in tool_calls.iter_mut().filter(|c| c.id.is_empty()) {
            call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
            tracing::debug!(call_id = %call.id, "assigned id to tool call without one");
        }

        let message = conversation.assistant_mut(placeholder)?;
        message.processing_chat_response = false;
        message.tool_calls = tool_calls.clone();
        message.is_processing_tools = !tool_calls.is_empty();
        let content = message.content.clone();
        observer.on_update(conversation);

        let mut tool_messages = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            let tool_message = self.execute_call(call, catalog).await;
            conversation.push(tool_message.clone());
            tool_messages.push(tool_message);
            observer.on_update(conversation);
        }

        if !tool_calls.is_empty() {
            conversation.assistant_mut(placeholder)?.is_processing_tools = false;
            observer.on_update(conversation);
        }

        Ok(RoundResult {
            content,
            tool_calls,
            tool_messages,
        })
    }

    /// Resolve and execute one call. Every failure becomes an error tool message.
    async fn execute_call(&self, call: &ToolCall, catalog: &ToolCatalog) -> ToolMessage {
        let Some(entry) = catalog.resolve(&call.function.name) else {
            tracing::warn!(call_id = %call.id, tool = %call.function.name, "tool not found in catalog");
            let err = ChatError::ToolNotFound(call.function.name.clone());
            return ToolMessage::error(&call.id, err.to_string());
        };

        let arguments = call.parsed_arguments();
        tracing::debug!(call_id = %call.id, server = %entry.server, tool = %entry.spec.name, "calling tool");

        let message = match self.executor.execute(entry, arguments).await {
            Ok(output) => ToolMessage::result(&call.id, output.to_string()),
            Err(e) => {
                tracing::warn!(call_id = %call.id, tool = %entry.spec.name, error = %e, "tool call failed");
                let detail = match e {
                    ChatError::ToolExecutionError { message, .. } => message,
                    other => other.to_string(),
                };
                ToolMessage::error(&call.id, detail)
            }
        };
        message.with_tool_name(&entry.spec.name)
    }
}

/// Mark the round's placeholder as failed.
///
/// Transport and configuration failures replace the placeholder with the
/// error text. Bookkeeping failures keep what was streamed and only flag the
/// turn; if the placeholder itself is unreachable the last assistant message
/// carries the flag.
fn fail_round(conversation: &mut Conversation, placeholder: usize, error: &ChatError) {
    let text = error.to_string();
    let replace = !matches!(error, ChatError::InternalError(_));

    let target = match conversation.assistant_mut(placeholder) {
        Ok(_) => Some(placeholder),
        Err(_) => conversation
            .messages()
            .iter()
            .rposition(|m| matches!(m, Message::Assistant(_))),
    };
    let Some(index) = target else {
        return;
    };
    if let Ok(message) = conversation.assistant_mut(index) {
        if replace && index == placeholder {
            message.content = format!("{ERROR_PREFIX}{text}");
            message.tool_calls.clear();
        }
        message.processing_chat_response = false;
        message.is_processing_tools = false;
        message.error = Some(text);
    }
}
