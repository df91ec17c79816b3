//! Outbound completion request
//!
//! Body of `POST <base_url>/chat/completions`:
//! `{model, messages, temperature, stream: true, tools?, tool_choice?}`.

use serde::Serialize;

use crate::config::ModelConfig;
use crate::types::{Message, Tool, ToolCall};

/// Message as sent on the wire. Transient UI flags are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ApiMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::User(m) => Self::User {
                content: m.content.clone(),
            },
            Message::Assistant(m) => Self::Assistant {
                content: m.content.clone(),
                tool_calls: m.tool_calls.clone(),
            },
            Message::Tool(m) => Self::Tool {
                tool_call_id: m.tool_call_id.clone(),
                content: m.content.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl CompletionRequest {
    /// Streaming request over `history`. `tool_choice` is only set when
    /// there are tools to choose from.
    pub fn new(config: &ModelConfig, history: &[Message], tools: Vec<Tool>) -> Self {
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some("auto".to_string()))
        };
        Self {
            model: config.model.clone(),
            messages: history.iter().map(ApiMessage::from).collect(),
            temperature: config.temperature,
            stream: true,
            tools,
            tool_choice,
        }
    }
}
