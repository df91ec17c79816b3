//! Core data types: messages, tool calls and the conversation log.

pub mod conversation;
pub mod message;
pub mod tools;

pub use conversation::Conversation;
pub use message::{AssistantMessage, Message, MessageRole, ToolMessage, UserMessage};
pub use tools::{FunctionCall, Tool, ToolCall, ToolFunction};
