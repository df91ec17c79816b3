//! # toolchat - streaming chat core with remote tool calling
//!
//! The non-UI core of a chat client for OpenAI-compatible completion
//! endpoints whose tools live on remote tool servers.
//!
//! ## Pieces
//!
//! - [`streaming::StreamDecoder`]: SSE body → content snapshots and tool-call deltas
//! - [`streaming::ToolCallAccumulator`]: deltas → complete tool calls
//! - [`orchestrator::Orchestrator`]: stream a round, run the tools, repeat
//! - [`thread::MessageThreadBuilder`]: flat log → display groups
//! - [`tools::ToolCatalog`] / [`tools::ToolExecutor`]: what can be called and how
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = ModelConfig::from_env()?;
//!     let tools = ToolsConfig::new(
//!         "http://localhost:8000/api/mcp/list-tools",
//!         "http://localhost:8000/api/mcp/call-tool",
//!     );
//!
//!     let mut catalog = ToolCatalog::fetch(&reqwest::Client::new(), &tools).await?;
//!     catalog.select_all();
//!
//!     let orchestrator = Orchestrator::http(model, tools);
//!     let mut conversation = Conversation::new();
//!     let print = |c: &Conversation| {
//!         if let Some(last) = c.last() {
//!             println!("{}", last.content());
//!         }
//!     };
//!     orchestrator
//!         .send(&mut conversation, "What's the weather in Paris?", &catalog, &print)
//!         .await?;
//!
//!     for group in conversation.display_groups() {
//!         println!("{group:?}");
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod streaming;
pub mod telemetry;
pub mod thread;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{ChatOptions, ModelConfig, ToolsConfig};
pub use error::{ChatError, Result};
pub use orchestrator::{ConversationObserver, NoopObserver, Orchestrator, RunSummary};
pub use thread::{DisplayGroup, DisplayItem, MessageThreadBuilder};
pub use types::{Conversation, Message};

pub mod prelude {
    pub use crate::config::{ChatOptions, ModelConfig, ToolsConfig};
    pub use crate::error::ChatError;
    pub use crate::orchestrator::{
        ConversationObserver, NoopObserver, Orchestrator, RoundResult, RunSummary,
    };
    pub use crate::streaming::{StreamDecoder, StreamFrame, ToolCallAccumulator, ToolCallDelta};
    pub use crate::thread::{
        DisplayGroup, DisplayItem, MessageThreadBuilder, ToolCallView, ToolResultView,
    };
    pub use crate::tools::{CatalogEntry, HttpToolExecutor, ToolCatalog, ToolExecutor, ToolSpec};
    pub use crate::transport::{CompletionTransport, HttpCompletionTransport};
    pub use crate::types::{
        AssistantMessage, Conversation, Message, Tool, ToolCall, ToolMessage, UserMessage,
    };
}
