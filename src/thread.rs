//! Display threading
//!
//! Regroups the flat conversation log into display groups. A user message
//! or a plain assistant reply is a group on its own. An assistant message
//! that issued tool calls opens a turn that collects:
//! - one entry per tool call, resolved by the tool message that answers it
//!   or left pending while none has arrived,
//! - tool calls of follow-up assistant messages (chained tool rounds),
//! - follow-up assistant text as commentary,
//!
//! until the next user message. The groups are derived data: recompute them
//! after every log change and never edit them in place.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::types::{AssistantMessage, Conversation, Message, ToolCall, ToolMessage};

/// One visual turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayGroup {
    pub items: Vec<DisplayItem>,
}

impl DisplayGroup {
    fn single(item: DisplayItem) -> Self {
        Self { items: vec![item] }
    }

    /// Tool call entries of this group, in issue order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallView> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::ToolCall(view) => Some(view),
            _ => None,
        })
    }

    /// Whether anything in the group is still running.
    pub fn is_open(&self) -> bool {
        self.items.iter().any(|item| match item {
            DisplayItem::ToolCall(view) => view.is_pending(),
            DisplayItem::Assistant { streaming, .. } => *streaming,
            DisplayItem::User { .. } => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayItem {
    User {
        content: String,
    },
    /// Assistant text: a plain reply, or commentary inside a tool turn.
    Assistant {
        content: String,
        streaming: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ToolCall(ToolCallView),
}

impl DisplayItem {
    fn assistant(message: &AssistantMessage) -> Self {
        Self::Assistant {
            content: message.content.clone(),
            streaming: message.processing_chat_response,
            error: message.error.clone(),
        }
    }
}

/// A tool call paired with its result, if one has arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallView {
    pub call: ToolCall,
    pub result: Option<ToolResultView>,
}

impl ToolCallView {
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResultView {
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl From<&ToolMessage> for ToolResultView {
    fn from(m: &ToolMessage) -> Self {
        Self {
            content: m.content.clone(),
            is_error: m.is_error,
            tool_name: m.tool_name.clone(),
        }
    }
}

/// Groups a log into display turns.
pub struct MessageThreadBuilder;

impl MessageThreadBuilder {
    /// Build the display groups for `log`. Pure and deterministic.
    pub fn build(log: &[Message]) -> Vec<DisplayGroup> {
        let mut groups = Vec::new();
        let mut i = 0;
        while i < log.len() {
            match &log[i] {
                Message::User(m) => {
                    groups.push(DisplayGroup::single(DisplayItem::User {
                        content: m.content.clone(),
                    }));
                    i += 1;
                }
                Message::Assistant(m) if !m.has_tool_calls() => {
                    groups.push(DisplayGroup::single(DisplayItem::assistant(m)));
                    i += 1;
                }
                Message::Assistant(m) => {
                    let mut turn = ToolTurn::default();
                    turn.open_calls(m);
                    i += 1;
                    while let Some(next) = log.get(i) {
                        match next {
                            Message::Tool(t) => turn.resolve(t),
                            Message::Assistant(a) if a.has_tool_calls() => turn.open_calls(a),
                            Message::Assistant(a) => turn.items.push(DisplayItem::assistant(a)),
                            Message::User(_) => break,
                        }
                        i += 1;
                    }
                    groups.push(DisplayGroup { items: turn.items });
                }
                Message::Tool(t) => {
                    tracing::debug!(call_id = %t.tool_call_id, "tool message outside a tool turn");
                    i += 1;
                }
            }
        }
        groups
    }
}

/// Items of the turn being assembled plus the slots still waiting for a result.
///
/// Slots sharing a call id are resolved in issue order.
#[derive(Default)]
struct ToolTurn {
    items: Vec<DisplayItem>,
    pending: HashMap<String, VecDeque<usize>>,
}

impl ToolTurn {
    fn open_calls(&mut self, message: &AssistantMessage) {
        if !message.content.is_empty() || message.error.is_some() {
            self.items.push(DisplayItem::assistant(message));
        }
        for call in &message.tool_calls {
            self.pending
                .entry(call.id.clone())
                .or_default()
                .push_back(self.items.len());
            self.items.push(DisplayItem::ToolCall(ToolCallView {
                call: call.clone(),
                result: None,
            }));
        }
    }

    fn resolve(&mut self, message: &ToolMessage) {
        let Some(slot) = self
            .pending
            .get_mut(&message.tool_call_id)
            .and_then(VecDeque::pop_front)
        else {
            tracing::debug!(call_id = %message.tool_call_id, "tool result without a pending call");
            return;
        };
        if let Some(DisplayItem::ToolCall(view)) = self.items.get_mut(slot) {
            view.result = Some(ToolResultView::from(message));
        }
    }
}

impl Conversation {
    /// Display groups of the current log.
    pub fn display_groups(&self) -> Vec<DisplayGroup> {
        MessageThreadBuilder::build(self.messages())
    }
}
