//! Tool call accumulator
//!
//! Merges [`ToolCallDelta`] fragments of one streaming round into complete
//! [`ToolCall`]s. Fragments are addressed by slot index; fragments of
//! different slots may interleave freely.

use std::collections::BTreeMap;

use super::frame::ToolCallDelta;
use crate::types::ToolCall;

/// Accumulates tool-call deltas for a single round.
///
/// - The first delta of a slot creates an empty call with whatever id it carries.
/// - A later non-empty id replaces the current one.
/// - Name and argument fragments are appended in arrival order.
///
/// Nothing marks a call as complete on the wire; every call is considered
/// final once the round's stream has ended.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAccumulator {
    slots: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one delta into its slot.
    pub fn apply(&mut self, delta: &ToolCallDelta) {
        let call = self.slots.entry(delta.index).or_insert_with(|| {
            tracing::debug!(index = delta.index, "new tool call slot");
            ToolCall::empty(String::new())
        });

        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            if !call.id.is_empty() && call.id != id {
                tracing::debug!(index = delta.index, old = %call.id, new = %id, "tool call id replaced");
            }
            call.id = id.to_string();
        }
        if let Some(name) = &delta.name {
            call.function.name.push_str(name);
        }
        if let Some(arguments) = &delta.arguments {
            call.function.arguments.push_str(arguments);
        }
    }

    /// Current best-known calls, ordered by slot index.
    pub fn snapshot(&self) -> Vec<ToolCall> {
        self.slots.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Consume the accumulator at round end and return the finalized calls.
    pub fn finish(self) -> Vec<ToolCall> {
        self.slots.into_values().collect()
    }
}
