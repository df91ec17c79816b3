//! Streaming Module
//!
//! Decoding of streamed chat completions:
//! - [`StreamDecoder`] turns the response body into [`StreamFrame`]s
//! - [`ToolCallAccumulator`] merges tool-call deltas into complete calls

mod accumulator;
mod decoder;
mod frame;

pub use accumulator::ToolCallAccumulator;
pub use decoder::{DATA_PREFIX, DONE_SENTINEL, LineDecoder, StreamDecoder};
pub use frame::{StreamFrame, ToolCallDelta};
