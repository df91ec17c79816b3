//! Error handling types for toolchat.

mod conversions;
pub mod types;

pub use types::*;
