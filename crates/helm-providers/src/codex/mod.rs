//! Lifecycle-item backend conversion.
//!
//! This backend emits whole work-items as `started`/`updated`/`completed`
//! events — command executions, file changes, reasoning, agent messages,
//! MCP tool calls. No reconstruction is needed: each completed item maps
//! 1:1 to a canonical event, so [`convert`] is the whole story.

mod converter;
mod types;

pub use converter::{convert, convert_all, convert_at};
pub use types::{CodexEvent, CodexItem, CodexUsage, FileChange};
