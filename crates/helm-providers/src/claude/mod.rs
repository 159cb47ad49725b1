//! Delta-protocol backend conversion.
//!
//! This backend emits lifecycle markers (`message_start` →
//! `content_block_start` → `content_block_delta`* → `content_block_stop` →
//! `message_stop`) plus a separate, eventually-consistent `assistant`
//! snapshot of the same logical message.
//!
//! [`convert`] is the pure, total mapping for self-contained events;
//! [`ClaudePipeline`] adds the stream reconstruction and snapshot dedup
//! that the delta markers require.

mod converter;
mod types;

pub use converter::{ClaudePipeline, convert, convert_all, convert_at};
pub use types::{ClaudeEvent, ClaudeUsage, NativeBlock, NativeDelta, SnapshotMessage};
