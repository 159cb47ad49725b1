//! Delta-backend conversion: pure mapping plus the stateful pipeline.

use helm_core::events::{CanonicalEvent, ContentBlock};
use helm_core::usage::TokenUsage;
use serde_json::Value;
use tracing::trace;

use crate::accumulator::{BlockState, StreamAccumulator};

use super::types::{ClaudeEvent, ClaudeUsage, NativeBlock, NativeDelta};

fn convert_usage(usage: &ClaudeUsage) -> TokenUsage {
    let mut out = TokenUsage::from_counts(
        usage.input_tokens.unwrap_or(0),
        usage.output_tokens.unwrap_or(0),
    );
    out.cache_read_input_tokens = usage.cache_read_input_tokens;
    out
}

fn convert_snapshot_blocks(blocks: &[NativeBlock]) -> Vec<ContentBlock> {
    blocks
        .iter()
        .map(|block| match block {
            NativeBlock::Text { text } => ContentBlock::Text {
                text: text.clone().unwrap_or_default(),
            },
            NativeBlock::Thinking { thinking } => ContentBlock::Thinking {
                thinking: thinking.clone().unwrap_or_default(),
            },
            NativeBlock::ToolUse { id, name, input } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            },
        })
        .collect()
}

/// Pure, total conversion of one native event, stamped at `now_ms`.
///
/// Delta markers need reconstruction state and therefore yield `[]` here —
/// route them through [`ClaudePipeline`]. Unrecognized shapes yield `[]`.
#[must_use]
pub fn convert_at(value: &Value, now_ms: i64) -> Vec<CanonicalEvent> {
    let Some(event) = ClaudeEvent::parse(value) else {
        trace!("unrecognized delta-backend event; skipped");
        return vec![];
    };
    match event {
        ClaudeEvent::System {
            subtype,
            model,
            session_id: _,
        } => vec![CanonicalEvent::Status {
            status: subtype,
            model,
            timestamp: Some(now_ms),
        }],

        ClaudeEvent::Assistant { message } => vec![CanonicalEvent::Assistant {
            content: convert_snapshot_blocks(&message.content),
            message_id: message.id,
            timestamp: Some(now_ms),
        }],

        ClaudeEvent::Result {
            is_error,
            result,
            usage,
            session_id,
        } => vec![CanonicalEvent::Result {
            is_error: is_error.unwrap_or(false),
            result,
            usage: usage.as_ref().map(convert_usage),
            provider_session_id: session_id,
            model: None,
            timestamp: Some(now_ms),
        }],

        // Stateful markers: handled by the pipeline, nothing to emit here.
        ClaudeEvent::MessageStart { .. }
        | ClaudeEvent::ContentBlockStart { .. }
        | ClaudeEvent::ContentBlockDelta { .. }
        | ClaudeEvent::ContentBlockStop { .. }
        | ClaudeEvent::MessageDelta { .. }
        | ClaudeEvent::MessageStop {} => vec![],
    }
}

/// [`convert_at`] stamped with the current wall clock.
#[must_use]
pub fn convert(value: &Value) -> Vec<CanonicalEvent> {
    convert_at(value, CanonicalEvent::now_millis())
}

/// Batch convenience: convert an ordered sequence, concatenating results.
#[must_use]
pub fn convert_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<CanonicalEvent> {
    values.into_iter().flat_map(convert).collect()
}

/// Stateful conversion pipeline for one session's delta stream.
///
/// Owns a [`StreamAccumulator`]: delta markers build up the in-flight
/// message, `message_stop` synthesizes the canonical `assistant` event plus
/// one `turn_usage` event (input tokens from `message_start`, output tokens
/// from `message_delta`), and late snapshot copies of the same message are
/// suppressed.
#[derive(Debug, Default)]
pub struct ClaudePipeline {
    accumulator: StreamAccumulator,
    pending_input_tokens: Option<u64>,
    pending_output_tokens: Option<u64>,
}

impl ClaudePipeline {
    /// Create an idle pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the message currently being assembled.
    #[must_use]
    pub fn partial(&self) -> Option<&crate::accumulator::StreamingMessageState> {
        self.accumulator.partial()
    }

    /// Push one native event, stamped at `now_ms`.
    pub fn push_at(&mut self, value: &Value, now_ms: i64) -> Vec<CanonicalEvent> {
        let Some(event) = ClaudeEvent::parse(value) else {
            trace!("unrecognized delta-backend event; skipped");
            return vec![];
        };
        match event {
            ClaudeEvent::MessageStart { message } => {
                self.accumulator.start_message(message.id, now_ms);
                self.pending_input_tokens =
                    message.usage.as_ref().and_then(|u| u.input_tokens);
                self.pending_output_tokens = None;
                vec![]
            }

            ClaudeEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.ensure_block(index, Some(&content_block), None);
                vec![]
            }

            ClaudeEvent::ContentBlockDelta { index, delta } => {
                // Tolerate a missing block start by seeding from the delta kind.
                self.ensure_block(index, None, Some(&delta));
                match delta {
                    NativeDelta::TextDelta { text } => self.accumulator.append_text(index, &text),
                    NativeDelta::ThinkingDelta { thinking } => {
                        self.accumulator.append_thinking(index, &thinking);
                    }
                    NativeDelta::InputJsonDelta { partial_json } => {
                        self.accumulator.append_input_json(index, &partial_json);
                    }
                }
                vec![]
            }

            ClaudeEvent::ContentBlockStop { index } => {
                self.accumulator.stop_block(index);
                vec![]
            }

            ClaudeEvent::MessageDelta { usage } => {
                if let Some(output) = usage.and_then(|u| u.output_tokens) {
                    self.pending_output_tokens = Some(output);
                }
                vec![]
            }

            ClaudeEvent::MessageStop {} => {
                let mut events = Vec::new();
                if let Some(assistant) = self.accumulator.stop_message(now_ms) {
                    events.push(assistant);
                }
                if self.pending_input_tokens.is_some() || self.pending_output_tokens.is_some() {
                    events.push(CanonicalEvent::TurnUsage {
                        usage: TokenUsage::from_counts(
                            self.pending_input_tokens.take().unwrap_or(0),
                            self.pending_output_tokens.take().unwrap_or(0),
                        ),
                        timestamp: Some(now_ms),
                    });
                }
                events
            }

            ClaudeEvent::Assistant { .. } => convert_at(value, now_ms)
                .into_iter()
                .filter_map(|e| self.accumulator.filter_snapshot(e))
                .collect(),

            ClaudeEvent::System { .. } | ClaudeEvent::Result { .. } => convert_at(value, now_ms),
        }
    }

    /// Push one native event stamped with the current wall clock.
    pub fn push(&mut self, value: &Value) -> Vec<CanonicalEvent> {
        self.push_at(value, CanonicalEvent::now_millis())
    }

    /// Seed the block at `index` when it was never started, using the
    /// explicit seed when present, otherwise the delta kind.
    fn ensure_block(&mut self, index: usize, seed: Option<&NativeBlock>, delta: Option<&NativeDelta>) {
        let existing = self.accumulator.partial().map_or(0, |s| s.blocks.len());
        if index != existing {
            return;
        }
        let block = match (seed, delta) {
            (Some(NativeBlock::Text { .. }), _) | (None, Some(NativeDelta::TextDelta { .. })) => {
                BlockState::Text(String::new())
            }
            (Some(NativeBlock::Thinking { .. }), _)
            | (None, Some(NativeDelta::ThinkingDelta { .. })) => BlockState::Thinking(String::new()),
            (Some(NativeBlock::ToolUse { id, name, .. }), _) => BlockState::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input_json: String::new(),
            },
            // An input fragment with no block start has no id/name to seed.
            (None, Some(NativeDelta::InputJsonDelta { .. })) | (None, None) => return,
        };
        self.accumulator.start_block(block);
    }
}
