//! Native event types for the delta-protocol backend.
//!
//! Parsed from the backend's JSON event stream. Parsing is tolerant by
//! construction: the converter tries a typed parse and treats failure as
//! an unrecognized shape, so malformed input can never surface as an error.

use serde::Deserialize;
use serde_json::Value;

/// Token usage as the backend reports it.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ClaudeUsage {
    /// Input tokens.
    #[serde(default)]
    pub input_tokens: Option<u64>,
    /// Output tokens.
    #[serde(default)]
    pub output_tokens: Option<u64>,
    /// Tokens read from prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// A content block as carried on `content_block_start` and snapshots.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeBlock {
    /// Text block (seed text present on snapshots, absent on starts).
    Text {
        /// Seed or complete text.
        #[serde(default)]
        text: Option<String>,
    },
    /// Thinking block.
    Thinking {
        /// Seed or complete thinking text.
        #[serde(default)]
        thinking: Option<String>,
    },
    /// Tool-use block.
    ToolUse {
        /// Provider-assigned tool-use id.
        id: String,
        /// Tool name.
        name: String,
        /// Complete input (snapshots only).
        #[serde(default)]
        input: Option<Value>,
    },
}

/// An incremental fragment on `content_block_delta`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeDelta {
    /// Text fragment.
    TextDelta {
        /// Fragment, possibly empty.
        text: String,
    },
    /// Thinking fragment.
    ThinkingDelta {
        /// Fragment, possibly empty.
        thinking: String,
    },
    /// Raw JSON fragment of a tool-use input.
    InputJsonDelta {
        /// Fragment of the input JSON.
        partial_json: String,
    },
}

/// Message header on `message_start` and `assistant` snapshots.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SnapshotMessage {
    /// Provider-supplied message id.
    #[serde(default)]
    pub id: Option<String>,
    /// Model serving the message.
    #[serde(default)]
    pub model: Option<String>,
    /// Content blocks (snapshots only).
    #[serde(default)]
    pub content: Vec<NativeBlock>,
    /// Usage attached to the message header.
    #[serde(default)]
    pub usage: Option<ClaudeUsage>,
}

/// One native event from the delta-protocol backend.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeEvent {
    /// Backend status (subtype `init` carries the model id).
    System {
        /// Status subtype.
        subtype: String,
        /// Model id, on `init`.
        #[serde(default)]
        model: Option<String>,
        /// Provider session id.
        #[serde(default)]
        session_id: Option<String>,
    },

    /// Eventually-consistent snapshot of a complete assistant message.
    Assistant {
        /// The complete message.
        message: SnapshotMessage,
    },

    /// A new message began streaming.
    MessageStart {
        /// Message header; usage here carries the input-token count.
        message: SnapshotMessage,
    },

    /// A content block opened.
    ContentBlockStart {
        /// Block index within the message.
        index: usize,
        /// Seed block.
        content_block: NativeBlock,
    },

    /// A content fragment arrived.
    ContentBlockDelta {
        /// Block index within the message.
        index: usize,
        /// The fragment.
        delta: NativeDelta,
    },

    /// A content block closed.
    ContentBlockStop {
        /// Block index within the message.
        index: usize,
    },

    /// Message-level delta; usage here carries the output-token count.
    MessageDelta {
        /// Usage fragment.
        #[serde(default)]
        usage: Option<ClaudeUsage>,
    },

    /// The message finished streaming.
    MessageStop {},

    /// Terminal outcome of the turn.
    Result {
        /// Whether the turn failed.
        #[serde(default)]
        is_error: Option<bool>,
        /// Result text.
        #[serde(default)]
        result: Option<String>,
        /// Usage for the whole turn, when reported here.
        #[serde(default)]
        usage: Option<ClaudeUsage>,
        /// Provider session id — the next turn's resume token.
        #[serde(default)]
        session_id: Option<String>,
    },
}

impl ClaudeEvent {
    /// Try to parse a native event. `None` means an unrecognized shape,
    /// which converts to no canonical events.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_message_start_with_usage() {
        let event = ClaudeEvent::parse(&json!({
            "type": "message_start",
            "message": {"id": "msg_1", "usage": {"input_tokens": 100}}
        }))
        .unwrap();
        let ClaudeEvent::MessageStart { message } = event else {
            panic!("wrong variant");
        };
        assert_eq!(message.id.as_deref(), Some("msg_1"));
        assert_eq!(message.usage.unwrap().input_tokens, Some(100));
    }

    #[test]
    fn parses_delta_kinds() {
        let event = ClaudeEvent::parse(&json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "{\"a\":"}
        }))
        .unwrap();
        let ClaudeEvent::ContentBlockDelta { delta, .. } = event else {
            panic!("wrong variant");
        };
        assert_eq!(
            delta,
            NativeDelta::InputJsonDelta {
                partial_json: "{\"a\":".into()
            }
        );
    }

    #[test]
    fn unknown_type_fails_parse() {
        assert!(ClaudeEvent::parse(&json!({"type": "rate_limit_update"})).is_none());
        assert!(ClaudeEvent::parse(&json!("not an object")).is_none());
        assert!(ClaudeEvent::parse(&json!({"no_type": true})).is_none());
    }

    #[test]
    fn snapshot_content_blocks() {
        let event = ClaudeEvent::parse(&json!({
            "type": "assistant",
            "message": {
                "id": "msg_2",
                "content": [
                    {"type": "text", "text": "Hi"},
                    {"type": "tool_use", "id": "tu_1", "name": "Bash", "input": {"command": "ls"}}
                ]
            }
        }))
        .unwrap();
        let ClaudeEvent::Assistant { message } = event else {
            panic!("wrong variant");
        };
        assert_eq!(message.content.len(), 2);
    }
}
