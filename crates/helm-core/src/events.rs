//! Canonical event types.
//!
//! [`CanonicalEvent`] is the single, provider-agnostic vocabulary that both
//! upstream backends are converted into. It is a closed tagged union — new
//! event kinds are added here and nowhere else, so every consumer match is
//! exhaustively checked by the compiler.
//!
//! Events from delta-based providers carry no stable identifier other than
//! timestamp + content; `message_id` is populated only when the provider
//! supplied one, and identity for dedup purposes is best-effort.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::usage::TokenUsage;

/// One content block inside an assistant message, in emission order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain assistant text.
    Text {
        /// Accumulated text.
        text: String,
    },
    /// Extended-thinking text.
    Thinking {
        /// Accumulated thinking text.
        thinking: String,
    },
    /// A tool invocation requested by the assistant.
    ToolUse {
        /// Provider-assigned tool-use id.
        id: String,
        /// Tool name.
        name: String,
        /// Parsed tool input (empty object when the input never parsed).
        input: Value,
    },
}

/// Lifecycle state of a tool invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Invocation is in flight.
    Running,
    /// Invocation finished successfully.
    Success,
    /// Invocation failed.
    Error,
}

/// The unified event representation all downstream code consumes.
///
/// Wire format is `{"type": "...", ...}` with camelCase field names —
/// the console frontend relies on the exact strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalEvent {
    /// A complete assistant message with ordered content blocks.
    Assistant {
        /// Ordered content blocks.
        content: Vec<ContentBlock>,
        /// Provider-supplied message id, when one exists.
        #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// A tool invocation with its lifecycle status.
    ToolUse {
        /// Provider-assigned tool-use id.
        id: String,
        /// Tool name.
        name: String,
        /// Tool input.
        input: Value,
        /// Lifecycle state.
        status: ToolStatus,
        /// Error text when `status == Error`.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Output produced by a tool invocation.
    ToolResult {
        /// Id of the tool use this result belongs to.
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        /// Textual output for display.
        output: String,
        /// Whether the tool reported failure.
        #[serde(rename = "isError")]
        is_error: bool,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Terminal outcome of one turn.
    Result {
        /// Whether the turn ended in failure.
        #[serde(rename = "isError")]
        is_error: bool,
        /// Result text, when the provider produced one.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        /// Authoritative turn usage, when the provider reported it here.
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
        /// Provider-assigned session id, used as the next turn's resume token.
        #[serde(rename = "providerSessionId", skip_serializing_if = "Option::is_none")]
        provider_session_id: Option<String>,
        /// Model that served the turn, when reported.
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Token counts attributable to one turn, emitted independently of
    /// `result` so consumers never double count.
    TurnUsage {
        /// Token counts.
        usage: TokenUsage,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Session status change.
    Status {
        /// Status string (e.g. `init`, `running`, `stopped`).
        status: String,
        /// Model reported alongside the status, when present.
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Session-level error.
    Error {
        /// Human-readable message.
        message: String,
        /// Epoch milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

impl CanonicalEvent {
    /// Get the event type string (for type discrimination and persistence).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Assistant { .. } => "assistant",
            Self::ToolUse { .. } => "tool_use",
            Self::ToolResult { .. } => "tool_result",
            Self::Result { .. } => "result",
            Self::TurnUsage { .. } => "turn_usage",
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
        }
    }

    /// Get the event timestamp in epoch milliseconds, when present.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Assistant { timestamp, .. }
            | Self::ToolUse { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::Result { timestamp, .. }
            | Self::TurnUsage { timestamp, .. }
            | Self::Status { timestamp, .. }
            | Self::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Current wall-clock time as epoch milliseconds.
    #[must_use]
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_round_trips() {
        let event = CanonicalEvent::Assistant {
            content: vec![
                ContentBlock::Text {
                    text: "hello".into(),
                },
                ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "Bash".into(),
                    input: json!({"command": "ls"}),
                },
            ],
            message_id: Some("msg_1".into()),
            timestamp: Some(1_700_000_000_000),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: CanonicalEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn wire_tag_is_type() {
        let event = CanonicalEvent::Status {
            status: "init".into(),
            model: Some("opus".into()),
            timestamp: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["model"], "opus");
    }

    #[test]
    fn optional_fields_omitted_when_unset() {
        let event = CanonicalEvent::Result {
            is_error: false,
            result: None,
            usage: None,
            provider_session_id: None,
            model: None,
            timestamp: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("usage").is_none());
        assert!(value.get("providerSessionId").is_none());
        assert_eq!(value["isError"], false);
    }

    #[test]
    fn event_type_strings() {
        let event = CanonicalEvent::TurnUsage {
            usage: crate::usage::TokenUsage::default(),
            timestamp: None,
        };
        assert_eq!(event.event_type(), "turn_usage");

        let event = CanonicalEvent::Error {
            message: "boom".into(),
            timestamp: Some(5),
        };
        assert_eq!(event.event_type(), "error");
        assert_eq!(event.timestamp(), Some(5));
    }

    #[test]
    fn tool_use_camel_case_fields() {
        let event = CanonicalEvent::ToolResult {
            tool_use_id: "tu_9".into(),
            output: "ok".into(),
            is_error: false,
            timestamp: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["toolUseId"], "tu_9");
        assert_eq!(value["isError"], false);
    }

    #[test]
    fn content_block_tags() {
        let block = ContentBlock::Thinking {
            thinking: "hmm".into(),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "thinking");

        let block = ContentBlock::ToolUse {
            id: "t".into(),
            name: "Task".into(),
            input: json!({}),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_use");
    }

    #[test]
    fn tool_status_snake_case() {
        assert_eq!(
            serde_json::to_value(ToolStatus::Running).unwrap(),
            json!("running")
        );
        assert_eq!(
            serde_json::to_value(ToolStatus::Error).unwrap(),
            json!("error")
        );
    }
}
