//! Native event types for the lifecycle-item backend.

use serde::Deserialize;
use serde_json::Value;

/// Token usage on `turn.completed`. Cached input is reported separately
/// from fresh input and must be folded in during conversion.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct CodexUsage {
    /// Fresh input tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Input tokens served from cache.
    #[serde(default)]
    pub cached_input_tokens: u64,
    /// Output tokens.
    #[serde(default)]
    pub output_tokens: u64,
}

/// One changed path in a `file_change` item.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    /// Path that changed.
    pub path: String,
    /// Change kind (`add`, `update`, `delete`).
    pub kind: String,
}

/// One unit of work, tagged by item type.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum CodexItemDetails {
    /// A shell command run by the agent.
    CommandExecution {
        /// The command line.
        command: String,
        /// Combined stdout/stderr.
        #[serde(default)]
        aggregated_output: Option<String>,
        /// Exit code, present once the command finished.
        #[serde(default)]
        exit_code: Option<i32>,
    },
    /// Files changed by the agent.
    FileChange {
        /// Changed paths with their change kinds.
        #[serde(default)]
        changes: Vec<FileChange>,
        /// Item status as the backend reports it (`completed`, `failed`).
        #[serde(default)]
        status: Option<String>,
    },
    /// A reasoning block.
    Reasoning {
        /// Reasoning text.
        #[serde(default)]
        text: String,
    },
    /// A plain assistant message.
    AgentMessage {
        /// Message text.
        #[serde(default)]
        text: String,
    },
    /// An MCP tool invocation.
    McpToolCall {
        /// MCP server name.
        server: String,
        /// Tool name on that server.
        tool: String,
        /// Item status as the backend reports it (`completed`, `failed`).
        #[serde(default)]
        status: Option<String>,
        /// Structured result, serialized to text for display.
        #[serde(default)]
        result: Option<Value>,
        /// Error text on failure.
        #[serde(default)]
        error: Option<String>,
    },
}

/// A work-item envelope: id plus typed details.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CodexItem {
    /// Backend-assigned item id, stable across started/updated/completed.
    pub id: String,
    /// The item itself.
    #[serde(flatten)]
    pub details: CodexItemDetails,
}

/// One native event from the lifecycle-item backend.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodexEvent {
    /// Thread opened — noise.
    #[serde(rename = "thread.started")]
    ThreadStarted {
        /// Backend thread id (the resume token).
        #[serde(default)]
        thread_id: Option<String>,
    },
    /// Turn opened — noise.
    #[serde(rename = "turn.started")]
    TurnStarted {},
    /// A work-item began.
    #[serde(rename = "item.started")]
    ItemStarted {
        /// The item.
        item: CodexItem,
    },
    /// A work-item progressed — superseded by its completed form.
    #[serde(rename = "item.updated")]
    ItemUpdated {
        /// The item.
        item: CodexItem,
    },
    /// A work-item finished.
    #[serde(rename = "item.completed")]
    ItemCompleted {
        /// The item.
        item: CodexItem,
    },
    /// Turn finished; carries the terminal usage.
    #[serde(rename = "turn.completed")]
    TurnCompleted {
        /// Usage for the turn.
        #[serde(default)]
        usage: Option<CodexUsage>,
    },
    /// Turn failed.
    #[serde(rename = "turn.failed")]
    TurnFailed {
        /// Failure description.
        #[serde(default)]
        error: Option<Value>,
    },
    /// Backend-level error.
    Error {
        /// Error message.
        #[serde(default)]
        message: Option<String>,
    },
}

impl CodexEvent {
    /// Try to parse a native event. `None` means an unrecognized shape,
    /// which converts to no canonical events.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
