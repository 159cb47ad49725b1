//! Per-session conversation context.
//!
//! [`ConversationContext`] is the session controller's bookkeeping: the
//! ordered turn log, the last prompt sent, and cumulative token usage.
//! It is mutated only by the controller.
//!
//! Two merge rules live here because every controller needs them:
//!
//! - **Usage precedence**: the terminal `result` event's usage is
//!   authoritative when present; otherwise the sum of `turn_usage` events
//!   for that turn. The two sources are never added together.
//! - **Tool-use dedup**: the same logical tool use can arrive via both the
//!   delta-snapshot path and the lifecycle-item path. Entries are identified
//!   by provider-assigned id; the first occurrence wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::usage::TokenUsage;

/// Role of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator prompt.
    User,
    /// Agent response.
    Assistant,
}

/// One tool use recorded against a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseRecord {
    /// Provider-assigned tool-use id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool input.
    pub input: Value,
}

/// One entry in the turn log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Who produced the content.
    pub role: Role,
    /// Message content (concatenated text for assistant turns).
    pub content: String,
    /// Tool uses attached to this turn, deduped by id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_uses: Option<Vec<ToolUseRecord>>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Per-session conversation state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// Ordered turn log.
    pub turns: Vec<Turn>,
    /// Most recent prompt sent to the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prompt: Option<String>,
    /// Cumulative session usage.
    pub usage: TokenUsage,
}

impl ConversationContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operator prompt as a user turn and remember it as
    /// `last_prompt`.
    pub fn push_prompt(&mut self, prompt: &str, timestamp: i64) {
        self.last_prompt = Some(prompt.to_string());
        self.turns.push(Turn {
            role: Role::User,
            content: prompt.to_string(),
            tool_uses: None,
            timestamp,
        });
    }

    /// Record an assistant turn.
    pub fn push_assistant(&mut self, content: String, timestamp: i64) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content,
            tool_uses: None,
            timestamp,
        });
    }

    /// Merge tool uses into the most recent assistant turn, deduping by id.
    ///
    /// The first occurrence of an id wins; later duplicates (typically the
    /// lifecycle-item copy of a delta-snapshot tool use) are dropped. If no
    /// assistant turn exists yet the records are dropped — there is nothing
    /// to attach them to.
    pub fn merge_tool_uses(&mut self, records: Vec<ToolUseRecord>) {
        let Some(turn) = self
            .turns
            .iter_mut()
            .rev()
            .find(|t| t.role == Role::Assistant)
        else {
            return;
        };
        let existing = turn.tool_uses.get_or_insert_with(Vec::new);
        for record in records {
            if !existing.iter().any(|r| r.id == record.id) {
                existing.push(record);
            }
        }
    }

    /// Fold one completed turn's usage into the cumulative total.
    ///
    /// `result_usage` (from the terminal `result` event) is authoritative
    /// when present; otherwise the summed `turn_usage` events are used.
    /// The two are never combined.
    pub fn apply_turn_usage(&mut self, turn_usages: &[TokenUsage], result_usage: Option<&TokenUsage>) {
        if let Some(authoritative) = result_usage {
            self.usage.add(authoritative);
            return;
        }
        for usage in turn_usages {
            self.usage.add(usage);
        }
    }
}
