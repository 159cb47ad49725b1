//! Lifecycle-backend conversion — pure, total, stateless.

use helm_core::events::{CanonicalEvent, ToolStatus};
use helm_core::usage::TokenUsage;
use serde_json::{Value, json};
use tracing::trace;

use super::types::{CodexEvent, CodexItem, CodexItemDetails};

/// Tool name for shell executions.
const SHELL_TOOL: &str = "Bash";
/// Tool name for file changes.
const FILE_TOOL: &str = "Edit";
/// Tool name for MCP (generic task) invocations.
const TASK_TOOL: &str = "Task";

fn summarize_changes(changes: &[super::types::FileChange]) -> String {
    changes
        .iter()
        .map(|c| format!("{} {}", c.kind, c.path))
        .collect::<Vec<_>>()
        .join("\n")
}

fn command_completed(
    id: &str,
    command: &str,
    aggregated_output: Option<&str>,
    exit_code: Option<i32>,
    now_ms: i64,
) -> CanonicalEvent {
    // A non-zero exit code is the only error signal the backend gives us.
    let failed = exit_code.is_some_and(|code| code != 0);
    let error = if failed {
        let output = aggregated_output.unwrap_or("");
        if output.is_empty() {
            Some(format!(
                "command failed with exit code {}",
                exit_code.unwrap_or_default()
            ))
        } else {
            Some(output.to_string())
        }
    } else {
        None
    };
    CanonicalEvent::ToolUse {
        id: id.to_string(),
        name: SHELL_TOOL.into(),
        input: json!({"command": command}),
        status: if failed { ToolStatus::Error } else { ToolStatus::Success },
        error,
        timestamp: Some(now_ms),
    }
}

fn item_completed(item: &CodexItem, now_ms: i64) -> Vec<CanonicalEvent> {
    match &item.details {
        CodexItemDetails::CommandExecution {
            command,
            aggregated_output,
            exit_code,
        } => vec![command_completed(
            &item.id,
            command,
            aggregated_output.as_deref(),
            *exit_code,
            now_ms,
        )],

        CodexItemDetails::FileChange { changes, status } => {
            // Error only when the backend explicitly reports failure.
            let failed = status.as_deref() == Some("failed");
            vec![CanonicalEvent::ToolUse {
                id: item.id.clone(),
                name: FILE_TOOL.into(),
                input: json!({
                    "changes": changes.iter().map(|c| json!({"path": c.path, "kind": c.kind})).collect::<Vec<_>>(),
                    "summary": summarize_changes(changes),
                }),
                status: if failed { ToolStatus::Error } else { ToolStatus::Success },
                error: failed.then(|| "file change failed".to_string()),
                timestamp: Some(now_ms),
            }]
        }

        CodexItemDetails::Reasoning { text } => vec![CanonicalEvent::Assistant {
            content: vec![helm_core::events::ContentBlock::Thinking {
                thinking: text.clone(),
            }],
            message_id: Some(item.id.clone()),
            timestamp: Some(now_ms),
        }],

        CodexItemDetails::AgentMessage { text } => vec![CanonicalEvent::Assistant {
            content: vec![helm_core::events::ContentBlock::Text { text: text.clone() }],
            message_id: Some(item.id.clone()),
            timestamp: Some(now_ms),
        }],

        CodexItemDetails::McpToolCall {
            server,
            tool,
            status,
            result,
            error,
        } => {
            let failed = status.as_deref() == Some("failed");
            let result_text = result.as_ref().map(|r| match r {
                Value::String(s) => s.clone(),
                other => serde_json::to_string(other).unwrap_or_default(),
            });
            let mut input = json!({"server": server, "tool": tool});
            if let (Some(text), Some(map)) = (result_text, input.as_object_mut()) {
                let _ = map.insert("result".into(), Value::String(text));
            }
            vec![CanonicalEvent::ToolUse {
                id: item.id.clone(),
                name: TASK_TOOL.into(),
                input,
                status: if failed { ToolStatus::Error } else { ToolStatus::Success },
                error: error.clone(),
                timestamp: Some(now_ms),
            }]
        }
    }
}

fn item_started(item: &CodexItem, now_ms: i64) -> Vec<CanonicalEvent> {
    // A started command/MCP item surfaces as an in-flight tool use so the
    // console can show live activity. Other item starts are noise — the
    // completed form carries everything.
    match &item.details {
        CodexItemDetails::CommandExecution { command, .. } => vec![CanonicalEvent::ToolUse {
            id: item.id.clone(),
            name: SHELL_TOOL.into(),
            input: json!({"command": command}),
            status: ToolStatus::Running,
            error: None,
            timestamp: Some(now_ms),
        }],
        CodexItemDetails::McpToolCall { server, tool, .. } => vec![CanonicalEvent::ToolUse {
            id: item.id.clone(),
            name: TASK_TOOL.into(),
            input: json!({"server": server, "tool": tool}),
            status: ToolStatus::Running,
            error: None,
            timestamp: Some(now_ms),
        }],
        _ => vec![],
    }
}

/// Pure, total conversion of one native event, stamped at `now_ms`.
/// Unrecognized shapes yield `[]`, never an error.
#[must_use]
pub fn convert_at(value: &Value, now_ms: i64) -> Vec<CanonicalEvent> {
    let Some(event) = CodexEvent::parse(value) else {
        trace!("unrecognized lifecycle-backend event; skipped");
        return vec![];
    };
    match event {
        // Noise — thread/turn boundaries carry no renderable content.
        CodexEvent::ThreadStarted { .. } | CodexEvent::TurnStarted {} => vec![],

        CodexEvent::ItemStarted { item } => item_started(&item, now_ms),

        // Superseded by the completed form of the same item id.
        CodexEvent::ItemUpdated { .. } => vec![],

        CodexEvent::ItemCompleted { item } => item_completed(&item, now_ms),

        CodexEvent::TurnCompleted { usage } => match usage {
            Some(usage) => vec![CanonicalEvent::TurnUsage {
                usage: TokenUsage::from_cached_counts(
                    usage.input_tokens,
                    usage.cached_input_tokens,
                    usage.output_tokens,
                ),
                timestamp: Some(now_ms),
            }],
            None => vec![],
        },

        CodexEvent::TurnFailed { error } => {
            let message = error
                .as_ref()
                .and_then(|e| e.get("message").and_then(Value::as_str).map(String::from))
                .or_else(|| error.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| "turn failed".to_string());
            vec![CanonicalEvent::Error {
                message,
                timestamp: Some(now_ms),
            }]
        }

        CodexEvent::Error { message } => vec![CanonicalEvent::Error {
            message: message.unwrap_or_else(|| "provider error".to_string()),
            timestamp: Some(now_ms),
        }],
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
