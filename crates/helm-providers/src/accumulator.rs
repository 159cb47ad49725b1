//! Stream accumulator — reconstructs complete assistant messages from
//! ordered delta events and suppresses late-arriving snapshot duplicates.
//!
//! One accumulator per session, one in-flight message at a time:
//!
//! - **Idle → Building** on `message_start`
//! - **Building → Building** on block starts/deltas (block stop is a no-op;
//!   finalization happens at message level)
//! - **Building → Idle** on `message_stop`, producing one canonical
//!   `assistant` event
//!
//! The delta-protocol backend later resends a completed snapshot of the
//! same logical message. [`StreamAccumulator::filter_snapshot`] decides
//! whether an incoming snapshot duplicates the last synthesized message:
//! matching provider message ids suppress it; with no ids on either side a
//! snapshot timestamped within [`DEDUP_WINDOW_MS`] after synthesis (0
//! inclusive, negative deltas excluded) suppresses it. Id presence on only
//! one side disables the timestamp fallback — false-positive suppression
//! is worse than a duplicate. The window is a heuristic for provider
//! version skew, not a guarantee.

use helm_core::events::{CanonicalEvent, ContentBlock};
use serde_json::Value;
use tracing::{debug, trace};

/// How long after synthesis an id-less snapshot is treated as a duplicate.
pub const DEDUP_WINDOW_MS: i64 = 1_000;

/// One content block being assembled.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockState {
    /// Text accumulated by concatenation.
    Text(String),
    /// Thinking accumulated by concatenation.
    Thinking(String),
    /// Tool use accumulating a raw JSON input fragment.
    ToolUse {
        /// Provider-assigned tool-use id.
        id: String,
        /// Tool name.
        name: String,
        /// Raw JSON fragment; parsed at finalization, tolerating partial
        /// or invalid JSON as "no input yet".
        input_json: String,
    },
}

/// Transient state for one in-flight provider message.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamingMessageState {
    /// Blocks in arrival order, addressed by provider block index.
    pub blocks: Vec<BlockState>,
    /// When the message started, epoch ms.
    pub started_at: i64,
    /// Provider-supplied message id, when one exists.
    pub message_id: Option<String>,
}

/// Record of the last finalized message, kept for snapshot dedup.
#[derive(Clone, Debug)]
struct Synthesized {
    timestamp: i64,
    message_id: Option<String>,
}

/// Per-session message reconstruction state machine.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    building: Option<StreamingMessageState>,
    last_synthesized: Option<Synthesized>,
}

impl StreamAccumulator {
    /// Create an idle accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message is currently being assembled.
    #[must_use]
    pub fn is_building(&self) -> bool {
        self.building.is_some()
    }

    /// Read-only view of the in-flight message, for live display.
    /// Never persisted — only the finalized event reaches the store.
    #[must_use]
    pub fn partial(&self) -> Option<&StreamingMessageState> {
        self.building.as_ref()
    }

    /// Begin assembling a message. An unfinished previous message is
    /// abandoned — the provider never interleaves two messages.
    pub fn start_message(&mut self, message_id: Option<String>, timestamp: i64) {
        if self.building.is_some() {
            debug!("message_start while building; abandoning previous partial message");
        }
        self.building = Some(StreamingMessageState {
            blocks: Vec::new(),
            started_at: timestamp,
            message_id,
        });
    }

    /// Open a new content block at the next index.
    pub fn start_block(&mut self, block: BlockState) {
        if let Some(state) = self.building.as_mut() {
            state.blocks.push(block);
        } else {
            trace!("block start while idle; ignored");
        }
    }

    /// Mutable access to the block at `index`, when building.
    fn block_mut(&mut self, index: usize) -> Option<&mut BlockState> {
        self.building.as_mut()?.blocks.get_mut(index)
    }

    /// Append a text fragment to the block at `index`.
    pub fn append_text(&mut self, index: usize, delta: &str) {
        if let Some(BlockState::Text(buf)) = self.block_mut(index) {
            buf.push_str(delta);
        }
    }

    /// Append a thinking fragment to the block at `index`.
    pub fn append_thinking(&mut self, index: usize, delta: &str) {
        if let Some(BlockState::Thinking(buf)) = self.block_mut(index) {
            buf.push_str(delta);
        }
    }

    /// Append a raw JSON input fragment to the tool-use block at `index`.
    pub fn append_input_json(&mut self, index: usize, delta: &str) {
        if let Some(BlockState::ToolUse { input_json, .. }) = self.block_mut(index) {
            input_json.push_str(delta);
        }
    }

    /// Block stop is a no-op; finalization happens at message level.
    pub fn stop_block(&mut self, _index: usize) {}

    /// Finalize the in-flight message into one canonical `assistant` event.
    ///
    /// Content blocks are, in order: the accumulated text, the accumulated
    /// thinking, and each tool use with its JSON-parsed input (empty object
    /// when the fragment never became valid JSON). Returns `None` when idle.
    pub fn stop_message(&mut self, timestamp: i64) -> Option<CanonicalEvent> {
        let state = self.building.take()?;

        let mut text: Option<String> = None;
        let mut thinking: Option<String> = None;
        let mut tool_uses: Vec<ContentBlock> = Vec::new();
        for block in state.blocks {
            match block {
                BlockState::Text(t) => text.get_or_insert_with(String::new).push_str(&t),
                BlockState::Thinking(t) => thinking.get_or_insert_with(String::new).push_str(&t),
                BlockState::ToolUse {
                    id,
                    name,
                    input_json,
                } => {
                    let input = serde_json::from_str::<Value>(&input_json)
                        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
                    tool_uses.push(ContentBlock::ToolUse { id, name, input });
                }
            }
        }

        let mut content = Vec::new();
        if let Some(text) = text {
            content.push(ContentBlock::Text { text });
        }
        if let Some(thinking) = thinking {
            content.push(ContentBlock::Thinking { thinking });
        }
        content.extend(tool_uses);

        self.last_synthesized = Some(Synthesized {
            timestamp,
            message_id: state.message_id.clone(),
        });

        Some(CanonicalEvent::Assistant {
            content,
            message_id: state.message_id,
            timestamp: Some(timestamp),
        })
    }

    /// Decide whether a snapshot `assistant` event duplicates the last
    /// synthesized message. Returns the event when it should survive,
    /// `None` when suppressed.
    ///
    /// One decision consumes the synthesis record either way, so a later,
    /// unrelated snapshot at a similar timestamp is never dropped by the
    /// timestamp fallback.
    pub fn filter_snapshot(&mut self, event: CanonicalEvent) -> Option<CanonicalEvent> {
        let CanonicalEvent::Assistant {
            ref message_id,
            timestamp,
            ..
        } = event
        else {
            return Some(event);
        };

        let Some(last) = self.last_synthesized.take() else {
            return Some(event);
        };

        let duplicate = match (&last.message_id, message_id) {
            (Some(synth_id), Some(snap_id)) => synth_id == snap_id,
            (None, None) => timestamp
                .is_some_and(|ts| (0..DEDUP_WINDOW_MS).contains(&(ts - last.timestamp))),
            // Id on one side only: distinct. The timestamp fallback is
            // disabled to avoid false-positive suppression.
            _ => false,
        };

        if duplicate {
            debug!(message_id = ?message_id, "suppressed duplicate assistant snapshot");
            None
        } else {
            Some(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn snapshot(message_id: Option<&str>, timestamp: i64) -> CanonicalEvent {
        CanonicalEvent::Assistant {
            content: vec![ContentBlock::Text { text: "Hi".into() }],
            message_id: message_id.map(Into::into),
            timestamp: Some(timestamp),
        }
    }

    fn finalize_simple(acc: &mut StreamAccumulator, message_id: Option<&str>, at: i64) {
        acc.start_message(message_id.map(Into::into), at - 10);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(0, "Hi");
        let _ = acc.stop_message(at).unwrap();
    }

    #[test]
    fn text_deltas_concatenate_in_order() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(None, 0);
        acc.start_block(BlockState::Text(String::new()));
        for delta in ["Hel", "", "lo ", "world"] {
            acc.append_text(0, delta);
        }
        acc.stop_block(0);
        let event = acc.stop_message(100).unwrap();
        assert_matches!(event, CanonicalEvent::Assistant { ref content, .. } => {
            assert_eq!(content, &[ContentBlock::Text { text: "Hello world".into() }]);
        });
    }

    #[test]
    fn all_empty_deltas_yield_empty_text_block() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(None, 0);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(0, "");
        let event = acc.stop_message(10).unwrap();
        assert_matches!(event, CanonicalEvent::Assistant { ref content, .. } => {
            assert_eq!(content, &[ContentBlock::Text { text: String::new() }]);
        });
    }

    #[test]
    fn content_order_text_thinking_tools() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(Some("msg_1".into()), 0);
        acc.start_block(BlockState::Thinking(String::new()));
        acc.append_thinking(0, "pondering");
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(1, "answer");
        acc.start_block(BlockState::ToolUse {
            id: "tu_1".into(),
            name: "Bash".into(),
            input_json: String::new(),
        });
        acc.append_input_json(2, "{\"command\":");
        acc.append_input_json(2, "\"ls\"}");
        let event = acc.stop_message(50).unwrap();

        assert_matches!(event, CanonicalEvent::Assistant { content, message_id, .. } => {
            assert_eq!(message_id.as_deref(), Some("msg_1"));
            assert_eq!(content[0], ContentBlock::Text { text: "answer".into() });
            assert_eq!(content[1], ContentBlock::Thinking { thinking: "pondering".into() });
            assert_eq!(content[2], ContentBlock::ToolUse {
                id: "tu_1".into(),
                name: "Bash".into(),
                input: json!({"command": "ls"}),
            });
        });
    }

    #[test]
    fn unparsable_tool_input_becomes_empty_object() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(None, 0);
        acc.start_block(BlockState::ToolUse {
            id: "tu_1".into(),
            name: "Edit".into(),
            input_json: String::new(),
        });
        acc.append_input_json(0, "{\"path\": \"src/");
        let event = acc.stop_message(10).unwrap();
        assert_matches!(event, CanonicalEvent::Assistant { content, .. } => {
            assert_eq!(content[0], ContentBlock::ToolUse {
                id: "tu_1".into(),
                name: "Edit".into(),
                input: json!({}),
            });
        });
    }

    #[test]
    fn stop_while_idle_returns_none() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.stop_message(10).is_none());
    }

    #[test]
    fn deltas_while_idle_ignored() {
        let mut acc = StreamAccumulator::new();
        acc.append_text(0, "lost");
        acc.start_block(BlockState::Text(String::new()));
        assert!(!acc.is_building());
    }

    #[test]
    fn delta_for_wrong_block_kind_ignored() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(None, 0);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_thinking(0, "nope");
        acc.append_input_json(0, "nope");
        acc.append_text(0, "yes");
        let event = acc.stop_message(10).unwrap();
        assert_matches!(event, CanonicalEvent::Assistant { content, .. } => {
            assert_eq!(content, vec![ContentBlock::Text { text: "yes".into() }]);
        });
    }

    #[test]
    fn partial_view_while_building() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.partial().is_none());
        acc.start_message(Some("msg_1".into()), 5);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(0, "par");
        let partial = acc.partial().unwrap();
        assert_eq!(partial.message_id.as_deref(), Some("msg_1"));
        assert_eq!(partial.blocks, vec![BlockState::Text("par".into())]);
    }

    #[test]
    fn restart_abandons_previous_message() {
        let mut acc = StreamAccumulator::new();
        acc.start_message(None, 0);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(0, "abandoned");
        acc.start_message(None, 10);
        acc.start_block(BlockState::Text(String::new()));
        acc.append_text(0, "kept");
        let event = acc.stop_message(20).unwrap();
        assert_matches!(event, CanonicalEvent::Assistant { content, .. } => {
            assert_eq!(content, vec![ContentBlock::Text { text: "kept".into() }]);
        });
    }

    // ── Snapshot dedup ──────────────────────────────────────────────────

    #[test]
    fn matching_ids_suppress() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, Some("msg_1"), 1000);
        assert!(acc.filter_snapshot(snapshot(Some("msg_1"), 5000)).is_none());
    }

    #[test]
    fn differing_ids_survive() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, Some("msg_1"), 1000);
        assert!(acc.filter_snapshot(snapshot(Some("msg_2"), 1000)).is_some());
    }

    #[test]
    fn no_ids_within_window_suppress() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(None, 1999)).is_none());
    }

    #[test]
    fn no_ids_at_exact_synthesis_time_suppress() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(None, 1000)).is_none());
    }

    #[test]
    fn no_ids_at_window_boundary_survive() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(None, 2000)).is_some());
    }

    #[test]
    fn no_ids_before_synthesis_survive() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(None, 999)).is_some());
    }

    #[test]
    fn id_on_one_side_disables_timestamp_fallback() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, Some("msg_1"), 1000);
        assert!(acc.filter_snapshot(snapshot(None, 1000)).is_some());

        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(Some("msg_1"), 1000)).is_some());
    }

    #[test]
    fn decision_consumed_after_one_snapshot() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        assert!(acc.filter_snapshot(snapshot(None, 1500)).is_none());
        // Second snapshot at a similar timestamp is unrelated — survives.
        assert!(acc.filter_snapshot(snapshot(None, 1600)).is_some());
    }

    #[test]
    fn snapshot_without_prior_synthesis_survives() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.filter_snapshot(snapshot(None, 100)).is_some());
    }

    #[test]
    fn non_assistant_events_pass_through() {
        let mut acc = StreamAccumulator::new();
        finalize_simple(&mut acc, None, 1000);
        let status = CanonicalEvent::Status {
            status: "running".into(),
            model: None,
            timestamp: Some(1001),
        };
        assert_eq!(acc.filter_snapshot(status.clone()), Some(status));
        // Passing a non-assistant event does not consume the record.
        assert!(acc.filter_snapshot(snapshot(None, 1001)).is_none());
    }

    // ── Property: synthesized text equals ordered delta concatenation ──

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn text_is_exact_concatenation(deltas in proptest::collection::vec(".{0,12}", 0..24)) {
                let mut acc = StreamAccumulator::new();
                acc.start_message(None, 0);
                acc.start_block(BlockState::Text(String::new()));
                for delta in &deltas {
                    acc.append_text(0, delta);
                }
                let event = acc.stop_message(1).unwrap();
                let expected: String = deltas.concat();
                prop_assert_eq!(event, CanonicalEvent::Assistant {
                    content: vec![ContentBlock::Text { text: expected }],
                    message_id: None,
                    timestamp: Some(1),
                });
            }
        }
    }
}
