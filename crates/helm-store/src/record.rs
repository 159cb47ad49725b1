//! The persisted event record.

use helm_core::events::CanonicalEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One line of a session's JSONL log.
///
/// Immutable once written. The canonical event is stored under `payload`
/// with its `type` discriminant duplicated into `eventType` so readers can
/// filter without parsing the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEvent {
    /// Record id, `evt_` + UUIDv7 (time-ordered).
    pub id: String,
    /// Session the record belongs to.
    pub session_id: String,
    /// Canonical event type string.
    pub event_type: String,
    /// Epoch milliseconds at persistence time.
    pub timestamp: i64,
    /// The canonical event, serialized.
    pub payload: Value,
}

impl PersistedEvent {
    /// Wrap a canonical event for persistence.
    ///
    /// The record timestamp is the event's own timestamp when it carries
    /// one, otherwise the current wall clock.
    pub fn from_event(
        session_id: &str,
        event: &CanonicalEvent,
    ) -> Result<Self, serde_json::Error> {
        let timestamp = event
            .timestamp()
            .unwrap_or_else(CanonicalEvent::now_millis);
        Ok(Self {
            id: format!("evt_{}", Uuid::now_v7()),
            session_id: session_id.to_string(),
            event_type: event.event_type().to_string(),
            timestamp,
            payload: serde_json::to_value(event)?,
        })
    }
}
