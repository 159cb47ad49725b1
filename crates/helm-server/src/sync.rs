//! Reconnection sync: short-horizon in-memory replay.
//!
//! Keeps per-instance event history for the process lifetime so a console
//! that dropped its connection can catch up without a durable-store read.
//! Delivery is at-least-once: the timestamp boundary is inclusive, so the
//! console may see its boundary event twice and must apply idempotently.

use std::collections::HashMap;

use helm_core::events::CanonicalEvent;
use helm_store::PersistedEvent;
use parking_lot::RwLock;
use tracing::debug;

use crate::protocol::ServerMessage;

/// In-memory per-instance event history.
pub struct SyncService {
    histories: RwLock<HashMap<String, Vec<PersistedEvent>>>,
}

impl SyncService {
    /// Create an empty sync service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Record an event into an instance's history.
    pub fn record(&self, instance_id: &str, record: PersistedEvent) {
        self.histories
            .write()
            .entry(instance_id.to_string())
            .or_default()
            .push(record);
    }

    /// Answer a reconnect request.
    ///
    /// An absent or zero boundary returns the full history; otherwise every
    /// event with `timestamp >= last_event_timestamp`. `total_events` is the
    /// unfiltered count either way. An unknown instance gets an empty,
    /// well-formed response rather than an error — the console may simply
    /// have reconnected before the instance produced anything.
    pub fn sync(&self, instance_id: &str, last_event_timestamp: Option<i64>) -> ServerMessage {
        let histories = self.histories.read();
        let history = histories.get(instance_id).map(Vec::as_slice).unwrap_or(&[]);
        let total_events = history.len();

        let events: Vec<PersistedEvent> = match last_event_timestamp {
            None | Some(0) => history.to_vec(),
            Some(boundary) => history
                .iter()
                .filter(|record| record.timestamp >= boundary)
                .cloned()
                .collect(),
        };

        debug!(
            instance_id,
            pending = events.len(),
            total_events,
            "reconnect sync"
        );
        ServerMessage::PendingEvents {
            instance_id: instance_id.to_string(),
            events,
            total_events,
            status: "connected".to_string(),
            timestamp: CanonicalEvent::now_millis(),
        }
    }

    /// History length for an instance.
    #[must_use]
    pub fn history_len(&self, instance_id: &str) -> usize {
        self.histories
            .read()
            .get(instance_id)
            .map_or(0, Vec::len)
    }

    /// Drop an instance's history.
    pub fn forget(&self, instance_id: &str) {
        let _ = self.histories.write().remove(instance_id);
    }
}

impl Default for SyncService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn record(timestamp: i64) -> PersistedEvent {
        PersistedEvent {
            id: format!("evt_{timestamp}"),
            session_id: "s1".into(),
            event_type: "status".into(),
            timestamp,
            payload: json!({"type": "status", "status": "running"}),
        }
    }

    fn service_with(timestamps: &[i64]) -> SyncService {
        let sync = SyncService::new();
        for &ts in timestamps {
            sync.record("i1", record(ts));
        }
        sync
    }

    #[test]
    fn absent_timestamp_returns_full_history() {
        let sync = service_with(&[100, 200, 300]);
        let reply = sync.sync("i1", None);
        assert_matches!(reply, ServerMessage::PendingEvents { events, total_events: 3, .. }
            if events.len() == 3);
    }

    #[test]
    fn zero_timestamp_returns_full_history() {
        let sync = service_with(&[100, 200]);
        let reply = sync.sync("i1", Some(0));
        assert_matches!(reply, ServerMessage::PendingEvents { events, .. } if events.len() == 2);
    }

    #[test]
    fn boundary_is_inclusive() {
        let sync = service_with(&[100, 200, 300]);
        let reply = sync.sync("i1", Some(200));
        assert_matches!(reply, ServerMessage::PendingEvents { events, total_events: 3, .. }
            if events.len() == 2 && events[0].timestamp == 200);
    }

    #[test]
    fn total_events_is_unfiltered() {
        let sync = service_with(&[100, 200, 300, 400]);
        let reply = sync.sync("i1", Some(400));
        assert_matches!(reply, ServerMessage::PendingEvents { events, total_events: 4, .. }
            if events.len() == 1);
    }

    #[test]
    fn unknown_instance_gets_empty_well_formed_reply() {
        let sync = SyncService::new();
        let reply = sync.sync("never_seen", Some(100));
        assert_matches!(reply, ServerMessage::PendingEvents { ref instance_id, ref events, total_events: 0, ref status, .. }
            if instance_id == "never_seen" && events.is_empty() && status == "connected");
    }

    #[test]
    fn histories_are_per_instance() {
        let sync = SyncService::new();
        sync.record("i1", record(100));
        sync.record("i2", record(200));
        assert_eq!(sync.history_len("i1"), 1);
        assert_eq!(sync.history_len("i2"), 1);
        let reply = sync.sync("i1", None);
        assert_matches!(reply, ServerMessage::PendingEvents { events, .. }
            if events.len() == 1 && events[0].timestamp == 100);
    }

    #[test]
    fn forget_drops_history() {
        let sync = service_with(&[100]);
        sync.forget("i1");
        assert_eq!(sync.history_len("i1"), 0);
    }
}
