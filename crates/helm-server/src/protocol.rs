//! Wire protocol for the console WebSocket.
//!
//! Field names are camelCase on the wire; the console relies on the exact
//! strings, including the `ws:`-prefixed subscription message types.

use helm_core::events::CanonicalEvent;
use helm_store::PersistedEvent;
use serde::{Deserialize, Serialize};

/// Messages a console sends to the gateway.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Resume a console against an agent instance after a dropped
    /// connection. An absent or zero timestamp asks for full history.
    #[serde(rename = "reconnect", rename_all = "camelCase")]
    Reconnect {
        /// Agent instance to sync against.
        instance_id: String,
        /// Timestamp of the last event the console saw, epoch millis.
        #[serde(default)]
        last_event_timestamp: Option<i64>,
    },

    /// Replace this connection's workspace subscription set.
    #[serde(rename = "ws:subscribe_workspace", rename_all = "camelCase")]
    SubscribeWorkspace {
        /// Workspaces to receive events for.
        workspace_ids: Vec<String>,
    },
}

/// Messages the gateway sends to a console.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to [`ClientMessage::Reconnect`]. `events` is filtered by the
    /// requested boundary; `total_events` is always the unfiltered count.
    #[serde(rename = "pending_events", rename_all = "camelCase")]
    PendingEvents {
        /// Instance the history belongs to.
        instance_id: String,
        /// Events at or after the requested boundary, in order.
        events: Vec<PersistedEvent>,
        /// Unfiltered history length for the instance.
        total_events: usize,
        /// Instance status as known to the gateway.
        status: String,
        /// Reply time, epoch millis.
        timestamp: i64,
    },

    /// Ack for [`ClientMessage::SubscribeWorkspace`].
    #[serde(rename = "ws:subscribed", rename_all = "camelCase")]
    Subscribed {
        /// The now-active subscription set.
        workspace_ids: Vec<String>,
        /// Ack time, epoch millis.
        timestamp: i64,
    },
}

/// One canonical event framed for fan-out.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBroadcast {
    /// Frame discriminant, always `"event"`.
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    /// Session the event belongs to.
    pub session_id: String,
    /// Workspace scope; `None` broadcasts to every connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// The canonical event.
    pub event: CanonicalEvent,
    /// Frame time, epoch millis.
    pub timestamp: i64,
}

impl EventBroadcast {
    /// Frame a canonical event for a session, optionally workspace-scoped.
    #[must_use]
    pub fn new(session_id: &str, workspace_id: Option<&str>, event: CanonicalEvent) -> Self {
        Self {
            frame_type: "event",
            session_id: session_id.to_string(),
            workspace_id: workspace_id.map(str::to_string),
            event,
            timestamp: CanonicalEvent::now_millis(),
        }
    }
}
