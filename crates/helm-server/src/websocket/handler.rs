//! Console message dispatch.
//!
//! Malformed or unrecognized messages are logged and ignored — a console
//! speaking a newer protocol revision must not kill the connection.

use helm_core::events::CanonicalEvent;
use tracing::{debug, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::sync::SyncService;

use super::connection::ClientConnection;

/// Handle one incoming text message. Returns the reply to send, if any.
pub fn handle_message(
    message: &str,
    connection: &ClientConnection,
    sync: &SyncService,
) -> Option<ServerMessage> {
    let parsed: ClientMessage = match serde_json::from_str(message) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(conn_id = %connection.id, error = %err, "unrecognized message, ignoring");
            return None;
        }
    };

    match parsed {
        ClientMessage::Reconnect {
            instance_id,
            last_event_timestamp,
        } => {
            debug!(conn_id = %connection.id, %instance_id, ?last_event_timestamp, "reconnect");
            Some(sync.sync(&instance_id, last_event_timestamp))
        }
        ClientMessage::SubscribeWorkspace { workspace_ids } => {
            debug!(conn_id = %connection.id, count = workspace_ids.len(), "subscribe workspaces");
            connection.subscribe_workspaces(workspace_ids);
            Some(ServerMessage::Subscribed {
                workspace_ids: connection.workspace_ids(),
                timestamp: CanonicalEvent::now_millis(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use helm_store::PersistedEvent;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn connection() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientConnection::new("c1".into(), tx), rx)
    }

    #[test]
    fn reconnect_returns_pending_events() {
        let (conn, _rx) = connection();
        let sync = SyncService::new();
        sync.record(
            "i1",
            PersistedEvent {
                id: "evt_1".into(),
                session_id: "s1".into(),
                event_type: "status".into(),
                timestamp: 100,
                payload: serde_json::json!({}),
            },
        );

        let reply = handle_message(r#"{"type":"reconnect","instanceId":"i1"}"#, &conn, &sync);
        assert_matches!(reply, Some(ServerMessage::PendingEvents { events, total_events: 1, .. })
            if events.len() == 1);
    }

    #[test]
    fn subscribe_acks_with_active_set() {
        let (conn, _rx) = connection();
        let sync = SyncService::new();

        let reply = handle_message(
            r#"{"type":"ws:subscribe_workspace","workspaceIds":["w2","w1"]}"#,
            &conn,
            &sync,
        );
        assert_matches!(reply, Some(ServerMessage::Subscribed { workspace_ids, .. })
            if workspace_ids == vec!["w1".to_string(), "w2".to_string()]);
        assert!(conn.is_subscribed("w1"));
    }

    #[test]
    fn malformed_json_is_ignored() {
        let (conn, _rx) = connection();
        let sync = SyncService::new();
        assert!(handle_message("{not json", &conn, &sync).is_none());
    }

    #[test]
    fn unknown_type_is_ignored() {
        let (conn, _rx) = connection();
        let sync = SyncService::new();
        assert!(handle_message(r#"{"type":"never_heard_of_it"}"#, &conn, &sync).is_none());
    }
}
