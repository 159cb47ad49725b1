//! Event bridge — routes canonical events from the runtime's emitter into
//! the durable store, the sync history, and the WebSocket fan-out.

use std::sync::Arc;

use helm_runtime::emitter::SessionEvent;
use helm_store::SessionStore;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::protocol::EventBroadcast;
use crate::sync::SyncService;
use crate::websocket::broadcast::BroadcastManager;

/// Bridges session events to persistence and connected consoles.
pub struct EventBridge {
    rx: broadcast::Receiver<SessionEvent>,
    store: Arc<SessionStore>,
    sync: Arc<SyncService>,
    broadcast: Arc<BroadcastManager>,
    /// Namespace the gateway persists under.
    app: Option<String>,
    workspace: Option<String>,
}

impl EventBridge {
    /// Create a bridge reading from an emitter subscription.
    pub fn new(
        rx: broadcast::Receiver<SessionEvent>,
        store: Arc<SessionStore>,
        sync: Arc<SyncService>,
        broadcast: Arc<BroadcastManager>,
        app: Option<String>,
        workspace: Option<String>,
    ) -> Self {
        Self {
            rx,
            store,
            sync,
            broadcast,
            app,
            workspace,
        }
    }

    /// Run the bridge loop. Exits when the emitter is dropped.
    #[tracing::instrument(skip_all, name = "event_bridge")]
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(session_event) => self.route(session_event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "event bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("emitter closed, bridge exiting");
                    break;
                }
            }
        }
    }

    async fn route(&self, session_event: SessionEvent) {
        let SessionEvent { session_id, event } = session_event;

        // A failed append is reported and the event still fans out —
        // the in-memory path does not roll back on storage errors.
        match self.store.append(
            &session_id,
            &event,
            self.app.as_deref(),
            self.workspace.as_deref(),
        ) {
            Ok(record) => self.sync.record(&session_id, record),
            Err(err) => warn!(%session_id, error = %err, "failed to persist event"),
        }

        let frame = EventBroadcast::new(&session_id, self.workspace.as_deref(), event);
        self.broadcast.broadcast(&frame).await;
    }
}
