//! Event fan-out to connected consoles.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::protocol::EventBroadcast;

use super::connection::ClientConnection;

/// Maximum lifetime message drops before forcibly disconnecting a slow client.
const MAX_TOTAL_DROPS: u64 = 100;

/// Workspace-scoped broadcast routing.
pub struct BroadcastManager {
    /// Connected clients indexed by connection id.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Total connections, kept outside the lock for cheap count queries.
    active_count: AtomicUsize,
}

impl BroadcastManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by id.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Fan a framed event out to matching connections.
    ///
    /// A frame targeted at workspace `W` reaches every connection
    /// subscribed to `W` plus every connection with no subscriptions.
    /// An untargeted frame reaches all connections.
    pub async fn broadcast(&self, frame: &EventBroadcast) {
        match frame.workspace_id.as_deref() {
            Some(workspace_id) => {
                self.broadcast_to(
                    |conn| conn.is_subscribed(workspace_id) || !conn.has_subscriptions(),
                    frame,
                    workspace_id,
                )
                .await;
            }
            None => self.broadcast_to(|_| true, frame, "all").await,
        }
    }

    /// Serialize once, fan out to matching clients, drop chronically slow ones.
    async fn broadcast_to(
        &self,
        filter: impl Fn(&ClientConnection) -> bool,
        frame: &EventBroadcast,
        label: &str,
    ) {
        let json = match serde_json::to_string(frame) {
            Ok(json) => Arc::new(json),
            Err(err) => {
                warn!(session_id = %frame.session_id, error = %err, "failed to serialize frame");
                return;
            }
        };

        let mut to_remove = Vec::new();
        {
            let conns = self.connections.read().await;
            let mut recipients = 0u32;
            for conn in conns.values() {
                if filter(conn) {
                    recipients += 1;
                    if !conn.send(Arc::clone(&json)) {
                        counter!("helm_ws_broadcast_drops_total").increment(1);
                        let drops = conn.drop_count();
                        if drops >= MAX_TOTAL_DROPS {
                            warn!(conn_id = %conn.id, label, drops, "disconnecting slow client");
                            to_remove.push(conn.id.clone());
                        } else {
                            warn!(conn_id = %conn.id, label, total_drops = drops, "send failed, channel full");
                        }
                    }
                }
            }
            debug!(session_id = %frame.session_id, label, recipients, "broadcast frame");
        }

        if !to_remove.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &to_remove {
                if conns.remove(id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
