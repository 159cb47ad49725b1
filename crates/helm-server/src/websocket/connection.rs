//! WebSocket client connection state.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A connected console.
pub struct ClientConnection {
    /// Unique connection id.
    pub id: String,
    /// Workspaces this connection subscribed to. Empty means unscoped:
    /// the connection receives every workspace-targeted broadcast.
    workspaces: Mutex<HashSet<String>>,
    /// Send channel to the connection's write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of messages dropped due to a full channel.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            workspaces: Mutex::new(HashSet::new()),
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Replace the subscription set. Re-subscribing never accumulates:
    /// the previous set is discarded.
    pub fn subscribe_workspaces(&self, workspace_ids: Vec<String>) {
        *self.workspaces.lock() = workspace_ids.into_iter().collect();
    }

    /// Whether any workspace subscription is active.
    pub fn has_subscriptions(&self) -> bool {
        !self.workspaces.lock().is_empty()
    }

    /// Whether this connection subscribed to `workspace_id`.
    pub fn is_subscribed(&self, workspace_id: &str) -> bool {
        self.workspaces.lock().contains(workspace_id)
    }

    /// Current subscription set, sorted for stable output.
    pub fn workspace_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workspaces.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Send a serialized message.
    ///
    /// Returns `false` when the channel is full or closed, counting the
    /// drop against this connection.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
