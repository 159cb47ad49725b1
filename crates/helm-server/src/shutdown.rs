//! Coordinated shutdown for the gateway's background tasks.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long a drain waits for registered tasks before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the cancellation token and the background tasks it governs.
///
/// Tasks register their join handles at spawn time. [`drain`] cancels the
/// token and waits for every registered task to finish, bounded by a
/// timeout; tasks still running afterwards are left to die with the
/// process.
///
/// [`drain`]: ShutdownCoordinator::drain
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator with no registered tasks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// A clone of the cancellation token, for tasks that observe it.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Register a background task to be awaited during [`drain`].
    ///
    /// [`drain`]: ShutdownCoordinator::drain
    pub fn register(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }

    /// Initiate shutdown without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then wait for every registered task.
    pub async fn drain(&self, timeout: Option<Duration>) {
        self.shutdown();
        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        let timeout = timeout.unwrap_or(DRAIN_TIMEOUT);
        info!(task_count = handles.len(), timeout_secs = timeout.as_secs(), "draining background tasks");

        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(timeout_secs = timeout.as_secs(), "background tasks did not finish in time");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
