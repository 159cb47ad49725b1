//! Store error types.

use thiserror::Error;

/// Errors from session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted line or sidecar failed to (de)serialize.
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// No log exists for the session under the given namespace.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Neither app nor workspace was supplied — the session has no home.
    #[error("session {0} has no namespace (app and workspace both absent)")]
    MissingNamespace(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
