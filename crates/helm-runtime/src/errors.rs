//! Runtime error types.

use thiserror::Error;

/// Errors from the session controller.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `start()` was called while a request is already in flight.
    /// No state change occurred; retry once the session is idle.
    #[error("session {0} already running")]
    AlreadyRunning(String),

    /// The provider call failed and the retry budget is exhausted.
    #[error("provider failed after {attempts} attempt(s): {message}")]
    TransportExhausted {
        /// Total attempts made, initial call included.
        attempts: u32,
        /// Last failure message.
        message: String,
    },

    /// The run was cancelled via `stop()`.
    #[error("session {0} cancelled")]
    Cancelled(String),
}
