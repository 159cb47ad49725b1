//! The [`AgentProvider`] trait and its supporting types.
//!
//! A provider is an upstream agent backend invoked with a prompt, an
//! optional resume token, and a model id. It returns an ordered stream of
//! canonical events terminated by end-of-stream. A rejected call is a
//! transport failure — the session controller owns the retry policy.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use helm_core::events::CanonicalEvent;
use thiserror::Error;

/// Ordered stream of canonical events for one turn.
pub type CanonicalEventStream = Pin<Box<dyn Stream<Item = CanonicalEvent> + Send>>;

/// Everything a provider needs for one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnRequest {
    /// Verbatim prompt text — never an empty placeholder.
    pub prompt: String,
    /// Provider-assigned session id from the preceding turn, when known.
    pub resume_session_id: Option<String>,
    /// Model to serve the turn.
    pub model: String,
}

/// Provider call failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider call was rejected or the connection dropped.
    #[error("provider transport failure: {message}")]
    Transport {
        /// What went wrong.
        message: String,
    },

    /// The request itself was malformed (empty prompt, unknown model).
    #[error("invalid turn request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },
}

/// Result alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// An upstream agent backend.
///
/// Implementations wrap the backend's native event protocol and yield
/// canonical events only — conversion happens inside the provider, behind
/// this trait.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Stable provider name, for logging.
    fn name(&self) -> &'static str;

    /// Run one turn. The returned stream ends when the provider's terminal
    /// outcome (a `result` event) has been yielded.
    async fn run_turn(&self, request: TurnRequest) -> ProviderResult<CanonicalEventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = ProviderError::Transport {
            message: "connection reset".into(),
        };
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn turn_request_fields() {
        let req = TurnRequest {
            prompt: "run the tests".into(),
            resume_session_id: Some("ps_1".into()),
            model: "opus".into(),
        };
        assert_eq!(req.prompt, "run the tests");
        assert_eq!(req.resume_session_id.as_deref(), Some("ps_1"));
    }
}
