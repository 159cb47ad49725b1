//! Process-wide model-detection cache.
//!
//! The most recently detected model id from any provider stream, shared
//! across sessions (not namespaced per session). An explicit object with
//! `get`/`set`/`clear` rather than global mutable state, so tests control
//! its lifetime.

use parking_lot::Mutex;
use tracing::debug;

/// Cache of the last model id detected from stream metadata.
#[derive(Debug, Default)]
pub struct ModelCache {
    detected: Mutex<Option<String>>,
}

impl ModelCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last detected model, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.detected.lock().clone()
    }

    /// Record a detected model.
    pub fn set(&self, model: &str) {
        debug!(model, "detected model");
        *self.detected.lock() = Some(model.to_string());
    }

    /// Forget the detected model (test isolation, provider switch).
    pub fn clear(&self) {
        *self.detected.lock() = None;
    }
}
