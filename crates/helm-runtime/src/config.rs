//! Session configuration and model selection.

use helm_core::retry::RetryConfig;
use helm_providers::model_cache::ModelCache;

/// Hard-coded model fallback when nothing else resolves.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Environment variable supplying a default model.
pub const MODEL_ENV_VAR: &str = "HELM_MODEL";

/// Per-session configuration.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Explicitly configured model, when the operator set one.
    pub model: Option<String>,
    /// Environment-provided default (resolved once at startup).
    pub env_default: Option<String>,
    /// Retry policy for transport failures.
    pub retry: RetryConfig,
}

impl SessionConfig {
    /// Build a config from an operator-supplied model, resolving the
    /// environment default once at construction.
    #[must_use]
    pub fn new(model: Option<String>) -> Self {
        Self::with_env(model, std::env::var(MODEL_ENV_VAR).ok())
    }

    fn with_env(model: Option<String>, env_value: Option<String>) -> Self {
        Self {
            model,
            env_default: env_value.filter(|v| !v.is_empty()),
            retry: RetryConfig::default(),
        }
    }

    /// Resolve the model for one provider call.
    ///
    /// Precedence, highest to lowest: per-call override → explicit
    /// configuration → environment default → last detected model from any
    /// prior call (process-wide) → hard-coded fallback.
    #[must_use]
    pub fn resolve_model(&self, call_override: Option<&str>, cache: &ModelCache) -> String {
        call_override
            .map(ToString::to_string)
            .or_else(|| self.model.clone())
            .or_else(|| self.env_default.clone())
            .or_else(|| cache.get())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// The model this session reports as configured.
    ///
    /// A detected model never overrides an explicit configuration value —
    /// the cache participates only when nothing was configured.
    #[must_use]
    pub fn reported_model(&self, cache: &ModelCache) -> String {
        self.resolve_model(None, cache)
    }
}
