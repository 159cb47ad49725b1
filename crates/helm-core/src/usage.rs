//! Token usage accounting.
//!
//! Providers report token counts in incompatible shapes: the delta-protocol
//! backend splits input across `message_start` and output across
//! `message_delta`, while the lifecycle backend reports cached input tokens
//! separately from fresh input tokens. [`TokenUsage`] is the normalized form:
//! `input_tokens` always includes cached input, and the cached count is also
//! carried under both field namings consumers expect.

use serde::{Deserialize, Serialize};

/// Normalized token counts for one turn or one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input tokens, cached input included.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Input + output.
    pub total_tokens: u64,
    /// Cached input tokens (raw-compatible naming).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u64>,
    /// Cached input tokens (normalized naming).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

impl TokenUsage {
    /// Build a usage record from plain input/output counts.
    #[must_use]
    pub fn from_counts(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cached_input_tokens: None,
            cache_read_input_tokens: None,
        }
    }

    /// Build a usage record from lifecycle-backend counts, folding cached
    /// input tokens into the input total. Both cached-token namings are
    /// populated so consumers expecting either see the same value.
    #[must_use]
    pub fn from_cached_counts(input_tokens: u64, cached_input_tokens: u64, output_tokens: u64) -> Self {
        let input = input_tokens + cached_input_tokens;
        Self {
            input_tokens: input,
            output_tokens,
            total_tokens: input + output_tokens,
            cached_input_tokens: Some(cached_input_tokens),
            cache_read_input_tokens: Some(cached_input_tokens),
        }
    }

    /// Add another usage record into this one (running session totals).
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        if let Some(cached) = other.cached_input_tokens {
            *self.cached_input_tokens.get_or_insert(0) += cached;
        }
        if let Some(cached) = other.cache_read_input_tokens {
            *self.cache_read_input_tokens.get_or_insert(0) += cached;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_counts_totals() {
        let usage = TokenUsage::from_counts(100, 10);
        assert_eq!(usage.total_tokens, 110);
        assert!(usage.cached_input_tokens.is_none());
    }

    #[test]
    fn cached_tokens_folded_into_input() {
        let usage = TokenUsage::from_cached_counts(40, 60, 10);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.total_tokens, 110);
        assert_eq!(usage.cached_input_tokens, Some(60));
        assert_eq!(usage.cache_read_input_tokens, Some(60));
    }

    #[test]
    fn both_cached_namings_on_the_wire() {
        let usage = TokenUsage::from_cached_counts(0, 25, 5);
        let value = serde_json::to_value(usage).unwrap();
        assert_eq!(value["cachedInputTokens"], 25);
        assert_eq!(value["cacheReadInputTokens"], 25);
        assert_eq!(value["inputTokens"], 25);
    }

    #[test]
    fn add_accumulates() {
        let mut total = TokenUsage::from_counts(100, 10);
        total.add(&TokenUsage::from_cached_counts(20, 30, 5));
        assert_eq!(total.input_tokens, 150);
        assert_eq!(total.output_tokens, 15);
        assert_eq!(total.total_tokens, 165);
        assert_eq!(total.cached_input_tokens, Some(30));
    }

    #[test]
    fn default_is_zero() {
        let usage = TokenUsage::default();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }
}
