//! Retry policy and backoff calculation.

use serde::{Deserialize, Serialize};

/// Retry policy for transport failures against a provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry, in ms.
    pub initial_delay_ms: u64,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// Upper bound on any single delay, in ms.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (1-based), exponential with a cap.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * factor).round() as u64;
        delay.min(self.max_delay_ms)
    }
}
