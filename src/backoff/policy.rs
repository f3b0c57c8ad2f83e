//! Retry policy configuration

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bounded exponential backoff policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for a single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Random extra delay added to each wait, in milliseconds
    pub jitter_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 200,
            max_delay_ms: 10_000,
            jitter_ms: 100,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy without jitter
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            jitter_ms: 0,
        }
    }

    /// Set the jitter bound
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter_ms = jitter.as_millis() as u64;
        self
    }

    /// Deterministic delay before retry number `retry` (1-based), capped at `max_delay_ms`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Delay before retry number `retry` with jitter applied
    pub fn jittered_delay_for(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if self.jitter_ms == 0 {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter_ms);
        delay + Duration::from_millis(extra)
    }
}
