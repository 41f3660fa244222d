//! Retry policy and failure classification.

use std::time::Duration;

use reasoning_client::ReasoningError;
use serde::{Deserialize, Serialize};

/// Provider status marker for quota exhaustion.
pub const RESOURCE_EXHAUSTED_MARKER: &str = "RESOURCE_EXHAUSTED";

/// Retry budget for one call site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationPolicy {
    /// Total attempts including the first (values below 1 act as 1).
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds).
    pub base_delay_ms: u64,
    /// Optional wall-clock limit for a single attempt (milliseconds).
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for InvocationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            attempt_timeout_ms: None,
        }
    }
}

impl InvocationPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            attempt_timeout_ms: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout_ms: u64) -> Self {
        self.attempt_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep before retry number `attempt_index + 1`: `base * 2^attempt_index`.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt_index);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Sum of every backoff sleep when all attempts fail retryably.
    pub fn total_backoff(&self) -> Duration {
        (0..self.effective_attempts() - 1)
            .map(|i| self.backoff_delay(i))
            .sum()
    }
}

/// How a failure is judged by the invoker.
pub trait Classify {
    fn status_code(&self) -> Option<u16>;

    /// Text searched for the resource-exhaustion marker.
    fn detail(&self) -> String;

    fn is_retryable(&self) -> bool {
        matches!(self.status_code(), Some(429 | 503))
            || self.detail().contains(RESOURCE_EXHAUSTED_MARKER)
    }

    fn is_rate_limit(&self) -> bool {
        self.status_code() == Some(429) || self.detail().contains(RESOURCE_EXHAUSTED_MARKER)
    }
}

impl Classify for ReasoningError {
    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn detail(&self) -> String {
        ReasoningError::detail(self)
    }
}
