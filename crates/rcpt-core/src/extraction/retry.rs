//! Per-model retry policy.

use std::time::Duration;

use crate::error::ExtractionError;

/// What the client does after a failed model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait, then call the same model again.
    Retry(Duration),
    /// Give up on this model and try the next one in the chain.
    SwitchModel,
    /// Stop the whole extraction.
    Abort,
}

/// Attempt budget and backoff for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after a rate limit on zero-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.rate_limit_base_delay.saturating_mul(factor)
    }

    /// Decide the next step after `error` on zero-based `attempt`.
    pub fn next_step(&self, error: &ExtractionError, attempt: u32) -> Step {
        match error {
            ExtractionError::RateLimited { .. } if attempt + 1 < self.max_attempts => {
                Step::Retry(self.backoff(attempt))
            }
            ExtractionError::RateLimited { .. } | ExtractionError::ModelUnavailable { .. } => {
                Step::SwitchModel
            }
            _ => Step::Abort,
        }
    }
}
