//! # Exponential Backoff
//!
//! Per-resource retry delays for failing reconciliations.
//! The delay doubles with every consecutive error, from `min` up to `max`.

/// Exponential backoff between `min_secs` and `max_secs`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_secs: u64,
    max_secs: u64,
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `min_secs` and capped at `max_secs`
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            attempt: 0,
        }
    }

    /// Delay for the next retry, advancing the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let seconds = Self::seconds_for_attempt(self.attempt, self.min_secs, self.max_secs);
        self.attempt = self.attempt.saturating_add(1);
        seconds
    }

    fn seconds_for_attempt(attempt: u32, min_secs: u64, max_secs: u64) -> u64 {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        min_secs.saturating_mul(factor).min(max_secs)
    }
}
