//! Backoff for optimistic counter increments
//!
//! An optimistic increment that loses its conditional write re-reads the
//! counter and tries again. `RetryConfig` bounds how often that happens and
//! how long the increment waits between rounds.

use std::time::Duration;

/// Retry bound and backoff of an optimistic increment
///
/// ```ignore
/// let retry = RetryConfig::default().with_max_retries(10);
/// let counters = CounterStore::with_strategy(store, IncrementStrategy::Optimistic(retry));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Lost writes tolerated before the increment reports `Error::Conflict`
    pub max_retries: usize,
    /// Wait after the first lost write; doubles with every further loss
    pub base_delay: Duration,
    /// Upper bound on a single wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Same backoff, different retry bound
    pub fn with_max_retries(self, max_retries: usize) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Same bound, different first wait
    pub fn with_base_delay(self, base_delay: Duration) -> Self {
        Self { base_delay, ..self }
    }

    /// Same bound, different cap on a single wait
    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Self { max_delay, ..self }
    }

    /// Whether an increment that already lost `lost` writes may try again
    pub fn should_retry(&self, lost: usize) -> bool {
        lost < self.max_retries
    }

    /// Wait before the round following `lost` lost writes
    pub fn backoff(&self, lost: usize) -> Duration {
        let factor = u32::try_from(lost)
            .ok()
            .and_then(|n| 1u32.checked_shl(n))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
