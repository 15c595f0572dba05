use std::time::Duration;

/// Retry budget and backoff schedule for planner calls, kept as data so tests
/// can drive the loop with a paused clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on call attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff after the first failed attempt; doubles on each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after the given 1-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Exponential backoff: 1s, 2s, 4s
        self.base_delay * 2u32.pow(attempt.saturating_sub(1).min(16))
    }

    /// Total sleep time if every attempt fails.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..=self.max_attempts).map(|attempt| self.delay_for(attempt)).sum()
    }
}
