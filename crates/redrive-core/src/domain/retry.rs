//! Retry policy: decides redelivery pacing.

use std::time::Duration;

/// Delay schedule used when nothing else is configured (seconds).
pub const DEFAULT_DELAYS_SECS: [u64; 3] = [5, 10, 20];

/// Attempt count at which the controller stops requesting redelivery delays.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry policy for failed deliveries.
///
/// Pure and stateless. The policy never decides dead-lettering; once an attempt
/// is exhausted the controller simply stops pacing and leaves routing to the
/// substrate's maximum receive count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay per attempt (index 0 = first failed attempt).
    delays: Vec<Duration>,

    /// Exhaustion threshold.
    max_attempts: u32,
}

impl RetryPolicy {
    /// Build a policy from a delay schedule in whole seconds.
    ///
    /// Returns `None` for an empty schedule or a zero threshold.
    pub fn new(delays_secs: &[u64], max_attempts: u32) -> Option<Self> {
        if delays_secs.is_empty() || max_attempts == 0 {
            return None;
        }
        Some(Self {
            delays: delays_secs.iter().copied().map(Duration::from_secs).collect(),
            max_attempts,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to request before the next delivery after `attempt` failed.
    ///
    /// Attempts are 1-indexed; attempt 0 is treated like attempt 1 and any
    /// attempt past the end of the schedule reuses the last delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    /// Has `attempt` reached the exhaustion threshold?
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_DELAYS_SECS.iter().copied().map(Duration::from_secs).collect(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
