//! Bounded exponential backoff
//!
//! The retry loop is a plain value: a `Backoff` counts attempts and hands
//! out the delay before the next one, so it can be stepped in tests without
//! sleeping.

use crate::config::RetryConfig;
use std::time::Duration;

/// Limits for retrying one page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts (at least one)
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Starts a fresh retry sequence for one request
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempts: 0,
            next_delay: self.base_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Retry progress for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts: u32,
    next_delay: Duration,
}

impl Backoff {
    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay that will be used after the next transient failure
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// True once no further attempt may be started
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Marks the start of an attempt and returns its 1-based number
    pub fn start_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Called after a transient failure
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// attempt budget is spent. A server-supplied `retry_after` raises the
    /// delay, but never past the policy's maximum.
    pub fn retry_after_failure(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let delay = retry_after
            .map_or(self.next_delay, |hint| hint.max(self.next_delay))
            .min(self.policy.max_delay);

        self.next_delay = self
            .next_delay
            .checked_mul(2)
            .unwrap_or(self.policy.max_delay)
            .min(self.policy.max_delay);

        Some(delay)
    }
}
