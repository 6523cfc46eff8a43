//! Reconnect backoff schedule.
//!
//! Pure bookkeeping for the bounded exponential backoff: the link loop
//! asks for the next delay after every abnormal closure and resets the
//! counter once a connection opens successfully.

use std::time::Duration;

use crate::constants::{
    RECONNECT_BASE_DELAY, RECONNECT_MAX_ATTEMPTS, RECONNECT_MAX_DELAY,
};

/// Bounded exponential backoff policy for link reconnection.
///
/// The nth attempt (1-based) waits `min(base * 2^(n-1), max)`. Once
/// `max_attempts` cycles have failed the policy is exhausted and yields
/// no further delays.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt_count: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            RECONNECT_BASE_DELAY,
            RECONNECT_MAX_DELAY,
            RECONNECT_MAX_ATTEMPTS,
        )
    }
}

impl ReconnectPolicy {
    /// Create a policy with explicit knobs.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempt_count: 0,
        }
    }

    /// Record one abnormal closure and return the delay before the next
    /// attempt, or `None` once the attempt budget is spent.
    ///
    /// Increments the attempt counter by exactly one per call.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.max_attempts {
            return None;
        }
        self.attempt_count += 1;
        // 2^(n-1) with a shift clamp so a huge max_attempts cannot overflow
        let exponent = (self.attempt_count - 1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        Some(delay.min(self.max_delay))
    }

    /// Reset the attempt counter after a successful open.
    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Number of abnormal closures seen in the current cycle.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Whether the attempt budget is spent.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}
