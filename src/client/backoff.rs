//! Reply-poll backoff schedule
//!
//! Delays double on every step: 1, 2, 4, 8, ... ms with the defaults.

use std::time::Duration;

/// Doubling delay schedule with a fixed number of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
    taken: u32,
    max_attempts: u32,
}

impl Backoff {
    /// Default first delay
    pub const DEFAULT_INITIAL: Duration = Duration::from_millis(1);

    /// Default number of delays before giving up
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    pub fn new(initial: Duration, max_attempts: u32) -> Self {
        Self {
            next: initial,
            taken: 0,
            max_attempts,
        }
    }

    /// Number of delays handed out so far
    pub fn attempts(&self) -> u32 {
        self.taken
    }

    pub fn is_exhausted(&self) -> bool {
        self.taken >= self.max_attempts
    }

    /// Sum of the delays still to come
    pub fn remaining(&self) -> Duration {
        self.clone().fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        self.taken += 1;
        Some(delay)
    }
}
