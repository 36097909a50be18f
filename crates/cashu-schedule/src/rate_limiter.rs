//! Sliding-window attempt limiter.
//!
//! Process-local and advisory. It slows down a session that hammers the
//! envelope builder; it is not a security boundary.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Admits at most `max_attempts` attempts in any `window`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    admitted: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            admitted: VecDeque::with_capacity(max_attempts),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_attempts, config.window())
    }

    /// Try to admit an attempt now.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Try to admit an attempt at `now`.
    ///
    /// On rejection returns the time until the oldest admitted attempt
    /// leaves the window. A rejected attempt is not recorded.
    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), Duration> {
        self.prune(now);

        if self.admitted.len() >= self.max_attempts {
            let retry_after = self
                .admitted
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Err(retry_after);
        }

        self.admitted.push_back(now);
        Ok(())
    }

    /// Attempts still available at `now`.
    pub fn remaining_at(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.max_attempts.saturating_sub(self.admitted.len())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.admitted.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
