//! Retry policy and backoff schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Attempts per logical call when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

/// Exponential delay between attempts: `base * 2^(retry - 1)`, capped at `max`.
///
/// A zero `base` retries immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// No delay between attempts.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }
}

/// Bounded retry configuration, applied per logical call.
///
/// Immutable once built; `max_attempts` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns a fatal config error when `max_attempts` is zero.
    pub fn new(max_attempts: u32) -> Result<Self, ConnectorError> {
        if max_attempts == 0 {
            return Err(ConnectorError::config(
                "INVALID_RETRY_POLICY",
                "max_attempts must be at least 1",
            ));
        }
        Ok(Self {
            max_attempts,
            backoff: Backoff::default(),
        })
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following failed attempt `attempt`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }
}
