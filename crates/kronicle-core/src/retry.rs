//! Retry budget for transport failures.
//!
//! The connector retries only when the transport itself fails. The delay
//! between attempts is fixed; there is no exponential growth and no jitter.

use std::time::Duration;

use crate::error::ValidationError;

/// Maximum attempt count and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    retries: u32,
    delay: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryBudget {
    /// Create a budget of `retries` total attempts separated by `delay`.
    pub fn new(retries: u32, delay: Duration) -> Result<Self, ValidationError> {
        if retries == 0 {
            return Err(ValidationError::ZeroRetries);
        }
        Ok(Self { retries, delay })
    }

    /// A single attempt, no delay.
    pub const fn single_attempt() -> Self {
        Self {
            retries: 1,
            delay: Duration::ZERO,
        }
    }

    pub const fn retries(&self) -> u32 {
        self.retries
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub const fn has_attempt_after(&self, attempt: u32) -> bool {
        attempt < self.retries
    }
}

/// Blocks the calling thread between retry attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Default sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
