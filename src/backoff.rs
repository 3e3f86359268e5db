//! Multiplicative backoff with a ceiling.
//!
//! The interval starts at `initial` and is multiplied by `multiplier` after every retry, saturating
//! at `max`. Retry semantics: the wait before the first retry is `initial`, the wait before the
//! `k+1`-th retry is `min(initial * multiplier^k, max)`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use retryhttp::Backoff;
//!
//! let backoff = Backoff::new(Duration::from_millis(100), 2.0, Duration::from_secs(1)).unwrap();
//! assert_eq!(backoff.delay(0), Duration::from_millis(100));
//! assert_eq!(backoff.delay(1), Duration::from_millis(200));
//! assert_eq!(backoff.delay(3), Duration::from_millis(800));
//! assert_eq!(backoff.delay(10), Duration::from_secs(1)); // capped
//! ```
//!
//! `initial` is not clamped to `max`: a policy whose initial interval exceeds its ceiling waits
//! `initial` once, then `max`.

use crate::error::ConfigError;
use std::time::Duration;

/// Backoff parameters. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
}

impl Backoff {
    /// Create a backoff policy, validating every parameter.
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Result<Self, ConfigError> {
        ConfigError::check_initial_interval(initial)?;
        ConfigError::check_interval_multiplier(multiplier)?;
        ConfigError::check_max_interval(max)?;
        Ok(Self { initial, multiplier, max })
    }

    /// Interval used before the first retry.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Growth factor applied after each retry.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Ceiling on the interval.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Interval following `current`: `current * multiplier`, clamped to `max`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let max_nanos = self.max.as_nanos() as f64;
        let nanos = current.as_nanos() as f64 * self.multiplier;
        if nanos >= max_nanos {
            return self.max;
        }
        if nanos <= u64::MAX as f64 {
            // Truncates sub-nanosecond remainders.
            return Duration::from_nanos(nanos as u64);
        }
        Duration::try_from_secs_f64(nanos / 1e9).unwrap_or(self.max)
    }

    /// Interval used after `retries` retries have already happened.
    pub fn delay(&self, retries: usize) -> Duration {
        let mut interval = self.initial;
        for _ in 0..retries {
            let next = self.next_interval(interval);
            if next == interval {
                break;
            }
            interval = next;
        }
        interval
    }
}
