//! Symmetric jitter to spread retries of concurrent clients.
//!
//! A jitter factor `J` turns an interval `I` into a value drawn uniformly from the half-open range
//! `[I - J*I, I + J*I)`. `J = 0` disables randomization.
//!
//! Notes:
//! - RNG: uses `rand`'s thread-local RNG by default; deterministic RNGs can be injected via
//!   `apply_with_rng`.
//! - The thread-local RNG is not `Send`; `apply` never holds it across an await point.
//!
//! Example:
//! ```rust
//! use retryhttp::Jitter;
//! use std::time::Duration;
//!
//! let jitter = Jitter::new(0.2).unwrap();
//! let wait = jitter.apply(Duration::from_millis(1000));
//! assert!(wait >= Duration::from_millis(800) && wait < Duration::from_millis(1200));
//! ```

use crate::error::ConfigError;
use rand::{rng, Rng};
use std::time::Duration;

/// Jitter strategy for randomizing retry waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    factor: f64,
}

impl Jitter {
    /// No randomization; `apply` returns its input.
    pub const NONE: Jitter = Jitter { factor: 0.0 };

    /// Create a jitter strategy. `factor` must lie within `[0.0, 1.0]`.
    pub fn new(factor: f64) -> Result<Self, ConfigError> {
        ConfigError::check_jitter_factor(factor)?;
        Ok(Self { factor })
    }

    /// The configured jitter factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Apply jitter to an interval.
    pub fn apply(&self, interval: Duration) -> Duration {
        if self.factor == 0.0 {
            return interval;
        }
        let mut rng = rng();
        self.apply_internal(interval, &mut rng)
    }

    /// Apply jitter with a custom RNG (for testing)
    pub fn apply_with_rng<R: Rng>(&self, interval: Duration, rng: &mut R) -> Duration {
        if self.factor == 0.0 {
            return interval;
        }
        self.apply_internal(interval, rng)
    }

    fn apply_internal<R: Rng>(&self, interval: Duration, rng: &mut R) -> Duration {
        let nanos = interval.as_nanos() as f64;
        let delta = self.factor * nanos;
        let low = nanos - delta;
        // random::<f64>() is uniform in [0, 1).
        let jittered = low + rng.random::<f64>() * delta * 2.0;
        if jittered <= u64::MAX as f64 {
            Duration::from_nanos(jittered as u64)
        } else {
            Duration::try_from_secs_f64(jittered / 1e9).unwrap_or(Duration::MAX)
        }
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_factor_returns_exact_interval() {
        let delay = Duration::from_secs(1);
        assert_eq!(Jitter::NONE.apply(delay), delay);
        assert_eq!(Jitter::new(0.0).unwrap().apply(delay), delay);
    }

    #[test]
    fn jitter_stays_within_symmetric_bounds() {
        let jitter = Jitter::new(0.2).unwrap();
        let delay = Duration::from_millis(1000);

        // Test multiple times to ensure randomness
        for _ in 0..1000 {
            let jittered = jitter.apply(delay);
            assert!(jittered >= Duration::from_millis(800), "{jittered:?} below bound");
            assert!(jittered <= Duration::from_millis(1200), "{jittered:?} above bound");
        }
    }

    #[test]
    fn full_factor_spans_zero_to_double() {
        let jitter = Jitter::new(1.0).unwrap();
        let delay = Duration::from_millis(100);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let jittered = jitter.apply_with_rng(delay, &mut rng);
            assert!(jittered <= Duration::from_millis(200));
        }
    }

    #[test]
    fn deterministic_rng_is_reproducible() {
        let jitter = Jitter::new(0.5).unwrap();
        let delay = Duration::from_millis(1000);
        let a = jitter.apply_with_rng(delay, &mut StdRng::seed_from_u64(42));
        let b = jitter.apply_with_rng(delay, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a >= Duration::from_millis(500) && a <= Duration::from_millis(1500));
    }

    #[test]
    fn jitter_actually_varies() {
        let jitter = Jitter::new(0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let first = jitter.apply_with_rng(Duration::from_secs(1), &mut rng);
        let varied = (0..50)
            .map(|_| jitter.apply_with_rng(Duration::from_secs(1), &mut rng))
            .any(|d| d != first);
        assert!(varied);
    }

    #[test]
    fn zero_interval_stays_zero() {
        assert_eq!(Jitter::new(0.7).unwrap().apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn rejects_out_of_range_factor() {
        assert!(matches!(Jitter::new(-0.1), Err(ConfigError::InvalidJitterFactor(_))));
        assert!(matches!(Jitter::new(1.1), Err(ConfigError::InvalidJitterFactor(_))));
    }
}
