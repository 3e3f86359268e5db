//! Error types for the retry transport.
//!
//! Downstream executor errors are never wrapped: the transport returns them verbatim. The types
//! here only cover configuration mistakes and request/response body failures.
use std::time::Duration;

/// Boxed error used for body streams and rewind accessors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An invalid retry policy parameter.
///
/// Builder setters panic with this error's message; `RetryTransportConfig::validate` returns it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `initial_interval` must be > 0.
    #[error("invalid initial interval value: {0:?} (must be > 0)")]
    InvalidInitialInterval(Duration),
    /// `interval_multiplier` must be >= 1.0.
    #[error("invalid interval multiplier value: {0} (must be >= 1.0)")]
    InvalidIntervalMultiplier(f64),
    /// `jitter_factor` must be within [0.0, 1.0].
    #[error("invalid jitter factor value: {0} (must be within [0.0, 1.0])")]
    InvalidJitterFactor(f64),
    /// `max_interval` must be > 0.
    #[error("invalid max interval value: {0:?} (must be > 0)")]
    InvalidMaxInterval(Duration),
}

/// Failures while producing or consuming a [`Body`](crate::Body).
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The rewind accessor could not produce a fresh body.
    #[error("failed to rewind request body: {0}")]
    Rewind(#[source] BoxError),
    /// Reading the body stream failed.
    #[error("failed to read body stream: {0}")]
    Stream(#[source] BoxError),
}

impl ConfigError {
    /// Validate a single initial interval value.
    pub fn check_initial_interval(interval: Duration) -> Result<(), Self> {
        if interval.is_zero() {
            return Err(Self::InvalidInitialInterval(interval));
        }
        Ok(())
    }

    /// Validate a single interval multiplier value.
    pub fn check_interval_multiplier(multiplier: f64) -> Result<(), Self> {
        if multiplier.is_nan() || multiplier < 1.0 || multiplier.is_infinite() {
            return Err(Self::InvalidIntervalMultiplier(multiplier));
        }
        Ok(())
    }

    /// Validate a single jitter factor value.
    pub fn check_jitter_factor(factor: f64) -> Result<(), Self> {
        if !(0.0..=1.0).contains(&factor) {
            return Err(Self::InvalidJitterFactor(factor));
        }
        Ok(())
    }

    /// Validate a single max interval value.
    pub fn check_max_interval(interval: Duration) -> Result<(), Self> {
        if interval.is_zero() {
            return Err(Self::InvalidMaxInterval(interval));
        }
        Ok(())
    }
}
