//! Named-field configuration for [`RetryTransport`](crate::RetryTransport).
//!
//! The builder setters validate eagerly and panic; this struct is the alternative for settings
//! coming from a file or environment, where a recoverable [`ConfigError`] is more useful.

use crate::error::ConfigError;
use std::time::Duration;

/// Default wait before the first retry.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(200);
/// Default growth factor applied after each retry.
pub const DEFAULT_INTERVAL_MULTIPLIER: f64 = 1.5;
/// Default fraction of the interval that is randomized.
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;
/// Default ceiling on the backoff interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Retry policy settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryTransportConfig {
    pub initial_interval: Duration,
    pub interval_multiplier: f64,
    pub jitter_factor: f64,
    pub max_interval: Duration,
    /// Upper bound on retries per request. `None` retries for as long as the server asks.
    pub max_retries: Option<usize>,
}

impl RetryTransportConfig {
    /// Check every parameter, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_initial_interval(self.initial_interval)?;
        ConfigError::check_interval_multiplier(self.interval_multiplier)?;
        ConfigError::check_jitter_factor(self.jitter_factor)?;
        ConfigError::check_max_interval(self.max_interval)?;
        Ok(())
    }
}

impl Default for RetryTransportConfig {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            interval_multiplier: DEFAULT_INTERVAL_MULTIPLIER,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_retries: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RetryTransportConfig::default();
        assert_eq!(cfg.initial_interval, Duration::from_millis(200));
        assert_eq!(cfg.interval_multiplier, 1.5);
        assert_eq!(cfg.jitter_factor, 0.2);
        assert_eq!(cfg.max_interval, Duration::from_secs(30));
        assert_eq!(cfg.max_retries, None);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn validate_reports_first_bad_field() {
        let cfg = RetryTransportConfig {
            jitter_factor: 2.0,
            max_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidJitterFactor(2.0)));

        let cfg = RetryTransportConfig { interval_multiplier: 0.9, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidIntervalMultiplier(0.9)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_config() {
        let cfg: RetryTransportConfig =
            serde_json::from_str(r#"{"jitter_factor": 0.0, "max_retries": 5}"#).unwrap();
        assert_eq!(cfg.jitter_factor, 0.0);
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.initial_interval, DEFAULT_INITIAL_INTERVAL);

        let json = serde_json::to_string(&cfg).unwrap();
        let back: RetryTransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
