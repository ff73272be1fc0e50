//! Store Configuration
//!
//! A store is configured by a single TTL, applied uniformly to every key.
//! The TTL also drives the sweep interval, floored at
//! [`DEFAULT_MIN_SWEEP_INTERVAL`] so very short TTLs do not cause a wakeup
//! storm.

use std::time::Duration;
use thiserror::Error;

/// Lower bound on the sweep interval unless overridden (1 second).
pub const DEFAULT_MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Errors detected while validating a [`StoreConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Both the TTL and the sweep floor are zero, which would make the sweep
    /// timer fire continuously.
    #[error("sweep interval must be non-zero (ttl and min_sweep_interval are both zero)")]
    ZeroSweepInterval,
}

/// Configuration for a [`TtlCounters`](crate::TtlCounters) store.
///
/// # Example
///
/// ```
/// use ttlcounters::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new(Duration::from_millis(200));
/// assert_eq!(config.sweep_interval(), Duration::from_secs(1));
///
/// let config = config.with_min_sweep_interval(Duration::from_millis(50));
/// assert_eq!(config.sweep_interval(), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Expiry window applied to every key, refreshed on each increment
    pub ttl: Duration,

    /// Floor for the sweep interval (default: 1s)
    pub min_sweep_interval: Duration,
}

impl StoreConfig {
    /// Creates a configuration with the given TTL and the default sweep floor.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            min_sweep_interval: DEFAULT_MIN_SWEEP_INTERVAL,
        }
    }

    /// Overrides the sweep floor.
    pub fn with_min_sweep_interval(mut self, interval: Duration) -> Self {
        self.min_sweep_interval = interval;
        self
    }

    /// How often the background sweep runs: the TTL, but never less than
    /// the configured floor.
    pub fn sweep_interval(&self) -> Duration {
        self.ttl.max(self.min_sweep_interval)
    }

    /// Checks that the configuration can drive a sweeper.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval().is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_short_ttl_uses_floor() {
        let config = StoreConfig::new(Duration::from_millis(50));
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_long_ttl_is_the_interval() {
        let config = StoreConfig::new(Duration::from_secs(30));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_custom_floor() {
        let config =
            StoreConfig::new(Duration::from_millis(5)).with_min_sweep_interval(Duration::from_millis(20));
        assert_eq!(config.sweep_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_zero_ttl_is_valid_with_floor() {
        let config = StoreConfig::new(Duration::ZERO);
        assert_ok!(config.validate());
        assert_eq!(config.sweep_interval(), DEFAULT_MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_zero_everything_is_rejected() {
        let config = StoreConfig::new(Duration::ZERO).with_min_sweep_interval(Duration::ZERO);
        let err = assert_err!(config.validate());
        assert_eq!(err, ConfigError::ZeroSweepInterval);
    }
}
