//! Per-session monitoring parameters.

use std::time::Duration;

/// Rejected monitoring parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Threshold is zero, negative, NaN or infinite.
    NonPositiveThreshold(f64),
    ZeroInterval,
    ZeroDelay,
    DelayShorterThanInterval { delay: u64, interval: u64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveThreshold(t) => {
                write!(f, "threshold must be a positive number of KB/s, got {}", t)
            }
            ConfigError::ZeroInterval => write!(f, "interval must be at least 1 second"),
            ConfigError::ZeroDelay => write!(f, "delay must be at least 1 second"),
            ConfigError::DelayShorterThanInterval { delay, interval } => write!(
                f,
                "delay ({}s) must not be shorter than the interval ({}s)",
                delay, interval
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Immutable configuration of one monitoring session.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Average below which bandwidth counts as low, in KB/s.
    pub threshold_kbps: f64,
    /// Seconds between two samples.
    pub interval_secs: u64,
    /// Seconds the average must stay low before the trigger fires.
    pub delay_secs: u64,
    /// Not interpreted by the monitor; forwarded with the trigger event.
    pub testing_mode: bool,
}

impl MonitorConfig {
    pub fn new(threshold_kbps: f64, interval_secs: u64, delay_secs: u64) -> Self {
        Self {
            threshold_kbps,
            interval_secs,
            delay_secs,
            testing_mode: false,
        }
    }

    pub fn with_testing_mode(mut self, testing_mode: bool) -> Self {
        self.testing_mode = testing_mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_kbps.is_finite() || self.threshold_kbps <= 0.0 {
            return Err(ConfigError::NonPositiveThreshold(self.threshold_kbps));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.delay_secs == 0 {
            return Err(ConfigError::ZeroDelay);
        }
        if self.delay_secs < self.interval_secs {
            return Err(ConfigError::DelayShorterThanInterval {
                delay: self.delay_secs,
                interval: self.interval_secs,
            });
        }
        Ok(())
    }

    /// Number of samples covering the delay: `ceil(delay / interval)`, at least 1.
    pub fn samples_required(&self) -> usize {
        if self.interval_secs == 0 {
            return 1;
        }
        let samples = self.delay_secs.div_ceil(self.interval_secs).max(1);
        usize::try_from(samples).unwrap_or(usize::MAX)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_required() {
        assert_eq!(MonitorConfig::new(200.0, 2, 60).samples_required(), 30);
        assert_eq!(MonitorConfig::new(200.0, 7, 60).samples_required(), 9);
        assert_eq!(MonitorConfig::new(200.0, 5, 5).samples_required(), 1);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert_eq!(MonitorConfig::new(200.0, 2, 60).validate(), Ok(()));
    }

    #[test]
    fn test_validate_threshold() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = MonitorConfig::new(bad, 2, 60).validate().unwrap_err();
            assert!(matches!(err, ConfigError::NonPositiveThreshold(_)));
        }
    }

    #[test]
    fn test_validate_interval_and_delay() {
        assert_eq!(
            MonitorConfig::new(200.0, 0, 60).validate(),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            MonitorConfig::new(200.0, 2, 0).validate(),
            Err(ConfigError::ZeroDelay)
        );
        assert_eq!(
            MonitorConfig::new(200.0, 10, 5).validate(),
            Err(ConfigError::DelayShorterThanInterval {
                delay: 5,
                interval: 10
            })
        );
    }

    #[test]
    fn test_testing_mode_builder() {
        let config = MonitorConfig::new(200.0, 2, 60).with_testing_mode(true);
        assert!(config.testing_mode);
        assert_eq!(config.interval(), Duration::from_secs(2));
    }
}
