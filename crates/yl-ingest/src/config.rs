use std::time::Duration;

use yieldlens_types::{ConfigError, IngestTarget};

/// Configuration for the scheduler and throttle.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fast tick driving every target.
    pub tick_interval: Duration,
    /// Minimum time between two provider calls for the same target.
    pub min_fetch_interval: Duration,
    /// A cycle running longer than this is abandoned and counted as a failed call.
    pub fetch_timeout: Duration,
    /// How far back the first fetch of a target reaches.
    pub initial_lookback: Duration,
    pub targets: Vec<IngestTarget>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            min_fetch_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
            initial_lookback: Duration::from_secs(24 * 3_600),
            targets: vec![
                IngestTarget::new("aave-v3", "ethereum"),
                IngestTarget::new("compound-v3", "ethereum"),
                IngestTarget::new("morpho-blue", "base"),
            ],
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::invalid("TICK_INTERVAL_SECS", "must be positive"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::invalid("FETCH_TIMEOUT_SECS", "must be positive"));
        }
        if self.targets.is_empty() {
            return Err(ConfigError::invalid("POOL_TARGETS", "no targets configured"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(SchedulerConfig::default().validate().is_ok());

        let config = SchedulerConfig {
            targets: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
