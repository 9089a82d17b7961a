//! Configuration for the query learning core

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the query learning core
///
/// Defaults: cached answers live for one hour, executions above five seconds
/// flag a query for review, and the expiry sweeper runs hourly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Default liveness window for cached answers, in minutes.
    /// Individual `store` calls may override it.
    pub default_ttl_minutes: i64,

    /// Execution time above which a query is flagged for operator review
    pub slow_query_threshold_ms: u64,

    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: 60,
            slow_query_threshold_ms: 5_000,
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl LearningConfig {
    /// Create a new builder for the configuration
    pub fn builder() -> LearningConfigBuilder {
        LearningConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_minutes < 1 {
            return Err(LearningError::InvalidInput(
                "default_ttl_minutes must be at least 1".to_string(),
            ));
        }

        if self.slow_query_threshold_ms == 0 {
            return Err(LearningError::InvalidInput(
                "slow_query_threshold_ms must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(LearningError::InvalidInput(
                "sweep_interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `QUERY_CACHE_TTL_MINUTES`,
    /// `SLOW_QUERY_THRESHOLD_MS`, `SWEEP_INTERVAL_MINUTES`. A `.env` file in
    /// the working directory is honored when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(value) = std::env::var("QUERY_CACHE_TTL_MINUTES") {
            config.default_ttl_minutes = value.parse().map_err(|_| {
                LearningError::InvalidInput(format!("QUERY_CACHE_TTL_MINUTES: {value}"))
            })?;
        }

        if let Ok(value) = std::env::var("SLOW_QUERY_THRESHOLD_MS") {
            config.slow_query_threshold_ms = value.parse().map_err(|_| {
                LearningError::InvalidInput(format!("SLOW_QUERY_THRESHOLD_MS: {value}"))
            })?;
        }

        if let Ok(value) = std::env::var("SWEEP_INTERVAL_MINUTES") {
            let minutes: u64 = value.parse().map_err(|_| {
                LearningError::InvalidInput(format!("SWEEP_INTERVAL_MINUTES: {value}"))
            })?;
            config.sweep_interval = Duration::from_secs(minutes * 60);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Builder for the learning configuration
#[derive(Debug, Default)]
pub struct LearningConfigBuilder {
    default_ttl_minutes: Option<i64>,
    slow_query_threshold_ms: Option<u64>,
    sweep_interval: Option<Duration>,
}

impl LearningConfigBuilder {
    /// Set the default TTL for cached answers, in minutes
    pub fn default_ttl_minutes(mut self, minutes: i64) -> Self {
        self.default_ttl_minutes = Some(minutes);
        self
    }

    /// Set the slow query threshold, in milliseconds
    pub fn slow_query_threshold_ms(mut self, threshold: u64) -> Self {
        self.slow_query_threshold_ms = Some(threshold);
        self
    }

    /// Set the expiry sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Build the configuration
    pub fn build(self) -> LearningConfig {
        let defaults = LearningConfig::default();

        LearningConfig {
            default_ttl_minutes: self
                .default_ttl_minutes
                .unwrap_or(defaults.default_ttl_minutes),
            slow_query_threshold_ms: self
                .slow_query_threshold_ms
                .unwrap_or(defaults.slow_query_threshold_ms),
            sweep_interval: self.sweep_interval.unwrap_or(defaults.sweep_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LearningConfig::default();
        assert_eq!(config.default_ttl_minutes, 60);
        assert_eq!(config.slow_query_threshold_ms, 5_000);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = LearningConfig::default();
        invalid.default_ttl_minutes = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = LearningConfig::default();
        invalid.slow_query_threshold_ms = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = LearningConfig::default();
        invalid.sweep_interval = Duration::ZERO;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = LearningConfig::builder()
            .default_ttl_minutes(15)
            .slow_query_threshold_ms(2_000)
            .sweep_interval(Duration::from_secs(600))
            .build();

        assert_eq!(config.default_ttl_minutes, 15);
        assert_eq!(config.slow_query_threshold_ms, 2_000);
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_builder_falls_back_to_defaults() {
        let config = LearningConfig::builder().default_ttl_minutes(5).build();
        assert_eq!(config.default_ttl_minutes, 5);
        assert_eq!(config.slow_query_threshold_ms, 5_000);
    }
}
