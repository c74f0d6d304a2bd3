//! Estimator configuration
//!
//! Layers built-in defaults, an optional config file and `FSX_TIERING__*`
//! environment variables, then validates the result.

use crate::error::ConfigError;
use crate::pricing::PriceTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest history read; operation and throughput metrics always use all of it
pub const MAX_LOOKBACK_DAYS: i64 = 14;

/// Environment variable prefix for overrides (e.g. `FSX_TIERING__TIERING__ARCHIVE_ENABLED=true`)
pub const ENV_PREFIX: &str = "FSX_TIERING";

/// Tier-fraction policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieringConfig {
    /// Access ratio at or above which the maximum Frequent fraction applies
    pub access_ratio_frequent_threshold: f64,
    /// Access ratio below which cold bytes start moving to the coldest tier
    pub access_ratio_infrequent_threshold: f64,
    /// Largest share of bytes ever assigned to Frequent Access
    pub max_frequent_fraction: f64,
    /// Opt in to the asynchronous Archive / Deep Archive tiers
    pub archive_enabled: bool,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            access_ratio_frequent_threshold: 0.5,
            access_ratio_infrequent_threshold: 0.1,
            max_frequent_fraction: 1.0,
            archive_enabled: false,
        }
    }
}

/// Collector request and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Attempts per metric request, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Requests in flight at once
    pub max_concurrent_requests: usize,
    /// Lookback for capacity and file-count metrics
    pub snapshot_lookback_hours: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            max_concurrent_requests: 4,
            snapshot_lookback_hours: 24,
        }
    }
}

impl CollectorConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// S3 Select projection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    /// Share of scanned bytes a Select query returns
    pub returned_ratio: f64,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self { returned_ratio: 0.3 }
    }
}

/// Complete estimator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub tiering: TieringConfig,
    pub collector: CollectorConfig,
    pub select: SelectConfig,
    /// Prices used to turn the projection into dollars; nothing is priced without it
    pub pricing: Option<PriceTable>,
}

impl EstimatorConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EstimatorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the estimator cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tiering;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        if !in_unit(t.access_ratio_frequent_threshold) || !in_unit(t.access_ratio_infrequent_threshold) {
            return Err(ConfigError::Invalid(
                "access ratio thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if t.access_ratio_infrequent_threshold >= t.access_ratio_frequent_threshold {
            return Err(ConfigError::Invalid(format!(
                "access_ratio_infrequent_threshold ({}) must be below access_ratio_frequent_threshold ({})",
                t.access_ratio_infrequent_threshold, t.access_ratio_frequent_threshold
            )));
        }
        if !in_unit(t.max_frequent_fraction) {
            return Err(ConfigError::Invalid(
                "max_frequent_fraction must lie in [0, 1]".to_string(),
            ));
        }

        let c = &self.collector;
        if c.max_attempts == 0 {
            return Err(ConfigError::Invalid("collector.max_attempts must be at least 1".to_string()));
        }
        if c.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "collector.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if c.snapshot_lookback_hours < 1 || c.snapshot_lookback_hours > MAX_LOOKBACK_DAYS * 24 {
            return Err(ConfigError::Invalid(
                "collector.snapshot_lookback_hours must cover between 1 hour and 14 days".to_string(),
            ));
        }

        if !in_unit(self.select.returned_ratio) {
            return Err(ConfigError::Invalid(
                "select.returned_ratio must lie in [0, 1]".to_string(),
            ));
        }

        if let Some(pricing) = &self.pricing {
            pricing.validate()?;
        }

        Ok(())
    }
}
