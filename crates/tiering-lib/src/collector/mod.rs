//! Metrics collection from the telemetry provider
//!
//! This module fetches the fixed set of FSx metrics for one file system and
//! volume from CloudWatch, aligns each onto its period grid and reports
//! metrics it could not obtain as explicitly unavailable.

mod cloudwatch;
mod collect;
mod retry;
mod window;

#[cfg(test)]
mod tests;

pub use cloudwatch::{classify_error_code, CloudWatchSource};
pub use collect::Collector;
pub use retry::{with_retry, Attempted, RetryPolicy};
pub use window::{clamp_range, lookback_window, metric_window, select_period, MIN_PERIOD_SECS};

use crate::error::SourceError;
use crate::models::{MetricName, MetricWindow, ResourceId};
use chrono::{DateTime, Utc};

pub use async_trait::async_trait;

/// One metric request
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub resource: ResourceId,
    pub metric: MetricName,
    pub window: MetricWindow,
}

/// Trait for telemetry provider implementations
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Whether the provider publishes any metric for the file system/volume pair
    async fn resource_exists(&self, resource: &ResourceId) -> Result<bool, SourceError>;

    /// Raw datapoints for one metric, in any order
    async fn fetch(&self, query: &MetricQuery) -> Result<Vec<(DateTime<Utc>, f64)>, SourceError>;
}
