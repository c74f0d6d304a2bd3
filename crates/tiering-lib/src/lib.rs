//! FSx for NetApp ONTAP to S3 Intelligent-Tiering estimation
//!
//! This crate provides the core functionality for:
//! - Metrics collection from CloudWatch (`AWS/FSx`)
//! - Access-recency tier projection and monthly operation estimates
//! - Optional dollar pricing of the projection
//! - Configuration, AWS session setup and observability

pub mod collector;
pub mod config;
pub mod error;
pub mod estimator;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod session;

pub use collector::{CloudWatchSource, Collector, MetricsSource};
pub use config::EstimatorConfig;
pub use error::{Result, TieringError};
pub use estimator::Estimator;
pub use models::*;
pub use observability::{CollectorMetrics, StructuredLogger};
pub use pricing::{price, PriceTable, PricedEstimate};
pub use session::AwsSession;

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Collect every metric for `resource` and estimate its tiering as of `now`
pub async fn run_estimate(
    source: Arc<dyn MetricsSource>,
    resource: &ResourceId,
    region: &str,
    config: &EstimatorConfig,
    metrics: Option<CollectorMetrics>,
    now: DateTime<Utc>,
) -> Result<TieringReport> {
    StructuredLogger::new(resource).log_run_start(region, MetricName::ALL.len());

    let mut collector = Collector::new(source, config.collector.clone());
    if let Some(metrics) = metrics {
        collector = collector.with_metrics(metrics);
    }

    let set = collector.collect(resource, &MetricName::ALL, now).await?;
    let report = Estimator::new(config).estimate(resource, region, &set, now)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{async_trait, MetricQuery};
    use crate::error::SourceError;
    use chrono::TimeZone;

    /// Source that reports a constant value for every metric slot in the window
    struct ConstantSource {
        value: f64,
    }

    #[async_trait]
    impl MetricsSource for ConstantSource {
        async fn resource_exists(&self, _resource: &ResourceId) -> std::result::Result<bool, SourceError> {
            Ok(true)
        }

        async fn fetch(
            &self,
            query: &MetricQuery,
        ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
            let window = query.window;
            let step = chrono::Duration::seconds(window.period_secs);
            let mut points = Vec::new();
            let mut t = window.start;
            while t < window.end {
                points.push((t, self.value));
                t += step;
            }
            Ok(points)
        }
    }

    #[tokio::test]
    async fn test_run_estimate_end_to_end() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let resource = ResourceId::new("fs-0123456789abcdef0", "fsvol-0123456789abcdef0");
        let config = EstimatorConfig::default();
        let metrics = CollectorMetrics::new().unwrap();

        let report = run_estimate(
            Arc::new(ConstantSource { value: 1024.0 }),
            &resource,
            "eu-west-1",
            &config,
            Some(metrics.clone()),
            now,
        )
        .await
        .unwrap();

        assert_eq!(report.region, "eu-west-1");
        assert_eq!(report.snapshot.total_stored_bytes, 1024);
        assert!(report.notes.is_empty());
        assert!(report.cost.tiering.buckets().iter().map(|b| b.bytes).sum::<u64>() == 1024);
        assert_eq!(
            metrics.requests(MetricName::StorageUsedUser, "ok"),
            1
        );
    }

    #[tokio::test]
    async fn test_run_estimate_unknown_resource() {
        struct Empty;

        #[async_trait]
        impl MetricsSource for Empty {
            async fn resource_exists(&self, _resource: &ResourceId) -> std::result::Result<bool, SourceError> {
                Ok(false)
            }

            async fn fetch(
                &self,
                _query: &MetricQuery,
            ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
                Ok(Vec::new())
            }
        }

        let err = run_estimate(
            Arc::new(Empty),
            &ResourceId::new("fs-0", "fsvol-0"),
            "us-east-1",
            &EstimatorConfig::default(),
            None,
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TieringError::Collector(_)));
        assert!(err.hint().is_some());
    }
}
