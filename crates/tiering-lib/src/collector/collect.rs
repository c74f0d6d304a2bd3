//! Concurrent fan-out of metric requests

use super::retry::{with_retry, Attempted, RetryPolicy};
use super::window::lookback_window;
use super::{MetricQuery, MetricsSource};
use crate::config::{CollectorConfig, MAX_LOOKBACK_DAYS};
use crate::error::CollectorError;
use crate::models::{
    MetricKind, MetricName, MetricSeries, MetricSet, MetricWindow, ResourceId, UnavailableReason,
};
use crate::observability::{CollectorMetrics, StructuredLogger};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

/// Fetches a set of metrics for one resource
pub struct Collector {
    source: Arc<dyn MetricsSource>,
    config: CollectorConfig,
    retry: RetryPolicy,
    metrics: Option<CollectorMetrics>,
}

/// Outcome of one spawned metric fetch
struct FetchResult {
    metric: MetricName,
    window: MetricWindow,
    outcome: Attempted<Vec<(DateTime<Utc>, f64)>>,
}

impl Collector {
    pub fn new(source: Arc<dyn MetricsSource>, config: CollectorConfig) -> Self {
        let retry = RetryPolicy::from(&config);
        Self {
            source,
            config,
            retry,
            metrics: None,
        }
    }

    /// Record request counts and latency into `metrics`
    pub fn with_metrics(mut self, metrics: CollectorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Query window for a metric as of `now`
    pub fn window_for(&self, metric: MetricName, now: DateTime<Utc>) -> MetricWindow {
        let lookback = match metric.kind() {
            MetricKind::Snapshot => Duration::hours(self.config.snapshot_lookback_hours),
            MetricKind::Activity => Duration::days(MAX_LOOKBACK_DAYS),
        };
        lookback_window(now, lookback)
    }

    /// Collect `metrics` for `resource`.
    ///
    /// Returns an error only for conditions that make the whole run
    /// meaningless; a metric that cannot be fetched is recorded as
    /// unavailable in the returned set.
    pub async fn collect(
        &self,
        resource: &ResourceId,
        metrics: &[MetricName],
        now: DateTime<Utc>,
    ) -> Result<MetricSet, CollectorError> {
        let logger = StructuredLogger::new(resource);
        let started = Instant::now();

        self.verify_resource(resource, &logger).await?;

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut tasks = JoinSet::new();

        for &metric in metrics {
            let query = MetricQuery {
                resource: resource.clone(),
                metric,
                window: self.window_for(metric, now),
            };
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            let policy = self.retry;
            let logger = logger.clone();
            let counters = self.metrics.clone();

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                let fetch_started = Instant::now();
                let outcome = with_retry(
                    &policy,
                    || {
                        let source = Arc::clone(&source);
                        let query = query.clone();
                        async move { source.fetch(&query).await }
                    },
                    |attempt, backoff, err| {
                        logger.log_retry(&metric.to_string(), attempt, backoff, &err.to_string());
                        if let Some(c) = &counters {
                            c.inc_retries();
                        }
                    },
                )
                .await;
                if let Some(c) = &counters {
                    c.observe_fetch_latency(fetch_started.elapsed());
                    c.record_request(metric, if outcome.result.is_ok() { "ok" } else { "error" });
                }
                FetchResult {
                    metric,
                    window: query.window,
                    outcome,
                }
            });
        }

        let mut set = MetricSet::new(metrics);

        while let Some(joined) = tasks.join_next().await {
            let fetched = match joined {
                Ok(fetched) => fetched,
                Err(e) => {
                    error!(error = %e, "Metric fetch task failed");
                    continue;
                }
            };

            match fetched.outcome.result {
                Ok(points) => {
                    logger.log_metric_fetched(fetched.metric, points.len(), fetched.outcome.attempts);
                    set.insert_series(MetricSeries::from_datapoints(
                        fetched.metric,
                        fetched.window,
                        points,
                    ));
                }
                Err(err) => {
                    if let Some(fatal) = err.fatal(resource, "GetMetricStatistics") {
                        tasks.abort_all();
                        return Err(fatal);
                    }
                    let reason = if err.is_retryable() {
                        UnavailableReason::RetriesExhausted {
                            attempts: fetched.outcome.attempts,
                            last_error: err.to_string(),
                        }
                    } else {
                        UnavailableReason::ProviderError {
                            message: err.to_string(),
                        }
                    };
                    set.mark_unavailable(fetched.metric, reason);
                }
            }
        }

        let unavailable = set.unavailable();
        for (metric, reason) in &unavailable {
            logger.log_metric_unavailable(*metric, reason);
        }
        if let Some(c) = &self.metrics {
            c.set_unavailable_metrics(unavailable.len());
        }
        logger.log_collection_complete(
            set.len() - unavailable.len(),
            unavailable.len(),
            started.elapsed(),
        );

        Ok(set)
    }

    /// Fail fast when the provider has never heard of the resource
    async fn verify_resource(
        &self,
        resource: &ResourceId,
        logger: &StructuredLogger,
    ) -> Result<(), CollectorError> {
        let source = Arc::clone(&self.source);
        let lookup = with_retry(
            &self.retry,
            || {
                let source = Arc::clone(&source);
                let resource = resource.clone();
                async move { source.resource_exists(&resource).await }
            },
            |attempt, backoff, err| logger.log_retry("ListMetrics", attempt, backoff, &err.to_string()),
        )
        .await;

        match lookup.result {
            Ok(true) => Ok(()),
            Ok(false) => Err(CollectorError::ResourceNotFound(resource.clone())),
            Err(err) => {
                if let Some(fatal) = err.fatal(resource, "ListMetrics") {
                    return Err(fatal);
                }
                warn!(
                    resource = %resource,
                    attempts = lookup.attempts,
                    error = %err,
                    "Could not confirm the resource exists, continuing"
                );
                Ok(())
            }
        }
    }
}
