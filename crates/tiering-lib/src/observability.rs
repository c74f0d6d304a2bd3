//! Observability for an estimation run
//!
//! Provides:
//! - Prometheus metrics on a per-run registry (requests, retries, fetch latency)
//! - Structured logging of run events with tracing

use crate::models::{MetricName, ResourceId, UnavailableReason};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Histogram buckets for CloudWatch request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Collector metrics for one run.
///
/// Each run owns its registry, so two runs in one process never share counters.
#[derive(Clone)]
pub struct CollectorMetrics {
    registry: Registry,
    requests: IntCounterVec,
    retries: IntCounter,
    unavailable_metrics: IntGauge,
    fetch_latency_seconds: Histogram,
}

impl CollectorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(
                "fsx_tiering_cloudwatch_requests_total",
                "CloudWatch requests issued, by metric and outcome",
            ),
            &["metric", "outcome"],
        )?;
        let retries = IntCounter::new(
            "fsx_tiering_cloudwatch_retries_total",
            "CloudWatch requests repeated after a transient failure",
        )?;
        let unavailable_metrics = IntGauge::new(
            "fsx_tiering_unavailable_metrics",
            "Metrics reported as unavailable in the last run",
        )?;
        let fetch_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fsx_tiering_fetch_latency_seconds",
                "Time to fetch one metric including retries",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(retries.clone()))?;
        registry.register(Box::new(unavailable_metrics.clone()))?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            requests,
            retries,
            unavailable_metrics,
            fetch_latency_seconds,
        })
    }

    pub fn record_request(&self, metric: MetricName, outcome: &str) {
        let name = metric.to_string();
        self.requests
            .with_label_values(&[name.as_str(), outcome])
            .inc();
    }

    pub fn inc_retries(&self) {
        self.retries.inc();
    }

    pub fn set_unavailable_metrics(&self, count: usize) {
        self.unavailable_metrics.set(count as i64);
    }

    pub fn observe_fetch_latency(&self, elapsed: Duration) {
        self.fetch_latency_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn retries(&self) -> u64 {
        self.retries.get()
    }

    pub fn requests(&self, metric: MetricName, outcome: &str) -> u64 {
        let name = metric.to_string();
        self.requests
            .with_label_values(&[name.as_str(), outcome])
            .get()
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for run events
#[derive(Clone)]
pub struct StructuredLogger {
    resource: String,
}

impl StructuredLogger {
    pub fn new(resource: &ResourceId) -> Self {
        Self {
            resource: resource.to_string(),
        }
    }

    /// Log the start of a run
    pub fn log_run_start(&self, region: &str, metric_count: usize) {
        info!(
            event = "run_started",
            resource = %self.resource,
            region = %region,
            metric_count = metric_count,
            "Collecting FSx metrics"
        );
    }

    /// Log a retry after a transient failure
    pub fn log_retry(&self, operation: &str, attempt: u32, backoff: Duration, error: &str) {
        warn!(
            event = "request_retry",
            resource = %self.resource,
            operation = %operation,
            attempt = attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %error,
            "Transient CloudWatch failure, retrying"
        );
    }

    /// Log a metric that will be reported as unavailable
    pub fn log_metric_unavailable(&self, metric: MetricName, reason: &UnavailableReason) {
        warn!(
            event = "metric_unavailable",
            resource = %self.resource,
            metric = %metric,
            reason = %reason,
            "Metric unavailable, continuing without it"
        );
    }

    /// Log a completed metric fetch
    pub fn log_metric_fetched(&self, metric: MetricName, datapoints: usize, attempts: u32) {
        debug!(
            event = "metric_fetched",
            resource = %self.resource,
            metric = %metric,
            datapoints = datapoints,
            attempts = attempts,
            "Fetched metric"
        );
    }

    /// Log the end of collection
    pub fn log_collection_complete(&self, available: usize, unavailable: usize, elapsed: Duration) {
        info!(
            event = "collection_complete",
            resource = %self.resource,
            available = available,
            unavailable = unavailable,
            elapsed_ms = elapsed.as_millis() as u64,
            "Metric collection complete"
        );
    }

    /// Log the produced estimate
    pub fn log_estimate(&self, total_bytes: u64, access_ratio: Option<f64>, tiering_available: bool) {
        if tiering_available {
            info!(
                event = "estimate_generated",
                resource = %self.resource,
                total_bytes = total_bytes,
                access_ratio = ?access_ratio,
                "Generated tiering estimate"
            );
        } else {
            warn!(
                event = "estimate_generated",
                resource = %self.resource,
                total_bytes = total_bytes,
                "Tiering split unavailable, reporting capacity figures only"
            );
        }
    }
}
