//! Integration tests for metrics collection
//!
//! These tests drive the collector against a scripted in-memory source so
//! retry, degradation and abort behavior can be checked without AWS.

#[cfg(test)]
mod mock_source_tests {
    use crate::collector::{async_trait, Collector, MetricQuery, MetricsSource};
    use crate::config::CollectorConfig;
    use crate::error::{CollectorError, SourceError};
    use crate::models::{MetricName, MetricStatus, ResourceId, UnavailableReason};
    use crate::observability::CollectorMetrics;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// What the mock returns for a metric, consumed one entry per call
    #[derive(Clone)]
    enum Reply {
        Points(Vec<(DateTime<Utc>, f64)>),
        Fail(SourceError),
    }

    struct MockSource {
        exists: Result<bool, SourceError>,
        script: Mutex<HashMap<MetricName, Vec<Reply>>>,
        calls: Mutex<HashMap<MetricName, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                exists: Ok(true),
                script: Mutex::new(HashMap::new()),
                calls: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn missing() -> Self {
            Self {
                exists: Ok(false),
                ..Self::new()
            }
        }

        fn reply(self, metric: MetricName, replies: Vec<Reply>) -> Self {
            self.script.lock().unwrap().insert(metric, replies);
            self
        }

        fn calls(&self, metric: MetricName) -> usize {
            self.calls.lock().unwrap().get(&metric).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl MetricsSource for MockSource {
        async fn resource_exists(&self, _resource: &ResourceId) -> Result<bool, SourceError> {
            self.exists.clone()
        }

        async fn fetch(
            &self,
            query: &MetricQuery,
        ) -> Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::task::yield_now().await;

            *self.calls.lock().unwrap().entry(query.metric).or_insert(0) += 1;
            let reply = {
                let mut script = self.script.lock().unwrap();
                match script.get_mut(&query.metric) {
                    Some(replies) if replies.len() > 1 => replies.remove(0),
                    Some(replies) => replies[0].clone(),
                    None => Reply::Points(vec![(query.window.start, 1.0)]),
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match reply {
                Reply::Points(points) => Ok(points),
                Reply::Fail(err) => Err(err),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn fast_config() -> CollectorConfig {
        CollectorConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            ..CollectorConfig::default()
        }
    }

    fn resource() -> ResourceId {
        ResourceId::new("fs-0123456789abcdef0", "fsvol-0123456789abcdef0")
    }

    #[tokio::test]
    async fn test_collects_every_requested_metric() {
        let source = Arc::new(MockSource::new());
        let collector = Collector::new(source.clone(), fast_config());

        let set = collector
            .collect(&resource(), &MetricName::ALL, now())
            .await
            .unwrap();

        assert_eq!(set.len(), MetricName::ALL.len());
        assert!(set.unavailable().is_empty());
        for metric in MetricName::ALL {
            assert_eq!(source.calls(metric), 1);
        }
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_succeeds() {
        let source = Arc::new(MockSource::new().reply(
            MetricName::DataReadOperations,
            vec![
                Reply::Fail(SourceError::Transient("Throttling".into())),
                Reply::Points(vec![(now() - Duration::hours(1), 50.0)]),
            ],
        ));
        let metrics = CollectorMetrics::new().unwrap();
        let collector = Collector::new(source.clone(), fast_config()).with_metrics(metrics.clone());

        let set = collector
            .collect(&resource(), &[MetricName::DataReadOperations], now())
            .await
            .unwrap();

        assert!(set.series(MetricName::DataReadOperations).is_some());
        assert_eq!(source.calls(MetricName::DataReadOperations), 2);
        assert_eq!(metrics.retries(), 1);
        assert_eq!(metrics.requests(MetricName::DataReadOperations, "ok"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade_only_that_metric() {
        let source = Arc::new(MockSource::new().reply(
            MetricName::MetadataOperations,
            vec![Reply::Fail(SourceError::Transient("ServiceUnavailable".into()))],
        ));
        let collector = Collector::new(source.clone(), fast_config());

        let set = collector
            .collect(
                &resource(),
                &[MetricName::StorageUsedUser, MetricName::MetadataOperations],
                now(),
            )
            .await
            .unwrap();

        assert!(set.series(MetricName::StorageUsedUser).is_some());
        assert_eq!(source.calls(MetricName::MetadataOperations), 3);
        match set.status(MetricName::MetadataOperations) {
            MetricStatus::Unavailable {
                reason: UnavailableReason::RetriesExhausted { attempts, .. },
            } => assert_eq!(attempts, 3),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_permission_denied_aborts_run() {
        let source = Arc::new(MockSource::new().reply(
            MetricName::FilesUsed,
            vec![Reply::Fail(SourceError::PermissionDenied(
                "not authorized to perform cloudwatch:GetMetricStatistics".into(),
            ))],
        ));
        let collector = Collector::new(source.clone(), fast_config());

        let err = collector
            .collect(&resource(), &MetricName::ALL, now())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::PermissionDenied { .. }));
        assert_eq!(source.calls(MetricName::FilesUsed), 1);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_fatal() {
        let source = Arc::new(MockSource::missing());
        let collector = Collector::new(source.clone(), fast_config());

        let err = collector
            .collect(&resource(), &MetricName::ALL, now())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::ResourceNotFound(_)));
        assert_eq!(source.calls(MetricName::StorageUsedUser), 0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort_before_fetching() {
        let source = Arc::new(MockSource {
            exists: Err(SourceError::Credentials("ExpiredToken".into())),
            ..MockSource::new()
        });
        let collector = Collector::new(source.clone(), fast_config());

        let err = collector
            .collect(&resource(), &MetricName::ALL, now())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::Credentials(ref m) if m == "ExpiredToken"));
        assert_eq!(source.calls(MetricName::StorageUsedUser), 0);
    }

    #[tokio::test]
    async fn test_non_retryable_error_marks_metric_unavailable() {
        let source = Arc::new(MockSource::new().reply(
            MetricName::FilesCapacity,
            vec![Reply::Fail(SourceError::Other("InvalidParameterCombination".into()))],
        ));
        let collector = Collector::new(source.clone(), fast_config());

        let set = collector
            .collect(&resource(), &[MetricName::FilesCapacity], now())
            .await
            .unwrap();

        assert_eq!(source.calls(MetricName::FilesCapacity), 1);
        assert!(matches!(
            set.status(MetricName::FilesCapacity),
            MetricStatus::Unavailable {
                reason: UnavailableReason::ProviderError { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_response_is_not_zero_filled() {
        let source =
            Arc::new(MockSource::new().reply(MetricName::DataWriteOperations, vec![Reply::Points(vec![])]));
        let collector = Collector::new(source, fast_config());

        let set = collector
            .collect(&resource(), &[MetricName::DataWriteOperations], now())
            .await
            .unwrap();

        assert!(set.series(MetricName::DataWriteOperations).is_none());
        assert_eq!(
            set.status(MetricName::DataWriteOperations),
            MetricStatus::Unavailable {
                reason: UnavailableReason::NoDatapoints
            }
        );
    }

    #[tokio::test]
    async fn test_windows_depend_on_metric_kind() {
        let collector = Collector::new(Arc::new(MockSource::new()), CollectorConfig::default());

        let snapshot = collector.window_for(MetricName::StorageUsedUser, now());
        let activity = collector.window_for(MetricName::DataReadOperations, now());

        assert!(snapshot.start >= now() - Duration::hours(24));
        assert_eq!(snapshot.period_secs, 300);
        assert!(activity.start >= now() - Duration::days(14));
        assert!(activity.start < now() - Duration::days(13));
        assert_eq!(activity.period_secs, 900);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_config() {
        let source = Arc::new(MockSource::new());
        let config = CollectorConfig {
            max_concurrent_requests: 2,
            ..fast_config()
        };
        let collector = Collector::new(source.clone(), config);

        collector
            .collect(&resource(), &MetricName::ALL, now())
            .await
            .unwrap();

        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }
}
