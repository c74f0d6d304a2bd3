//! CloudWatch-backed metrics source

use super::{async_trait, MetricQuery, MetricsSource};
use crate::error::SourceError;
use crate::models::{MetricName, ResourceId, Statistic, FSX_NAMESPACE};
use aws_sdk_cloudwatch::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatch::types::{Dimension, DimensionFilter, Statistic as CwStatistic};
use aws_sdk_cloudwatch::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Reads FSx metrics through the CloudWatch API
#[derive(Clone)]
pub struct CloudWatchSource {
    client: Client,
}

impl CloudWatchSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dimensions(resource: &ResourceId, metric: MetricName) -> Vec<Dimension> {
        let mut dims = vec![
            Dimension::builder()
                .name("FileSystemId")
                .value(&resource.fsx_id)
                .build(),
            Dimension::builder()
                .name("VolumeId")
                .value(&resource.volume_id)
                .build(),
        ];
        dims.extend(
            metric
                .extra_dimensions()
                .iter()
                .map(|(name, value)| Dimension::builder().name(*name).value(*value).build()),
        );
        dims
    }
}

#[async_trait]
impl MetricsSource for CloudWatchSource {
    async fn resource_exists(&self, resource: &ResourceId) -> Result<bool, SourceError> {
        let output = self
            .client
            .list_metrics()
            .namespace(FSX_NAMESPACE)
            .dimensions(
                DimensionFilter::builder()
                    .name("FileSystemId")
                    .value(&resource.fsx_id)
                    .build(),
            )
            .dimensions(
                DimensionFilter::builder()
                    .name("VolumeId")
                    .value(&resource.volume_id)
                    .build(),
            )
            .send()
            .await
            .map_err(classify_sdk_error)?;

        debug!(
            resource = %resource,
            metrics = output.metrics().len(),
            "Listed FSx metrics"
        );
        Ok(!output.metrics().is_empty())
    }

    async fn fetch(&self, query: &MetricQuery) -> Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
        let statistic = query.metric.statistic();

        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(FSX_NAMESPACE)
            .metric_name(query.metric.cloudwatch_name())
            .start_time(aws_smithy_types::DateTime::from_secs(query.window.start.timestamp()))
            .end_time(aws_smithy_types::DateTime::from_secs(query.window.end.timestamp()))
            .period(query.window.period_secs as i32)
            .statistics(to_cloudwatch_statistic(statistic));

        for dimension in Self::dimensions(&query.resource, query.metric) {
            request = request.dimensions(dimension);
        }

        let output = request.send().await.map_err(classify_sdk_error)?;

        let points = output
            .datapoints()
            .iter()
            .filter_map(|dp| {
                let ts = dp.timestamp()?;
                let value = match statistic {
                    Statistic::Average => dp.average(),
                    Statistic::Sum => dp.sum(),
                    Statistic::Maximum => dp.maximum(),
                }?;
                let timestamp = DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())?;
                Some((timestamp, value))
            })
            .collect();

        Ok(points)
    }
}

fn to_cloudwatch_statistic(statistic: Statistic) -> CwStatistic {
    match statistic {
        Statistic::Average => CwStatistic::Average,
        Statistic::Sum => CwStatistic::Sum,
        Statistic::Maximum => CwStatistic::Maximum,
    }
}

/// Map an AWS error code onto the collector's error taxonomy.
///
/// Returns `None` for codes that carry no classification.
pub fn classify_error_code(code: &str, message: String) -> Option<SourceError> {
    match code {
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation"
        | "AuthorizationError" => Some(SourceError::PermissionDenied(message)),
        "InvalidClientTokenId" | "UnrecognizedClientException" | "ExpiredToken"
        | "ExpiredTokenException" | "SignatureDoesNotMatch" | "InvalidSignatureException"
        | "MissingAuthenticationToken" => Some(SourceError::Credentials(message)),
        "Throttling" | "ThrottlingException" | "RequestLimitExceeded"
        | "TooManyRequestsException" | "ServiceUnavailable" | "InternalServiceError"
        | "InternalServiceFault" | "InternalFailure" | "RequestTimeout" => {
            Some(SourceError::Transient(message))
        }
        "ResourceNotFound" | "ResourceNotFoundException" => Some(SourceError::NotFound(message)),
        _ => None,
    }
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> SourceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();

    if let Some(classified) = err
        .code()
        .and_then(|code| classify_error_code(code, message.clone()))
    {
        return classified;
    }

    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            SourceError::Transient(message)
        }
        _ => SourceError::Other(message),
    }
}
