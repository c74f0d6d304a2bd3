//! Error types for collection, estimation and configuration

use crate::models::ResourceId;

/// Failure of a single request against the telemetry provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    PermissionDenied(String),

    #[error("credentials rejected: {0}")]
    Credentials(String),

    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("provider error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether the request may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }

    /// The run-level error when this failure must stop the whole run,
    /// `None` when it only affects the one request
    pub fn fatal(&self, resource: &ResourceId, operation: &str) -> Option<CollectorError> {
        match self {
            SourceError::NotFound(_) => Some(CollectorError::ResourceNotFound(resource.clone())),
            SourceError::PermissionDenied(message) => Some(CollectorError::PermissionDenied {
                operation: operation.to_string(),
                message: message.clone(),
            }),
            SourceError::Credentials(message) => Some(CollectorError::Credentials(message.clone())),
            SourceError::Transient(_) | SourceError::Other(_) => None,
        }
    }
}

/// Errors that abort metric collection for the whole run
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("no FSx metrics found for file system {} / volume {}", .0.fsx_id, .0.volume_id)]
    ResourceNotFound(ResourceId),

    #[error("permission denied while calling {operation}: {message}")]
    PermissionDenied { operation: String, message: String },

    #[error("AWS credentials were rejected: {0}")]
    Credentials(String),
}

/// Errors raised by the estimator when no estimate is possible
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EstimateError {
    #[error("storage used metric (StorageUsed, DataType=User) is unavailable: {0}")]
    MissingCapacity(String),
}

/// Invalid or unreadable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// AWS session could not be established
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no credentials found for profile '{profile}'")]
    NoCredentialsProvider { profile: String },

    #[error("could not load credentials for profile '{profile}': {message}")]
    Credentials { profile: String, message: String },
}

/// Top-level error for an estimation run
#[derive(Debug, thiserror::Error)]
pub enum TieringError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

impl TieringError {
    /// A remediation hint the CLI can print below the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TieringError::Config(_) => {
                Some("Check the configuration file and FSX_TIERING__* environment variables.")
            }
            TieringError::Session(_) | TieringError::Collector(CollectorError::Credentials(_)) => {
                Some("Verify the profile exists in ~/.aws/config or ~/.aws/credentials and that its credentials are current (e.g. run `aws sso login --profile <name>`).")
            }
            TieringError::Collector(CollectorError::PermissionDenied { .. }) => {
                Some("The profile needs cloudwatch:GetMetricStatistics and cloudwatch:ListMetrics permissions.")
            }
            TieringError::Collector(CollectorError::ResourceNotFound(_)) => {
                Some("Confirm the file system and volume IDs and that --region matches the file system's region.")
            }
            TieringError::Estimate(_) => {
                Some("CloudWatch publishes StorageUsed for ONTAP volumes hourly; a newly created volume may not report it yet.")
            }
        }
    }
}

pub type Result<T, E = TieringError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(SourceError::Transient("throttled".into()).is_retryable());
        assert!(!SourceError::PermissionDenied("nope".into()).is_retryable());
        assert!(!SourceError::Other("bad request".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        let resource = ResourceId::new("fs-1", "fsvol-1");
        let fatal = |err: SourceError| err.fatal(&resource, "ListMetrics");

        assert!(matches!(
            fatal(SourceError::NotFound("x".into())),
            Some(CollectorError::ResourceNotFound(r)) if r == resource
        ));
        assert!(matches!(
            fatal(SourceError::PermissionDenied("x".into())),
            Some(CollectorError::PermissionDenied { operation, .. }) if operation == "ListMetrics"
        ));
        assert!(matches!(
            fatal(SourceError::Credentials("expired".into())),
            Some(CollectorError::Credentials(m)) if m == "expired"
        ));
        assert!(fatal(SourceError::Transient("x".into())).is_none());
        assert!(fatal(SourceError::Other("x".into())).is_none());
    }

    #[test]
    fn test_not_found_and_forbidden_have_distinct_hints() {
        let not_found: TieringError =
            CollectorError::ResourceNotFound(ResourceId::new("fs-1", "fsvol-1")).into();
        let forbidden: TieringError = CollectorError::PermissionDenied {
            operation: "GetMetricStatistics".into(),
            message: "denied".into(),
        }
        .into();

        assert_ne!(not_found.hint(), forbidden.hint());
        assert!(not_found.to_string().contains("fs-1"));
        assert!(forbidden.to_string().contains("permission denied"));
    }
}
