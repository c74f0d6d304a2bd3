//! AWS session for one estimation run

use crate::error::SessionError;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_types::region::Region;
use tracing::{debug, info};

/// Shared SDK configuration resolved for a named profile and region.
///
/// SDK-level retries are disabled; the collector runs its own bounded
/// retry loop.
#[derive(Debug, Clone)]
pub struct AwsSession {
    config: SdkConfig,
    profile: String,
    region: String,
}

impl AwsSession {
    /// Load configuration for `profile` in `region` and resolve credentials up front
    pub async fn connect(profile: &str, region: &str) -> Result<Self, SessionError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let provider = config
            .credentials_provider()
            .ok_or_else(|| SessionError::NoCredentialsProvider {
                profile: profile.to_string(),
            })?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| SessionError::Credentials {
                profile: profile.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(
            profile,
            expires = ?credentials.expiry(),
            "Resolved AWS credentials"
        );
        info!(profile, region, "AWS session established");

        Ok(Self {
            config,
            profile: profile.to_string(),
            region: region.to_string(),
        })
    }

    /// CloudWatch client bound to this session
    pub fn cloudwatch(&self) -> aws_sdk_cloudwatch::Client {
        aws_sdk_cloudwatch::Client::new(&self.config)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}
