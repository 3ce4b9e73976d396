//! # S3 Authentication
//!
//! Builds the AWS SDK configuration from the default credential chain and
//! resolves credentials eagerly, so a provider without usable credentials
//! fails at construction instead of on its first upload.

use super::S3Config;
use crate::error::{ArtifactError, ArtifactErrorKind, Operation};
use crate::provider::BackendKind;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use tracing::{debug, info};

/// Create AWS SDK config using the default credential chain
///
/// The chain covers an explicit profile, `AWS_*` environment variables, web
/// identity and instance/container roles.
pub async fn create_sdk_config(config: &S3Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &config.profile {
        info!("Using AWS profile {} for S3", profile);
        loader = loader.profile_name(profile);
    }
    if let Some(endpoint) = &config.endpoint_url {
        info!("Routing S3 requests to {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

/// Resolve credentials once through the configured provider
pub async fn resolve_credentials(sdk_config: &SdkConfig, bucket: &str) -> Result<(), ArtifactError> {
    let auth_error = |message: String| {
        ArtifactError::new(
            ArtifactErrorKind::Authentication,
            BackendKind::S3,
            Operation::Connect,
            bucket,
            message,
        )
    };

    let provider = sdk_config
        .credentials_provider()
        .ok_or_else(|| auth_error("no AWS credentials provider configured".to_string()))?;

    provider.provide_credentials().await.map_err(|e| {
        auth_error(format!("no AWS credentials could be resolved: {e}")).with_source(e)
    })?;

    debug!("Resolved AWS credentials for bucket {}", bucket);
    Ok(())
}
