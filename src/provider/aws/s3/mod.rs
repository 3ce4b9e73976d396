//! # Amazon S3 Artifact Provider
//!
//! Stores pack archives as S3 objects. Credentials come from the standard AWS
//! chain and are resolved once, when the provider is created.
//!
//! Setting `endpoint_url` routes requests to an S3-compatible service
//! (MinIO, LocalStack) using path-style addressing.

mod auth;

use crate::error::{classify_status, ArtifactError, ArtifactErrorKind, Operation};
use crate::observability::metrics;
use crate::provider::{
    observe, paginate, prepare_destination, sha256_hex, validate_key, verify_checksum,
    ArtifactProvider, BackendKind, RemoteLocation,
};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::{Region, RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use paths::CHECKSUM_METADATA_KEY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Region used when neither the configuration nor the AWS chain names one
const FALLBACK_REGION: &str = "us-east-1";

/// S3 provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Named profile from the shared AWS config files
    #[serde(default)]
    pub profile: Option<String>,
    /// Custom endpoint for S3-compatible storage
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Artifact provider backed by one S3 bucket
pub struct S3Provider {
    client: Client,
    bucket: String,
    region: Option<String>,
}

impl std::fmt::Debug for S3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Provider")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Provider {
    /// Create a provider using the default AWS credential chain
    ///
    /// # Errors
    /// Returns an `Authentication` error when no credentials can be resolved.
    pub async fn connect(config: S3Config) -> Result<Self, ArtifactError> {
        let sdk_config = auth::create_sdk_config(&config).await;
        Self::from_sdk_config(config.bucket, &sdk_config).await
    }

    /// Create a provider from an already loaded SDK configuration
    ///
    /// # Errors
    /// Returns an `Authentication` error when the configuration has no usable
    /// credentials, or `Configuration` for an empty bucket name.
    pub async fn from_sdk_config(
        bucket: impl Into<String>,
        sdk_config: &SdkConfig,
    ) -> Result<Self, ArtifactError> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(ArtifactError::new(
                ArtifactErrorKind::Configuration,
                BackendKind::S3,
                Operation::Connect,
                bucket,
                "bucket name is empty",
            ));
        }

        auth::resolve_credentials(sdk_config, &bucket).await?;

        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        let region = match sdk_config.region() {
            Some(region) => region.to_string(),
            None => {
                debug!("No AWS region configured, using {}", FALLBACK_REGION);
                builder = builder.region(Region::from_static(FALLBACK_REGION));
                FALLBACK_REGION.to_string()
            }
        };
        if sdk_config.endpoint_url().is_some() {
            builder = builder
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
                .response_checksum_validation(ResponseChecksumValidation::WhenRequired);
        }

        info!("S3 artifact provider ready for bucket {} ({})", bucket, region);
        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            region: Some(region),
        })
    }

    fn location(&self, key: &str) -> RemoteLocation {
        RemoteLocation {
            backend: BackendKind::S3,
            container: self.bucket.clone(),
            key: key.to_string(),
            uri: format!("s3://{}/{}", self.bucket, key),
            size: None,
            last_modified: None,
            checksum: None,
        }
    }

    fn sdk_error<E>(&self, err: SdkError<E>, operation: Operation, target: &str) -> ArtifactError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|response| response.status().as_u16());
        let kind = status.map_or(ArtifactErrorKind::Io, |status| {
            classify_status(status, operation)
        });
        let message = match status {
            Some(status) => format!("HTTP {status}: {}", DisplayErrorContext(&err)),
            None => DisplayErrorContext(&err).to_string(),
        };
        ArtifactError::new(kind, BackendKind::S3, operation, target, message).with_source(err)
    }

    async fn read_object(&self, key: &str, operation: Operation) -> Result<Vec<u8>, ArtifactError> {
        validate_key(BackendKind::S3, operation, key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.sdk_error(e, operation, key))?;

        let expected = output
            .metadata()
            .and_then(|metadata| metadata.get(CHECKSUM_METADATA_KEY))
            .cloned();
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| {
                ArtifactError::new(
                    ArtifactErrorKind::Io,
                    BackendKind::S3,
                    operation,
                    key,
                    format!("failed to read object body: {e}"),
                )
                .with_source(e)
            })?
            .into_bytes()
            .to_vec();

        verify_checksum(expected.as_deref(), &data, BackendKind::S3, key)?;
        metrics::record_bytes_transferred(BackendKind::S3, "download", data.len() as u64);
        Ok(data)
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<(Vec<RemoteLocation>, Option<String>), ArtifactError> {
        let span = artifact_span!("s3.object.list", self.bucket, prefix);
        observe(span, BackendKind::S3, Operation::List, async {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| self.sdk_error(e, Operation::List, prefix))?;

            let items: Vec<RemoteLocation> = output
                .contents()
                .iter()
                .filter_map(|object| {
                    let key = object.key()?;
                    let mut location = self.location(key);
                    location.size = object.size().and_then(|size| u64::try_from(size).ok());
                    location.last_modified = object
                        .last_modified()
                        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));
                    Some(location)
                })
                .collect();
            debug!("Listed {} objects under {}", items.len(), prefix);

            let next = if output.is_truncated().unwrap_or(false) {
                output.next_continuation_token().map(ToString::to_string)
            } else {
                None
            };
            Ok((items, next))
        })
        .await
    }
}

#[async_trait]
impl ArtifactProvider for S3Provider {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    fn container(&self) -> &str {
        &self.bucket
    }

    async fn upload(
        &self,
        local_archive: &Path,
        remote_key: &str,
    ) -> Result<RemoteLocation, ArtifactError> {
        let span = artifact_span!("s3.object.upload", self.bucket, remote_key);
        observe(span, BackendKind::S3, Operation::Upload, async {
            validate_key(BackendKind::S3, Operation::Upload, remote_key)?;
            let data = tokio::fs::read(local_archive).await.map_err(|e| {
                ArtifactError::from_local_io(BackendKind::S3, Operation::Upload, local_archive, e)
            })?;
            let checksum = sha256_hex(&data);
            let size = data.len() as u64;

            info!(
                "Uploading {} ({} bytes) to s3://{}/{}",
                local_archive.display(),
                size,
                self.bucket,
                remote_key
            );
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(remote_key)
                .content_type("application/zip")
                .metadata(CHECKSUM_METADATA_KEY, &checksum)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| self.sdk_error(e, Operation::Upload, remote_key))?;

            metrics::record_bytes_transferred(BackendKind::S3, "upload", size);
            let mut location = self.location(remote_key);
            location.size = Some(size);
            location.checksum = Some(checksum);
            Ok(location)
        })
        .await
    }

    async fn download(
        &self,
        remote_key: &str,
        destination: &Path,
    ) -> Result<PathBuf, ArtifactError> {
        let span = artifact_span!("s3.object.download", self.bucket, remote_key);
        observe(span, BackendKind::S3, Operation::Download, async {
            let data = self.read_object(remote_key, Operation::Download).await?;
            prepare_destination(BackendKind::S3, destination).await?;
            tokio::fs::write(destination, &data).await.map_err(|e| {
                ArtifactError::from_local_io(BackendKind::S3, Operation::Download, destination, e)
            })?;
            info!(
                "Downloaded s3://{}/{} to {}",
                self.bucket,
                remote_key,
                destination.display()
            );
            Ok(destination.to_path_buf())
        })
        .await
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteLocation, ArtifactError>> {
        paginate(move |token| self.list_page(prefix, token))
    }

    async fn exists(&self, remote_key: &str) -> Result<bool, ArtifactError> {
        let span = artifact_span!("s3.object.exists", self.bucket, remote_key);
        observe(span, BackendKind::S3, Operation::Exists, async {
            validate_key(BackendKind::S3, Operation::Exists, remote_key)?;
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(remote_key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    let err = self.sdk_error(e, Operation::Exists, remote_key);
                    if err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(err)
                    }
                }
            }
        })
        .await
    }

    async fn fetch(&self, remote_key: &str) -> Result<Vec<u8>, ArtifactError> {
        let span = artifact_span!("s3.object.fetch", self.bucket, remote_key);
        observe(
            span,
            BackendKind::S3,
            Operation::Download,
            self.read_object(remote_key, Operation::Download),
        )
        .await
    }

    async fn test_connection(&self) -> Result<(), ArtifactError> {
        let span = artifact_span!("s3.bucket.test_connection", self.bucket, self.bucket);
        observe(span, BackendKind::S3, Operation::TestConnection, async {
            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map_err(|e| self.sdk_error(e, Operation::TestConnection, &self.bucket))?;
            debug!("S3 bucket {} is reachable", self.bucket);
            Ok(())
        })
        .await
    }
}
