//! # Artifact Providers
//!
//! Uniform storage interface for custom content-pack archives, with one
//! implementation per cloud backend:
//!
//! - `aws`: Amazon S3 (AWS default credential chain)
//! - `azure`: Azure Blob Storage (SAS token)
//!
//! A provider is bound to exactly one backend for its whole life; there is
//! no fallback from one backend to another. Providers hold only connection
//! parameters, so one instance can serve concurrent operations.

/// Span for one provider operation, with fields filled in by [`observe`]
macro_rules! artifact_span {
    ($name:literal, $container:expr, $key:expr) => {
        tracing::info_span!(
            $name,
            container = %$container,
            artifact.key = %$key,
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            error.kind = tracing::field::Empty
        )
    };
}

pub mod aws;
pub mod azure;
mod checksum;
mod version;

pub use aws::{S3Config, S3Provider};
pub use azure::{AzureBlobConfig, AzureBlobProvider};
pub use version::PackVersion;

pub(crate) use checksum::{sha256_hex, verify_checksum};

use crate::config::{resolve_setting, ConfigurationError, Environment};
use crate::constants::{
    ENV_ARTIFACTS_LOCATION, ENV_AZURE_ACCOUNT_URL, ENV_AZURE_CONTAINER, ENV_S3_BUCKET_NAME,
    ENV_S3_ENDPOINT_URL,
};
use crate::error::{ArtifactError, ArtifactErrorKind, Operation};
use crate::observability::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use futures::{Future, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn, Instrument, Span};

/// Storage backend behind a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    S3,
    AzureBlob,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::S3 => "s3",
            BackendKind::AzureBlob => "azure_blob",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigurationError;

    /// Accepts the artifact store names used in `ARTIFACTS_LOCATION`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "azure" | "azureblob" | "azure_blob" => Ok(BackendKind::AzureBlob),
            _ => Err(ConfigurationError::UnsupportedArtifactStore(s.to_string())),
        }
    }
}

/// Where an artifact lives in a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    pub backend: BackendKind,
    /// Bucket or container name
    pub container: String,
    pub key: String,
    /// `s3://bucket/key` or the blob URL (never carries credentials)
    pub uri: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Hex SHA-256 of the archive, when known
    pub checksum: Option<String>,
}

/// Artifact repository for content-pack archives
///
/// Each operation is one request/response against the backend. Failures are
/// scoped to the call: the provider stays usable afterwards.
#[async_trait]
pub trait ArtifactProvider: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Bucket or container the provider is bound to
    fn container(&self) -> &str;

    /// Store the archive at `local_archive` under `remote_key`
    async fn upload(
        &self,
        local_archive: &Path,
        remote_key: &str,
    ) -> Result<RemoteLocation, ArtifactError>;

    /// Write the artifact at `remote_key` to `destination`
    async fn download(&self, remote_key: &str, destination: &Path)
        -> Result<PathBuf, ArtifactError>;

    /// Every artifact whose key starts with `prefix`
    ///
    /// Pages are fetched lazily as the stream is polled. Each call starts a
    /// fresh listing; no match yields an empty stream, not an error.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteLocation, ArtifactError>>;

    /// Whether `remote_key` exists; a missing key is `Ok(false)`
    async fn exists(&self, remote_key: &str) -> Result<bool, ArtifactError>;

    /// Read the artifact at `remote_key` into memory
    async fn fetch(&self, remote_key: &str) -> Result<Vec<u8>, ArtifactError>;

    /// Check that the bucket or container is reachable with the current credentials
    async fn test_connection(&self) -> Result<(), ArtifactError>;

    async fn is_pack_available(
        &self,
        pack_id: &str,
        pack_version: &str,
    ) -> Result<bool, ArtifactError> {
        self.exists(&paths::pack_archive_key(pack_id, pack_version))
            .await
    }

    async fn download_pack(
        &self,
        pack_id: &str,
        pack_version: &str,
    ) -> Result<Vec<u8>, ArtifactError> {
        self.fetch(&paths::pack_archive_key(pack_id, pack_version))
            .await
    }

    async fn upload_pack(
        &self,
        local_archive: &Path,
        pack_id: &str,
        pack_version: &str,
    ) -> Result<RemoteLocation, ArtifactError> {
        self.upload(local_archive, &paths::pack_archive_key(pack_id, pack_version))
            .await
    }

    /// Highest stored version of a pack, `None` if no version exists
    async fn latest_pack_version(&self, pack_id: &str) -> Result<Option<String>, ArtifactError> {
        let prefix = paths::pack_prefix(pack_id);
        let mut artifacts = self.list(&prefix);
        let mut latest: Option<PackVersion> = None;

        while let Some(location) = artifacts.try_next().await? {
            let Some(parsed) = paths::parse_pack_key(&location.key) else {
                debug!("Skipping non-pack key {} under {}", location.key, prefix);
                continue;
            };
            if parsed.pack_id != pack_id {
                continue;
            }
            let candidate = PackVersion::parse(&parsed.pack_version);
            if latest.as_ref().is_none_or(|current| candidate > *current) {
                latest = Some(candidate);
            }
        }

        Ok(latest.map(|v| v.as_str().to_string()))
    }
}

/// Artifact store selection, as found in configuration files
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    S3(S3Config),
    Azure(AzureBlobConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            ProviderConfig::S3(_) => BackendKind::S3,
            ProviderConfig::Azure(_) => BackendKind::AzureBlob,
        }
    }

    /// Select and configure the backend from environment variables
    ///
    /// `ARTIFACTS_LOCATION` picks the backend and defaults to `S3`.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] for an unknown store or a missing
    /// bucket, account URL or container.
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigurationError> {
        Self::from_env_with_location(None, env)
    }

    /// Same as [`ProviderConfig::from_env`], with an explicit store overriding
    /// `ARTIFACTS_LOCATION`
    ///
    /// # Errors
    /// See [`ProviderConfig::from_env`].
    pub fn from_env_with_location(
        location: Option<&str>,
        env: &dyn Environment,
    ) -> Result<Self, ConfigurationError> {
        let location = resolve_setting(location, env, ENV_ARTIFACTS_LOCATION)
            .unwrap_or_else(|| "S3".to_string());

        match location.parse::<BackendKind>()? {
            BackendKind::S3 => Ok(ProviderConfig::S3(S3Config {
                bucket: required(env, "bucket", ENV_S3_BUCKET_NAME)?,
                region: None,
                profile: None,
                endpoint_url: env.var(ENV_S3_ENDPOINT_URL),
            })),
            BackendKind::AzureBlob => Ok(ProviderConfig::Azure(AzureBlobConfig {
                account_url: required(env, "account_url", ENV_AZURE_ACCOUNT_URL)?,
                container: required(env, "container", ENV_AZURE_CONTAINER)?,
                sas_token: None,
            })),
        }
    }
}

fn required(
    env: &dyn Environment,
    setting: &'static str,
    env_var: &'static str,
) -> Result<String, ConfigurationError> {
    env.var(env_var)
        .ok_or(ConfigurationError::MissingProviderSetting { setting, env_var })
}

/// Create the provider for a configured backend
///
/// Credentials are resolved here; a failure is terminal for this provider.
///
/// # Errors
/// Returns an [`ArtifactError`] with kind `Authentication` when credentials
/// cannot be resolved or are rejected, or `Configuration` for unusable settings.
pub async fn create_provider(
    config: ProviderConfig,
    env: &dyn Environment,
) -> Result<Box<dyn ArtifactProvider>, ArtifactError> {
    match config {
        ProviderConfig::S3(config) => Ok(Box::new(S3Provider::connect(config).await?)),
        ProviderConfig::Azure(config) => {
            Ok(Box::new(AzureBlobProvider::connect(config, env).await?))
        }
    }
}

/// Times one provider operation and records its outcome on the current span
/// and in metrics
pub(crate) struct OperationRecorder {
    backend: BackendKind,
    operation: Operation,
    start: Instant,
}

impl OperationRecorder {
    pub(crate) fn start(backend: BackendKind, operation: Operation) -> Self {
        Self {
            backend,
            operation,
            start: Instant::now(),
        }
    }

    pub(crate) fn finish<T>(
        self,
        result: Result<T, ArtifactError>,
    ) -> Result<T, ArtifactError> {
        let elapsed = self.start.elapsed();
        let span = Span::current();
        span.record(
            "operation.duration_ms",
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );
        span.record("operation.success", result.is_ok());
        metrics::record_artifact_operation(
            self.backend,
            self.operation,
            result.is_ok(),
            elapsed.as_secs_f64(),
        );

        if let Err(e) = &result {
            span.record("error.kind", e.kind.as_str());
            metrics::increment_artifact_errors(self.backend, e.kind);
            if e.is_not_found() {
                debug!("{}", e);
            } else {
                warn!("{}", e);
            }
        }
        result
    }
}

/// Run one provider operation inside `span`, recording duration, outcome and
/// error classification
pub(crate) async fn observe<T, F>(
    span: Span,
    backend: BackendKind,
    operation: Operation,
    operation_future: F,
) -> Result<T, ArtifactError>
where
    F: Future<Output = Result<T, ArtifactError>>,
{
    let recorder = OperationRecorder::start(backend, operation);
    async move { recorder.finish(operation_future.await) }
        .instrument(span)
        .await
}

enum PageCursor {
    Start,
    Next(String),
    Done,
}

/// Lazily page through a listing
///
/// `fetch_page` receives the continuation token (`None` for the first page)
/// and returns the page's items plus the next token, if any.
pub(crate) fn paginate<'a, F, Fut>(
    fetch_page: F,
) -> BoxStream<'a, Result<RemoteLocation, ArtifactError>>
where
    F: Fn(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<(Vec<RemoteLocation>, Option<String>), ArtifactError>>
        + Send
        + 'a,
{
    stream::try_unfold(PageCursor::Start, move |cursor| {
        let page = match cursor {
            PageCursor::Start => Some(fetch_page(None)),
            PageCursor::Next(token) => Some(fetch_page(Some(token))),
            PageCursor::Done => None,
        };
        async move {
            let Some(page) = page else {
                return Ok(None);
            };
            let (items, next_token) = page.await?;
            let cursor = next_token
                .filter(|token| !token.is_empty())
                .map_or(PageCursor::Done, PageCursor::Next);
            Ok(Some((items, cursor)))
        }
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, ArtifactError>)))
    .try_flatten()
    .boxed()
}

/// Reject object keys that one backend would store under a different name
///
/// Blob URLs collapse `.` and `..` path segments and a leading `/` yields an
/// empty first segment, so such keys are refused on every backend.
pub(crate) fn validate_key(
    backend: BackendKind,
    operation: Operation,
    key: &str,
) -> Result<(), ArtifactError> {
    let reason = if key.is_empty() {
        Some("object key is empty")
    } else if key.starts_with('/') {
        Some("object key must not start with '/'")
    } else if key.split('/').any(|segment| matches!(segment, "." | "..")) {
        Some("object key must not contain '.' or '..' segments")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArtifactError::new(
            ArtifactErrorKind::Configuration,
            backend,
            operation,
            key,
            reason,
        )),
        None => Ok(()),
    }
}

/// Create the parent directories of a download destination
pub(crate) async fn prepare_destination(
    backend: BackendKind,
    destination: &Path,
) -> Result<(), ArtifactError> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ArtifactError::from_local_io(backend, Operation::Download, parent, e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_validate_key() {
        for key in ["content/packs/A/1.0.0/A.zip", "a/..b/c.zip", "a//b.zip", ".hidden"] {
            assert!(validate_key(BackendKind::S3, Operation::Upload, key).is_ok(), "{key}");
        }
        for key in ["", "/a.zip", "a/../b.zip", "./a.zip", "a/.", "a/.."] {
            let err = validate_key(BackendKind::AzureBlob, Operation::Upload, key).unwrap_err();
            assert_eq!(err.kind, ArtifactErrorKind::Configuration, "{key}");
            assert_eq!(err.target, key);
        }
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("S3".parse::<BackendKind>().unwrap(), BackendKind::S3);
        assert_eq!("azure".parse::<BackendKind>().unwrap(), BackendKind::AzureBlob);
        assert_eq!("Azure".parse::<BackendKind>().unwrap(), BackendKind::AzureBlob);
        assert!(matches!(
            "GCS".parse::<BackendKind>(),
            Err(ConfigurationError::UnsupportedArtifactStore(store)) if store == "GCS"
        ));
    }

    #[test]
    fn test_provider_config_defaults_to_s3() {
        let config = ProviderConfig::from_env(&env(&[
            ("S3_BUCKET_NAME", "xsoar-cicd"),
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
        ]))
        .unwrap();
        match config {
            ProviderConfig::S3(s3) => {
                assert_eq!(s3.bucket, "xsoar-cicd");
                assert_eq!(s3.endpoint_url.as_deref(), Some("http://localhost:9000"));
            }
            ProviderConfig::Azure(_) => panic!("Expected S3 provider config"),
        }
    }

    #[test]
    fn test_provider_config_azure_from_env() {
        let config = ProviderConfig::from_env(&env(&[
            ("ARTIFACTS_LOCATION", "Azure"),
            ("AZURE_STORAGE_ACCOUNT_URL", "https://acct.blob.core.windows.net"),
            ("AZURE_STORAGE_CONTAINER", "packs"),
        ]))
        .unwrap();
        assert_eq!(config.kind(), BackendKind::AzureBlob);
    }

    #[test]
    fn test_provider_config_missing_settings() {
        let result = ProviderConfig::from_env(&env(&[]));
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingProviderSetting {
                env_var: "S3_BUCKET_NAME",
                ..
            })
        ));

        let result = ProviderConfig::from_env_with_location(
            Some("azure"),
            &env(&[("AZURE_STORAGE_ACCOUNT_URL", "https://acct.blob.core.windows.net")]),
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingProviderSetting {
                env_var: "AZURE_STORAGE_CONTAINER",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_location_rejected() {
        let result = ProviderConfig::from_env(&env(&[("ARTIFACTS_LOCATION", "Artifactory")]));
        assert!(matches!(
            result,
            Err(ConfigurationError::UnsupportedArtifactStore(_))
        ));
    }

    #[test]
    fn test_provider_config_deserializes_tagged() {
        let yaml = r"
type: s3
bucket: xsoar-cicd
region: eu-west-1
";
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            ProviderConfig::S3(s3) => {
                assert_eq!(s3.bucket, "xsoar-cicd");
                assert_eq!(s3.region.as_deref(), Some("eu-west-1"));
                assert!(s3.profile.is_none());
            }
            ProviderConfig::Azure(_) => panic!("Expected S3 provider config"),
        }

        let yaml = r"
type: azure
accountUrl: https://acct.blob.core.windows.net
container: packs
";
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind(), BackendKind::AzureBlob);
    }
}
