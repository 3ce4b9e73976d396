//! # Azure Blob Storage Artifact Provider
//!
//! Stores pack archives as block blobs in one container, over the Blob
//! service REST API. Every request is authorized by a shared access signature
//! appended to the URL; the signature never appears in logs, errors or
//! reported locations.

mod auth;
mod client;
mod operations;
mod types;

use crate::config::Environment;
use crate::error::{ArtifactError, Operation};
use crate::provider::{paginate, ArtifactProvider, BackendKind, RemoteLocation};
use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use self::auth::resolve_sas_token;
use self::client::create_client_components;
use self::operations::BlobOperations;

/// Azure Blob provider settings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureBlobConfig {
    /// Storage account URL, e.g. `https://myaccount.blob.core.windows.net`
    pub account_url: String,
    pub container: String,
    /// Falls back to `AZURE_STORAGE_SAS_TOKEN`; never read from files
    #[serde(skip)]
    pub sas_token: Option<SecretString>,
}

/// Artifact provider backed by one Azure Blob container
pub struct AzureBlobProvider {
    operations: BlobOperations,
}

impl std::fmt::Debug for AzureBlobProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobProvider")
            .field("container", &self.operations.components.container)
            .finish_non_exhaustive()
    }
}

impl AzureBlobProvider {
    /// Resolve the SAS token and check that the container accepts it
    ///
    /// # Errors
    /// Returns an `Authentication` error for a missing or rejected SAS token,
    /// `Configuration` for an unusable account URL and `NotFound` when the
    /// container does not exist.
    pub async fn connect(
        config: AzureBlobConfig,
        env: &dyn Environment,
    ) -> Result<Self, ArtifactError> {
        let sas_token = resolve_sas_token(&config, env)?;
        let components = create_client_components(&config, sas_token)?;
        let operations = BlobOperations { components };

        operations.probe(Operation::Connect).await?;
        info!(
            "Azure Blob artifact provider ready for container {}",
            operations.components.container
        );
        Ok(Self { operations })
    }
}

#[async_trait]
impl ArtifactProvider for AzureBlobProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::AzureBlob
    }

    fn container(&self) -> &str {
        &self.operations.components.container
    }

    async fn upload(
        &self,
        local_archive: &Path,
        remote_key: &str,
    ) -> Result<RemoteLocation, ArtifactError> {
        self.operations.upload(local_archive, remote_key).await
    }

    async fn download(
        &self,
        remote_key: &str,
        destination: &Path,
    ) -> Result<PathBuf, ArtifactError> {
        self.operations.download(remote_key, destination).await
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<RemoteLocation, ArtifactError>> {
        paginate(move |marker| self.operations.list_page(prefix, marker))
    }

    async fn exists(&self, remote_key: &str) -> Result<bool, ArtifactError> {
        self.operations.exists(remote_key).await
    }

    async fn fetch(&self, remote_key: &str) -> Result<Vec<u8>, ArtifactError> {
        self.operations.fetch(remote_key).await
    }

    async fn test_connection(&self) -> Result<(), ArtifactError> {
        self.operations.test_connection().await
    }
}
