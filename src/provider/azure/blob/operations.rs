//! # Azure Blob Operations
//!
//! Blob service REST calls behind the artifact provider operations.

use super::client::ClientComponents;
use super::types::{parse_xml, EnumerationResults, StorageError};
use crate::error::{classify_status, ArtifactError, ArtifactErrorKind, Operation};
use crate::observability::metrics;
use crate::provider::{
    observe, prepare_destination, sha256_hex, validate_key, verify_checksum, BackendKind,
    RemoteLocation,
};
use paths::azure::{list, meta_header, BLOB_TYPE_HEADER, BLOCK_BLOB};
use paths::CHECKSUM_METADATA_KEY;
use reqwest::{Method, RequestBuilder, Response};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Azure Blob operations against one container
pub struct BlobOperations {
    pub components: ClientComponents,
}

impl BlobOperations {
    fn error(
        kind: ArtifactErrorKind,
        operation: Operation,
        target: &str,
        message: impl Into<String>,
    ) -> ArtifactError {
        ArtifactError::new(kind, BackendKind::AzureBlob, operation, target, message)
    }

    /// Send a request and turn non-success statuses into classified errors
    ///
    /// Transport errors are stripped of their URL, which carries the SAS token.
    async fn send(
        request: RequestBuilder,
        operation: Operation,
        target: &str,
    ) -> Result<Response, ArtifactError> {
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            Self::error(
                ArtifactErrorKind::Io,
                operation,
                target,
                format!("request failed: {e}"),
            )
            .with_source(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let header_code = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(
                    "Failed to read error body for HTTP {} on {}: {}",
                    status.as_u16(),
                    target,
                    e.without_url()
                );
                String::new()
            }
        };
        let details = parse_xml::<StorageError>(&body).unwrap_or_default();
        let code = details.code.or(header_code);

        let mut message = format!("HTTP {}", status.as_u16());
        if let Some(code) = code {
            message.push_str(&format!(" {code}"));
        }
        if let Some(details) = details.message {
            message.push_str(&format!(": {}", details.lines().next().unwrap_or_default()));
        }
        Err(Self::error(
            classify_status(status.as_u16(), operation),
            operation,
            target,
            message,
        ))
    }

    fn location(&self, key: &str) -> RemoteLocation {
        RemoteLocation {
            backend: BackendKind::AzureBlob,
            container: self.components.container.clone(),
            key: key.to_string(),
            uri: self.components.blob_url(key).to_string(),
            size: None,
            last_modified: None,
            checksum: None,
        }
    }

    /// List at most one blob to check that the container answers to the SAS
    pub async fn probe(&self, operation: Operation) -> Result<(), ArtifactError> {
        let mut url = self.components.signed_container_url();
        url.query_pairs_mut()
            .append_pair(list::RESTYPE.0, list::RESTYPE.1)
            .append_pair(list::COMP.0, list::COMP.1)
            .append_pair(list::MAX_RESULTS, "1");
        Self::send(
            self.components.request(Method::GET, url),
            operation,
            &self.components.container,
        )
        .await?;
        debug!(
            "Azure Blob container {} is reachable",
            self.components.container
        );
        Ok(())
    }

    pub async fn test_connection(&self) -> Result<(), ArtifactError> {
        let span = artifact_span!(
            "azure.blob.container.test_connection",
            self.components.container,
            self.components.container
        );
        observe(
            span,
            BackendKind::AzureBlob,
            Operation::TestConnection,
            self.probe(Operation::TestConnection),
        )
        .await
    }

    pub async fn upload(
        &self,
        local_archive: &Path,
        remote_key: &str,
    ) -> Result<RemoteLocation, ArtifactError> {
        let span = artifact_span!(
            "azure.blob.upload",
            self.components.container,
            remote_key
        );
        observe(span, BackendKind::AzureBlob, Operation::Upload, async {
            validate_key(BackendKind::AzureBlob, Operation::Upload, remote_key)?;
            let data = tokio::fs::read(local_archive).await.map_err(|e| {
                ArtifactError::from_local_io(
                    BackendKind::AzureBlob,
                    Operation::Upload,
                    local_archive,
                    e,
                )
            })?;
            let checksum = sha256_hex(&data);
            let size = data.len() as u64;
            let location = self.location(remote_key);

            info!(
                "Uploading {} ({} bytes) to {}",
                local_archive.display(),
                size,
                location.uri
            );
            let request = self
                .components
                .request(Method::PUT, self.components.signed_blob_url(remote_key))
                .header(BLOB_TYPE_HEADER, BLOCK_BLOB)
                .header(reqwest::header::CONTENT_TYPE, "application/zip")
                .header(meta_header(CHECKSUM_METADATA_KEY), checksum.as_str())
                .body(data);
            Self::send(request, Operation::Upload, remote_key).await?;

            metrics::record_bytes_transferred(BackendKind::AzureBlob, "upload", size);
            Ok(RemoteLocation {
                size: Some(size),
                checksum: Some(checksum),
                ..location
            })
        })
        .await
    }

    async fn read_blob(&self, remote_key: &str) -> Result<Vec<u8>, ArtifactError> {
        validate_key(BackendKind::AzureBlob, Operation::Download, remote_key)?;
        let request = self
            .components
            .request(Method::GET, self.components.signed_blob_url(remote_key));
        let response = Self::send(request, Operation::Download, remote_key).await?;

        let expected = response
            .headers()
            .get(meta_header(CHECKSUM_METADATA_KEY))
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let data = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            Self::error(
                ArtifactErrorKind::Io,
                Operation::Download,
                remote_key,
                format!("failed to read blob body: {e}"),
            )
            .with_source(e)
        })?;

        verify_checksum(expected.as_deref(), &data, BackendKind::AzureBlob, remote_key)?;
        metrics::record_bytes_transferred(BackendKind::AzureBlob, "download", data.len() as u64);
        Ok(data.to_vec())
    }

    pub async fn download(
        &self,
        remote_key: &str,
        destination: &Path,
    ) -> Result<PathBuf, ArtifactError> {
        let span = artifact_span!(
            "azure.blob.download",
            self.components.container,
            remote_key
        );
        observe(span, BackendKind::AzureBlob, Operation::Download, async {
            let data = self.read_blob(remote_key).await?;
            prepare_destination(BackendKind::AzureBlob, destination).await?;
            tokio::fs::write(destination, &data).await.map_err(|e| {
                ArtifactError::from_local_io(
                    BackendKind::AzureBlob,
                    Operation::Download,
                    destination,
                    e,
                )
            })?;
            info!(
                "Downloaded {} to {}",
                self.components.blob_url(remote_key),
                destination.display()
            );
            Ok(destination.to_path_buf())
        })
        .await
    }

    pub async fn fetch(&self, remote_key: &str) -> Result<Vec<u8>, ArtifactError> {
        let span = artifact_span!("azure.blob.fetch", self.components.container, remote_key);
        observe(
            span,
            BackendKind::AzureBlob,
            Operation::Download,
            self.read_blob(remote_key),
        )
        .await
    }

    pub async fn exists(&self, remote_key: &str) -> Result<bool, ArtifactError> {
        let span = artifact_span!("azure.blob.exists", self.components.container, remote_key);
        observe(span, BackendKind::AzureBlob, Operation::Exists, async {
            validate_key(BackendKind::AzureBlob, Operation::Exists, remote_key)?;
            let request = self
                .components
                .request(Method::HEAD, self.components.signed_blob_url(remote_key));
            match Self::send(request, Operation::Exists, remote_key).await {
                Ok(_) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// One `List Blobs` page under `prefix`
    pub async fn list_page(
        &self,
        prefix: &str,
        marker: Option<String>,
    ) -> Result<(Vec<RemoteLocation>, Option<String>), ArtifactError> {
        let span = artifact_span!("azure.blob.list", self.components.container, prefix);
        observe(span, BackendKind::AzureBlob, Operation::List, async {
            let mut url = self.components.signed_container_url();
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair(list::RESTYPE.0, list::RESTYPE.1)
                    .append_pair(list::COMP.0, list::COMP.1)
                    .append_pair(list::PREFIX, prefix);
                if let Some(marker) = &marker {
                    query.append_pair(list::MARKER, marker);
                }
            }

            let response =
                Self::send(self.components.request(Method::GET, url), Operation::List, prefix)
                    .await?;
            let body = response.text().await.map_err(|e| {
                let e = e.without_url();
                Self::error(
                    ArtifactErrorKind::Io,
                    Operation::List,
                    prefix,
                    format!("failed to read list response: {e}"),
                )
                .with_source(e)
            })?;
            let results: EnumerationResults = parse_xml(&body).map_err(|e| {
                Self::error(
                    ArtifactErrorKind::Io,
                    Operation::List,
                    prefix,
                    format!("unexpected list response: {e}"),
                )
                .with_source(e)
            })?;

            let items: Vec<RemoteLocation> = results
                .blobs
                .items
                .into_iter()
                .map(|blob| RemoteLocation {
                    size: blob.properties.content_length,
                    last_modified: blob.properties.last_modified(),
                    ..self.location(&blob.name)
                })
                .collect();
            debug!("Listed {} blobs under {}", items.len(), prefix);
            Ok((items, results.next_marker))
        })
        .await
    }
}
