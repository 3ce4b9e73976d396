//! # Azure Blob Client Creation
//!
//! Validates the account URL and builds the HTTP client and signed URLs.

use super::AzureBlobConfig;
use crate::error::{ArtifactError, ArtifactErrorKind, Operation};
use crate::provider::BackendKind;
use paths::azure::{API_VERSION, VERSION_HEADER};
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Components needed for Azure Blob operations
pub struct ClientComponents {
    pub http_client: Client,
    pub container: String,
    /// `{account_url}/{container}`, without credentials
    container_url: Url,
    sas_token: SecretString,
}

/// Create Azure Blob client components
pub fn create_client_components(
    config: &AzureBlobConfig,
    sas_token: SecretString,
) -> Result<ClientComponents, ArtifactError> {
    let config_error = |message: String| {
        ArtifactError::new(
            ArtifactErrorKind::Configuration,
            BackendKind::AzureBlob,
            Operation::Connect,
            config.account_url.as_str(),
            message,
        )
    };

    let container = config.container.trim();
    if container.is_empty() {
        return Err(config_error("container name is empty".to_string()));
    }

    let mut container_url = Url::parse(config.account_url.trim())
        .map_err(|e| config_error(format!("invalid account url: {e}")).with_source(e))?;
    if !matches!(container_url.scheme(), "http" | "https") || container_url.host().is_none() {
        return Err(config_error(
            "account url must be an http(s) URL with a host".to_string(),
        ));
    }
    container_url.set_query(None);
    container_url.set_fragment(None);
    container_url
        .path_segments_mut()
        .map_err(|()| config_error("account url cannot carry a path".to_string()))?
        .pop_if_empty()
        .push(container);

    info!("Azure Blob container URL: {}", container_url);

    let http_client = Client::builder().build().map_err(|e| {
        config_error(format!("failed to create HTTP client: {e}")).with_source(e)
    })?;

    Ok(ClientComponents {
        http_client,
        container: container.to_string(),
        container_url,
        sas_token,
    })
}

impl ClientComponents {
    /// Blob URL without credentials, safe to log and report
    pub fn blob_url(&self, key: &str) -> Url {
        let mut url = self.container_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(key.split('/'));
        }
        url
    }

    /// `url` with the SAS token as its query string
    ///
    /// Further query pairs can be appended to the returned URL.
    pub fn sign(&self, mut url: Url) -> Url {
        url.set_query(Some(self.sas_token.expose_secret()));
        url
    }

    pub fn signed_container_url(&self) -> Url {
        self.sign(self.container_url.clone())
    }

    pub fn signed_blob_url(&self, key: &str) -> Url {
        self.sign(self.blob_url(key))
    }

    /// Request builder with the headers every Blob service call carries
    pub fn request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(VERSION_HEADER, API_VERSION)
    }
}
