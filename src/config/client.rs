//! # Client Configuration
//!
//! Resolves and validates how to reach and authenticate against one
//! XSOAR (version 6) or XSIAM (version 8) server.
//!
//! Every credential is resolved by ordered fallback: explicit option, then
//! environment variable. Version 8 servers additionally require an auth id
//! which is sent as the `x-xdr-auth-id` header.

use super::environment::{resolve_setting, Environment, ProcessEnvironment};
use super::tls::VerifySsl;
use super::ConfigurationError;
use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, ENV_API_KEY, ENV_BASE_URL, ENV_XSIAM_AUTH_ID, XSIAM_AUTH_ID_HEADER,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Server generation, which decides the authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ServerVersion {
    /// XSOAR 6: API key only
    Xsoar6,
    /// XSIAM / XSOAR 8: API key plus auth id
    Xsiam8,
}

impl ServerVersion {
    pub fn as_u32(self) -> u32 {
        match self {
            ServerVersion::Xsoar6 => 6,
            ServerVersion::Xsiam8 => 8,
        }
    }

    pub fn requires_auth_id(self) -> bool {
        matches!(self, ServerVersion::Xsiam8)
    }
}

impl TryFrom<u32> for ServerVersion {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(ServerVersion::Xsoar6),
            8 => Ok(ServerVersion::Xsiam8),
            other => Err(ConfigurationError::UnsupportedServerVersion(
                other.to_string(),
            )),
        }
    }
}

impl From<ServerVersion> for u32 {
    fn from(version: ServerVersion) -> Self {
        version.as_u32()
    }
}

impl std::str::FromStr for ServerVersion {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map_err(|_parse| ConfigurationError::UnsupportedServerVersion(s.to_string()))
            .and_then(ServerVersion::try_from)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Caller-supplied options; unset credentials fall back to the environment
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Overrides `DEMISTO_API_KEY`
    pub api_token: Option<String>,
    /// Overrides `DEMISTO_BASE_URL`
    pub server_url: Option<String>,
    /// Overrides `XSIAM_AUTH_ID`
    pub xsiam_auth_id: Option<String>,
    /// Pack authors whose packs come from the artifact repository
    pub custom_pack_authors: Vec<String>,
    pub verify_ssl: VerifySsl,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("server_url", &self.server_url)
            .field("xsiam_auth_id", &self.xsiam_auth_id.as_ref().map(|_| "<redacted>"))
            .field("custom_pack_authors", &self.custom_pack_authors)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

/// One resolved, immutable connection profile
pub struct ClientConfig {
    server_version: ServerVersion,
    api_token: SecretString,
    server_url: Url,
    xsiam_auth_id: Option<SecretString>,
    custom_pack_authors: Vec<String>,
    verify_ssl: VerifySsl,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_version", &self.server_version)
            .field("server_url", &self.server_url.as_str())
            .field("xsiam_auth_id", &self.xsiam_auth_id.is_some())
            .field("custom_pack_authors", &self.custom_pack_authors)
            .field("verify_ssl", &self.verify_ssl)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Build a configuration, falling back to the process environment
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] when the version is not 6 or 8, when the
    /// api token or server url cannot be resolved, or when version 8 is used
    /// without an auth id.
    pub fn build(
        server_version: u32,
        options: ClientOptions,
    ) -> Result<Self, ConfigurationError> {
        Self::build_with_env(server_version, options, &ProcessEnvironment)
    }

    /// Build a configuration, falling back to the given environment
    ///
    /// # Errors
    /// Same as [`ClientConfig::build`].
    pub fn build_with_env(
        server_version: u32,
        options: ClientOptions,
        env: &dyn Environment,
    ) -> Result<Self, ConfigurationError> {
        let server_version = ServerVersion::try_from(server_version)?;

        let api_token = resolve_setting(options.api_token.as_deref(), env, ENV_API_KEY)
            .ok_or(ConfigurationError::MissingApiToken)?;
        let server_url = resolve_setting(options.server_url.as_deref(), env, ENV_BASE_URL)
            .ok_or(ConfigurationError::MissingServerUrl)?;
        let server_url = parse_server_url(&server_url)?;

        let xsiam_auth_id = if server_version.requires_auth_id() {
            let auth_id =
                resolve_setting(options.xsiam_auth_id.as_deref(), env, ENV_XSIAM_AUTH_ID)
                    .ok_or(ConfigurationError::MissingXsiamAuthId)?;
            Some(SecretString::from(auth_id))
        } else {
            if options.xsiam_auth_id.is_some() {
                debug!("Ignoring XSIAM auth id for server version {}", server_version);
            }
            None
        };

        debug!(
            "Resolved client configuration: server_version={}, server_url={}, custom_pack_authors={}",
            server_version,
            server_url,
            options.custom_pack_authors.len()
        );

        Ok(Self {
            server_version,
            api_token: SecretString::from(api_token),
            server_url,
            xsiam_auth_id,
            custom_pack_authors: options.custom_pack_authors,
            verify_ssl: options.verify_ssl,
        })
    }

    pub fn server_version(&self) -> ServerVersion {
        self.server_version
    }

    pub fn api_token(&self) -> &SecretString {
        &self.api_token
    }

    /// Server URL without a trailing slash
    pub fn server_url(&self) -> &str {
        self.server_url.as_str().trim_end_matches('/')
    }

    /// Present only for version 8 servers
    pub fn xsiam_auth_id(&self) -> Option<&SecretString> {
        self.xsiam_auth_id.as_ref()
    }

    pub fn custom_pack_authors(&self) -> &[String] {
        &self.custom_pack_authors
    }

    pub fn verify_ssl(&self) -> &VerifySsl {
        &self.verify_ssl
    }

    /// Whether packs by `author` are served from the artifact repository
    pub fn is_custom_author(&self, author: &str) -> bool {
        self.custom_pack_authors.iter().any(|a| a == author)
    }

    /// Full URL of an API endpoint, e.g. `endpoint("/health")`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url(), path.trim_start_matches('/'))
    }

    /// Headers authenticating a REST call against this server
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidHeader`] if a credential contains
    /// characters that cannot be sent in a header.
    pub fn auth_headers(&self) -> Result<HeaderMap, ConfigurationError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            sensitive_header(self.api_token.expose_secret(), "Authorization")?,
        );
        if let Some(auth_id) = &self.xsiam_auth_id {
            headers.insert(
                XSIAM_AUTH_ID_HEADER,
                sensitive_header(auth_id.expose_secret(), XSIAM_AUTH_ID_HEADER)?,
            );
        }
        Ok(headers)
    }

    /// HTTP client preconfigured with auth headers, timeout and TLS settings
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the CA bundle cannot be loaded or
    /// the client cannot be built.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigurationError> {
        let builder = reqwest::Client::builder()
            .default_headers(self.auth_headers()?)
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        self.verify_ssl
            .apply(builder)?
            .build()
            .map_err(ConfigurationError::HttpClient)
    }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn sensitive_header(value: &str, name: &'static str) -> Result<HeaderValue, ConfigurationError> {
    let mut header =
        HeaderValue::from_str(value).map_err(|_invalid| ConfigurationError::InvalidHeader(name))?;
    header.set_sensitive(true);
    Ok(header)
}
