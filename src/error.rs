//! # Error Types
//!
//! Configuration errors raised while building a [`ClientConfig`](crate::config::ClientConfig)
//! and artifact errors raised by [`ArtifactProvider`](crate::provider::ArtifactProvider)
//! operations, classified so callers can decide what to do next.

use crate::provider::BackendKind;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or missing configuration, detected at construction time
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unsupported server version {0}, expected 6 (XSOAR) or 8 (XSIAM)")]
    UnsupportedServerVersion(String),

    #[error("api token is required: pass it explicitly or set DEMISTO_API_KEY")]
    MissingApiToken,

    #[error("server url is required: pass it explicitly or set DEMISTO_BASE_URL")]
    MissingServerUrl,

    #[error("invalid server url {url:?}: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("XSIAM auth id is required for server version 8: pass it explicitly or set XSIAM_AUTH_ID")]
    MissingXsiamAuthId,

    #[error("artifact store {0} is not yet implemented")]
    UnsupportedArtifactStore(String),

    #[error("missing artifact provider setting {setting}: set {env_var}")]
    MissingProviderSetting {
        setting: &'static str,
        env_var: &'static str,
    },

    #[error("failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA bundle {path}: {source}")]
    InvalidCaBundle {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("value for header {0} contains characters not allowed in HTTP headers")]
    InvalidHeader(&'static str),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Artifact provider operation, recorded on errors, spans and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Upload,
    Download,
    List,
    Exists,
    TestConnection,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::List => "list",
            Operation::Exists => "exists",
            Operation::TestConnection => "test_connection",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of artifact provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactErrorKind {
    /// Provider settings are unusable (bad URL, missing bucket)
    Configuration,
    /// Credentials could not be resolved or were rejected while connecting
    Authentication,
    /// Remote key or local file does not exist
    NotFound,
    /// Transport failure, unexpected response or integrity mismatch
    Io,
    /// Backend rejected an otherwise valid request (ACL, expired SAS scope)
    Permission,
}

impl ArtifactErrorKind {
    /// Whether the caller can reasonably carry on with the same provider
    ///
    /// A missing artifact commonly leads to an initial upload instead.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ArtifactErrorKind::NotFound)
    }

    /// Stable label for metrics
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactErrorKind::Configuration => "configuration",
            ArtifactErrorKind::Authentication => "authentication",
            ArtifactErrorKind::NotFound => "not_found",
            ArtifactErrorKind::Io => "io",
            ArtifactErrorKind::Permission => "permission",
        }
    }
}

impl fmt::Display for ArtifactErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact provider failure with the context needed to diagnose it
#[derive(Debug, Error)]
#[error("{backend} {operation} failed for {target:?} ({kind}): {message}")]
pub struct ArtifactError {
    pub kind: ArtifactErrorKind,
    pub backend: BackendKind,
    pub operation: Operation,
    /// Key, path or container the operation was working on
    pub target: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ArtifactError {
    pub fn new(
        kind: ArtifactErrorKind,
        backend: BackendKind,
        operation: Operation,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            backend,
            operation,
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Error for a local file that could not be read or written
    pub fn from_local_io(
        backend: BackendKind,
        operation: Operation,
        path: &std::path::Path,
        err: std::io::Error,
    ) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ArtifactErrorKind::NotFound
        } else {
            ArtifactErrorKind::Io
        };
        Self::new(
            kind,
            backend,
            operation,
            path.display().to_string(),
            format!("local file error: {err}"),
        )
        .with_source(err)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ArtifactErrorKind::NotFound
    }
}

/// Classify an HTTP status returned by a storage backend
///
/// While connecting, rejected credentials are an authentication failure that
/// invalidates the provider; during later operations they are a permission
/// failure scoped to that call.
pub fn classify_status(status: u16, operation: Operation) -> ArtifactErrorKind {
    match status {
        401 | 403 if operation == Operation::Connect => ArtifactErrorKind::Authentication,
        401 | 403 => ArtifactErrorKind::Permission,
        404 => ArtifactErrorKind::NotFound,
        _ => ArtifactErrorKind::Io,
    }
}

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
