//! # XSOAR Client
//!
//! Client configuration for Cortex XSOAR 6 and XSIAM 8 servers, plus an
//! artifact repository for custom content-pack archives stored in Amazon S3
//! or Azure Blob Storage.
//!
//! ## Overview
//!
//! - [`config::ClientConfig`] validates the server version, API token, server
//!   URL and (for XSIAM) the auth id, falling back to `DEMISTO_API_KEY`,
//!   `DEMISTO_BASE_URL` and `XSIAM_AUTH_ID`. It produces the auth headers and
//!   HTTP client the REST layer uses.
//! - [`provider::ArtifactProvider`] uploads, downloads and lists pack
//!   archives under `content/packs/{pack_id}/{pack_version}/{pack_id}.zip`,
//!   with one implementation per backend.
//!
//! ## Usage
//!
//! ```no_run
//! use xsoar_client::config::{ClientConfig, ClientOptions, ProcessEnvironment};
//! use xsoar_client::provider::{create_provider, ProviderConfig};
//!
//! # async fn run() -> xsoar_client::Result<()> {
//! let config = ClientConfig::build(8, ClientOptions::default())?;
//! let provider = create_provider(
//!     ProviderConfig::from_env(&ProcessEnvironment)?,
//!     &ProcessEnvironment,
//! )
//! .await?;
//! let latest = provider.latest_pack_version("MyPack").await?;
//! # let _ = (config, latest);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod provider;

pub use config::{ClientConfig, ClientOptions, ServerVersion};
pub use error::{ArtifactError, ArtifactErrorKind, ConfigurationError, Error, Result};
pub use provider::{create_provider, ArtifactProvider, BackendKind, ProviderConfig, RemoteLocation};
pub use secrecy;
