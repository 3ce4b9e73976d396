//! # Constants
//!
//! Environment variable names and defaults shared across the crate.

/// XSOAR API token fallback
pub const ENV_API_KEY: &str = "DEMISTO_API_KEY";

/// XSOAR server URL fallback
pub const ENV_BASE_URL: &str = "DEMISTO_BASE_URL";

/// XSIAM auth id fallback (server version 8 only)
pub const ENV_XSIAM_AUTH_ID: &str = "XSIAM_AUTH_ID";

/// Artifact store selection (`S3` or `Azure`)
pub const ENV_ARTIFACTS_LOCATION: &str = "ARTIFACTS_LOCATION";

/// S3 bucket holding custom content packs
pub const ENV_S3_BUCKET_NAME: &str = "S3_BUCKET_NAME";

/// Optional S3-compatible endpoint (MinIO, LocalStack, ...)
pub const ENV_S3_ENDPOINT_URL: &str = "S3_ENDPOINT_URL";

/// Azure storage account URL, e.g. `https://myaccount.blob.core.windows.net`
pub const ENV_AZURE_ACCOUNT_URL: &str = "AZURE_STORAGE_ACCOUNT_URL";

/// Azure Blob container holding custom content packs
pub const ENV_AZURE_CONTAINER: &str = "AZURE_STORAGE_CONTAINER";

/// Azure shared access signature for the container
pub const ENV_AZURE_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";

/// Timeout applied to every REST call against the XSOAR server (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Header carrying the XSIAM auth id on version 8 servers
pub const XSIAM_AUTH_ID_HEADER: &str = "x-xdr-auth-id";
