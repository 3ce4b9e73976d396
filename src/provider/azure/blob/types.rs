//! # Azure Blob Types
//!
//! XML response bodies of the Blob service.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `List Blobs` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumerationResults {
    #[serde(default)]
    pub blobs: Blobs,
    /// Continuation marker; absent or empty on the last page
    #[serde(default)]
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Blobs {
    #[serde(rename = "Blob", default)]
    pub items: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobItem {
    pub name: String,
    #[serde(default)]
    pub properties: BlobProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlobProperties {
    #[serde(rename = "Content-Length", default)]
    pub content_length: Option<u64>,
    /// RFC 1123 timestamp, e.g. `Mon, 27 Jan 2025 10:00:00 GMT`
    #[serde(rename = "Last-Modified", default)]
    pub last_modified: Option<String>,
}

impl BlobProperties {
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|value| value.with_timezone(&Utc))
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parse a Blob service XML body, tolerating a leading byte order mark
pub fn parse_xml<T>(body: &str) -> Result<T, quick_xml::DeError>
where
    T: for<'de> Deserialize<'de>,
{
    quick_xml::de::from_str(body.trim_start_matches('\u{feff}'))
}
