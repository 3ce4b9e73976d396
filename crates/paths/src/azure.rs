//! # Azure Blob Storage REST Fragments
//!
//! API version, headers and query parameters of the Blob service REST API.
//!
//! API Reference: https://learn.microsoft.com/en-us/rest/api/storageservices/blob-service-rest-api

/// Blob service version sent in `x-ms-version`
pub const API_VERSION: &str = "2023-11-03";

/// Request header carrying the service version
pub const VERSION_HEADER: &str = "x-ms-version";

/// Request header selecting the blob type on `Put Blob`
pub const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";

/// Blob type used for pack archives
pub const BLOCK_BLOB: &str = "BlockBlob";

/// Prefix of user-defined metadata headers
pub const META_HEADER_PREFIX: &str = "x-ms-meta-";

/// Query parameters of `List Blobs`
///
/// `GET {account}/{container}?restype=container&comp=list&prefix=..&marker=..`
pub mod list {
    pub const RESTYPE: (&str, &str) = ("restype", "container");
    pub const COMP: (&str, &str) = ("comp", "list");
    pub const PREFIX: &str = "prefix";
    pub const MARKER: &str = "marker";
    pub const MAX_RESULTS: &str = "maxresults";
}

/// Full name of a metadata header, e.g. `x-ms-meta-sha256`
pub fn meta_header(name: &str) -> String {
    format!("{META_HEADER_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_header() {
        assert_eq!(meta_header("sha256"), "x-ms-meta-sha256");
    }
}
