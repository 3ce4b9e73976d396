//! In-memory object stores behind `wiremock` servers
//!
//! `FakeBlobService` answers the Azure Blob REST calls and `FakeS3` the
//! path-style S3 REST calls the providers make. Both keep uploaded objects and
//! their `sha256` metadata so tests can upload, list and download for real.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::{Request, Respond, ResponseTemplate};

/// Stored object body and checksum metadata
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub sha256: Option<String>,
}

/// Objects shared between a fake service and the test body
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl ObjectStore {
    pub fn insert(&self, key: &str, data: &[u8], sha256: Option<&str>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                sha256: sha256.map(ToString::to_string),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Keys under `prefix`, starting after index `start`, at most `page_size`
    fn page(&self, prefix: &str, start: usize, page_size: usize) -> (Vec<(String, usize)>, bool) {
        let objects = self.objects.lock().unwrap();
        let matching: Vec<(String, usize)> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| (key.clone(), object.data.len()))
            .collect();
        let page: Vec<(String, usize)> = matching
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();
        let more = start + page.len() < matching.len();
        (page, more)
    }
}

fn query_value(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Azure Blob service for one container, authorized by one SAS signature
#[derive(Debug, Clone)]
pub struct FakeBlobService {
    pub container: String,
    pub signature: String,
    pub page_size: usize,
    pub store: ObjectStore,
}

impl FakeBlobService {
    pub fn new(container: &str, signature: &str) -> Self {
        Self {
            container: container.to_string(),
            signature: signature.to_string(),
            page_size: 1000,
            store: ObjectStore::default(),
        }
    }

    fn error(status: u16, code: &str) -> ResponseTemplate {
        ResponseTemplate::new(status)
            .insert_header("x-ms-error-code", code)
            .set_body_string(format!(
                "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>{code}</Code><Message>{code}\nRequestId:test</Message></Error>"
            ))
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let prefix = query_value(request, "prefix").unwrap_or_default();
        let start = query_value(request, "marker")
            .and_then(|marker| marker.parse().ok())
            .unwrap_or(0);
        let page_size = query_value(request, "maxresults")
            .and_then(|max| max.parse().ok())
            .unwrap_or(self.page_size);
        let (page, more) = self.store.page(&prefix, start, page_size);

        let blobs: String = page
            .iter()
            .map(|(key, size)| {
                format!(
                    "<Blob><Name>{key}</Name><Properties><Last-Modified>Mon, 27 Jan 2025 10:00:00 GMT</Last-Modified><Content-Length>{size}</Content-Length><BlobType>BlockBlob</BlobType></Properties></Blob>"
                )
            })
            .collect();
        let next_marker = if more {
            format!("<NextMarker>{}</NextMarker>", start + page.len())
        } else {
            "<NextMarker />".to_string()
        };
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/xml")
            .set_body_string(format!(
                "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults ServiceEndpoint=\"http://localhost/\" ContainerName=\"{}\"><Prefix>{prefix}</Prefix><Blobs>{blobs}</Blobs>{next_marker}</EnumerationResults>",
                self.container
            ))
    }
}

impl Respond for FakeBlobService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if query_value(request, "sig").as_deref() != Some(self.signature.as_str()) {
            return Self::error(403, "AuthenticationFailed");
        }
        if header_value(request, "x-ms-version").is_none() {
            return Self::error(400, "MissingRequiredHeader");
        }

        let container_path = format!("/{}", self.container);
        let path = request.url.path();
        if path == container_path {
            return if query_value(request, "comp").as_deref() == Some("list") {
                self.list(request)
            } else {
                Self::error(400, "InvalidQueryParameterValue")
            };
        }
        let Some(key) = path.strip_prefix(&format!("{container_path}/")) else {
            return Self::error(404, "ContainerNotFound");
        };

        match request.method.as_str() {
            "PUT" => {
                if header_value(request, "x-ms-blob-type").as_deref() != Some("BlockBlob") {
                    return Self::error(400, "MissingRequiredHeader");
                }
                let sha256 = header_value(request, "x-ms-meta-sha256");
                self.store.insert(key, &request.body, sha256.as_deref());
                ResponseTemplate::new(201)
            }
            "GET" | "HEAD" => match self.store.get(key) {
                Some(object) => {
                    let mut response = ResponseTemplate::new(200)
                        .insert_header("content-type", "application/zip");
                    if let Some(sha256) = &object.sha256 {
                        response = response.insert_header("x-ms-meta-sha256", sha256.as_str());
                    }
                    if request.method.as_str() == "GET" {
                        response = response.set_body_bytes(object.data);
                    }
                    response
                }
                None if request.method.as_str() == "HEAD" => ResponseTemplate::new(404)
                    .insert_header("x-ms-error-code", "BlobNotFound"),
                None => Self::error(404, "BlobNotFound"),
            },
            _ => Self::error(405, "UnsupportedHttpVerb"),
        }
    }
}

/// Path-style S3 service for one bucket
#[derive(Debug, Clone)]
pub struct FakeS3 {
    pub bucket: String,
    pub page_size: usize,
    pub store: ObjectStore,
}

impl FakeS3 {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            page_size: 1000,
            store: ObjectStore::default(),
        }
    }

    fn error(status: u16, code: &str) -> ResponseTemplate {
        ResponseTemplate::new(status)
            .insert_header("content-type", "application/xml")
            .set_body_string(format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{code}</Code><Message>{code}</Message><RequestId>test</RequestId></Error>"
            ))
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let prefix = query_value(request, "prefix").unwrap_or_default();
        let start = query_value(request, "continuation-token")
            .and_then(|token| token.parse().ok())
            .unwrap_or(0);
        let (page, more) = self.store.page(&prefix, start, self.page_size);

        let contents: String = page
            .iter()
            .map(|(key, size)| {
                format!(
                    "<Contents><Key>{key}</Key><LastModified>2025-01-27T10:00:00.000Z</LastModified><Size>{size}</Size><StorageClass>STANDARD</StorageClass></Contents>"
                )
            })
            .collect();
        let next = if more {
            format!(
                "<NextContinuationToken>{}</NextContinuationToken>",
                start + page.len()
            )
        } else {
            String::new()
        };
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/xml")
            .set_body_string(format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?><ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Name>{}</Name><Prefix>{prefix}</Prefix><KeyCount>{}</KeyCount><MaxKeys>{}</MaxKeys><IsTruncated>{more}</IsTruncated>{contents}{next}</ListBucketResult>",
                self.bucket,
                page.len(),
                self.page_size
            ))
    }
}

impl Respond for FakeS3 {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let signed = header_value(request, "authorization")
            .is_some_and(|value| value.starts_with("AWS4-HMAC-SHA256"));
        if !signed {
            return Self::error(403, "AccessDenied");
        }

        let bucket_path = format!("/{}", self.bucket);
        let path = request.url.path();
        if path == bucket_path || path == format!("{bucket_path}/") {
            return match request.method.as_str() {
                "HEAD" => ResponseTemplate::new(200),
                "GET" => self.list(request),
                _ => Self::error(405, "MethodNotAllowed"),
            };
        }
        let Some(key) = path.strip_prefix(&format!("{bucket_path}/")) else {
            return Self::error(404, "NoSuchBucket");
        };

        match request.method.as_str() {
            "PUT" => {
                let sha256 = header_value(request, "x-amz-meta-sha256");
                self.store.insert(key, &request.body, sha256.as_deref());
                ResponseTemplate::new(200).insert_header("etag", "\"fake-etag\"")
            }
            "GET" | "HEAD" => match self.store.get(key) {
                Some(object) => {
                    let mut response = ResponseTemplate::new(200)
                        .insert_header("content-type", "application/zip")
                        .insert_header("etag", "\"fake-etag\"");
                    if let Some(sha256) = &object.sha256 {
                        response = response.insert_header("x-amz-meta-sha256", sha256.as_str());
                    }
                    if request.method.as_str() == "GET" {
                        response = response.set_body_bytes(object.data);
                    }
                    response
                }
                None if request.method.as_str() == "HEAD" => ResponseTemplate::new(404),
                None => Self::error(404, "NoSuchKey"),
            },
            _ => Self::error(405, "MethodNotAllowed"),
        }
    }
}

/// Write `data` to a fresh temporary file named `name`
pub fn archive(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}
