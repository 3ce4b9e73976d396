//! # AWS Providers
//!
//! - `s3`: Amazon S3 (and S3-compatible stores) for content-pack archives

pub mod s3;

pub use s3::{S3Config, S3Provider};
