//! # Azure Providers
//!
//! - `blob`: Azure Blob Storage for content-pack archives, authorized with a
//!   shared access signature

pub mod blob;

pub use blob::{AzureBlobConfig, AzureBlobProvider};
