//! # Metrics Module
//!
//! Prometheus metrics, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text export
//! - `provider_metrics` - Artifact provider operations (S3, Azure Blob)

pub mod provider_metrics;
pub mod registry;

pub use provider_metrics::*;
pub use registry::*;
