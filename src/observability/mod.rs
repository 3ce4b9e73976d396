//! # Observability
//!
//! Prometheus metrics for artifact provider operations. Logging goes through
//! `tracing`; subscribers are installed by the binary, never by the library.

pub mod metrics;
