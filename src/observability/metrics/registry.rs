//! # Metrics Registry
//!
//! Prometheus metrics registry setup and registration.

use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register all metrics with the Prometheus registry
///
/// Safe to call more than once; metrics that are already registered are skipped.
///
/// # Errors
/// Returns an error if a metric cannot be registered for any other reason.
pub fn register_metrics() -> prometheus::Result<()> {
    super::provider_metrics::register_provider_metrics()
}

/// Register one collector, treating a repeat registration as success
pub(crate) fn register_once(collector: Box<dyn prometheus::core::Collector>) -> prometheus::Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Render every registered metric in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails.
pub fn gather_metrics() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
