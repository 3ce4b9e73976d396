//! # Provider Metrics
//!
//! Metrics for artifact provider operations against S3 and Azure Blob Storage.

use super::registry::register_once;
use crate::error::{ArtifactErrorKind, Operation};
use crate::provider::BackendKind;
use prometheus::{HistogramVec, IntCounterVec};
use std::sync::LazyLock;

static ARTIFACT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "xsoar_artifact_operations_total",
            "Total number of artifact provider operations",
        ),
        &["backend", "operation", "outcome"],
    )
    .expect("Failed to create ARTIFACT_OPERATIONS_TOTAL metric - this should never happen")
});

static ARTIFACT_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "xsoar_artifact_operation_duration_seconds",
            "Duration of artifact provider operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["backend", "operation"],
    )
    .expect("Failed to create ARTIFACT_OPERATION_DURATION metric - this should never happen")
});

static ARTIFACT_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "xsoar_artifact_operation_errors_total",
            "Total number of artifact provider errors by classification",
        ),
        &["backend", "kind"],
    )
    .expect("Failed to create ARTIFACT_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static ARTIFACT_BYTES_TRANSFERRED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "xsoar_artifact_bytes_transferred_total",
            "Total number of archive bytes uploaded or downloaded",
        ),
        &["backend", "direction"],
    )
    .expect("Failed to create ARTIFACT_BYTES_TRANSFERRED_TOTAL metric - this should never happen")
});

/// Register provider metrics with the registry
pub(crate) fn register_provider_metrics() -> prometheus::Result<()> {
    register_once(Box::new(ARTIFACT_OPERATIONS_TOTAL.clone()))?;
    register_once(Box::new(ARTIFACT_OPERATION_DURATION.clone()))?;
    register_once(Box::new(ARTIFACT_OPERATION_ERRORS_TOTAL.clone()))?;
    register_once(Box::new(ARTIFACT_BYTES_TRANSFERRED_TOTAL.clone()))?;
    Ok(())
}

/// Record a completed operation
pub fn record_artifact_operation(
    backend: BackendKind,
    operation: Operation,
    success: bool,
    duration_secs: f64,
) {
    let outcome = if success { "success" } else { "error" };
    ARTIFACT_OPERATIONS_TOTAL
        .with_label_values(&[backend.as_str(), operation.as_str(), outcome])
        .inc();
    ARTIFACT_OPERATION_DURATION
        .with_label_values(&[backend.as_str(), operation.as_str()])
        .observe(duration_secs);
}

/// Record a classified failure
pub fn increment_artifact_errors(backend: BackendKind, kind: ArtifactErrorKind) {
    ARTIFACT_OPERATION_ERRORS_TOTAL
        .with_label_values(&[backend.as_str(), kind.as_str()])
        .inc();
}

/// Record archive bytes moved; `direction` is `upload` or `download`
pub fn record_bytes_transferred(backend: BackendKind, direction: &str, bytes: u64) {
    ARTIFACT_BYTES_TRANSFERRED_TOTAL
        .with_label_values(&[backend.as_str(), direction])
        .inc_by(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_exported_after_registration() {
        super::super::register_metrics().unwrap();
        super::super::register_metrics().unwrap();

        record_artifact_operation(BackendKind::S3, Operation::Upload, true, 0.2);
        increment_artifact_errors(BackendKind::AzureBlob, ArtifactErrorKind::NotFound);
        record_bytes_transferred(BackendKind::S3, "upload", 1024);

        let text = super::super::gather_metrics().unwrap();
        assert!(text.contains("xsoar_artifact_operations_total"));
        assert!(text.contains("xsoar_artifact_operation_errors_total"));
        assert!(text.contains("kind=\"not_found\""));
        assert!(text.contains("xsoar_artifact_bytes_transferred_total"));
    }
}
