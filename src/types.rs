//! The value handed back to the presentation layer.

use crate::imaging::{Dimensions, ImageKind};
use crate::metrics::{MetricsReport, SizeMetrics};
use serde::Serialize;

/// Output of one successful pipeline run.
///
/// Everything the caller needs to offer a download and show savings:
/// encoded bytes, a suggested filename, the MIME type, and the size figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionResult {
    /// Encoded output (or the untouched upload for the `original` tier).
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: ImageKind,
    /// Pixel dimensions of the output.
    pub dimensions: Dimensions,
    pub original_size: usize,
    pub compressed_size: usize,
    /// Numeric quality used; absent when encoding was bypassed.
    pub quality: Option<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl CompressionResult {
    pub fn metrics(&self) -> SizeMetrics {
        SizeMetrics::new(self.original_size, self.compressed_size)
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics().report()
    }

    /// Whether the output is the upload itself.
    pub fn is_passthrough(&self) -> bool {
        self.quality.is_none()
    }
}
