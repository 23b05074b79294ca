//! Before/after size statistics.
//!
//! The presentation layer shows three strings: original size in KB,
//! compressed size in KB, and the saving as a percentage. All three use two
//! decimals. The ratio is `(1 - compressed / original) * 100` and is `N/A`
//! when the original is empty, never a division by zero.

use serde::Serialize;

/// Shown instead of a ratio when it is undefined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Raw byte counts for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMetrics {
    pub original: usize,
    pub compressed: usize,
}

impl SizeMetrics {
    pub fn new(original: usize, compressed: usize) -> Self {
        Self {
            original,
            compressed,
        }
    }

    /// Fraction of bytes saved, `1 - compressed / original`.
    ///
    /// Negative when the output grew; `None` when the original is empty.
    pub fn ratio(&self) -> Option<f64> {
        if self.original == 0 {
            return None;
        }
        Some(1.0 - self.compressed as f64 / self.original as f64)
    }

    /// [`ratio`](Self::ratio) as a percentage.
    pub fn ratio_percent(&self) -> Option<f64> {
        self.ratio().map(|r| r * 100.0)
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            original_kb: format_kb(self.original),
            compressed_kb: format_kb(self.compressed),
            ratio: format_ratio(self.ratio_percent()),
        }
    }
}

/// The three display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub original_kb: String,
    pub compressed_kb: String,
    pub ratio: String,
}

/// Bytes as kilobytes (1 KB = 1024 bytes), two decimals, no unit.
pub fn format_kb(bytes: usize) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

/// Percentage with two decimals and a `%` sign, or `N/A`.
pub fn format_ratio(percent: Option<f64>) -> String {
    match percent {
        // Values that round to zero print as 0.00%, not -0.00%.
        Some(p) if (p * 100.0).round() == 0.0 => "0.00%".to_string(),
        Some(p) => format!("{p:.2}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}
