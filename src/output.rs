//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! photo.jpg → compressed_photo.jpg
//!     Format: JPEG 400x200 (q35)
//!     Original: 123.45 KB
//!     Compressed: 45.67 KB
//!     Saved: 63.00%
//! ```
//!
//! ## Tiers
//!
//! ```text
//! photo.jpg (123.45 KB)
//!     low (q85): 60.00 KB, saved 51.40%
//!     medium (q60): 38.10 KB, saved 69.14%
//!     high (q35): 27.92 KB, saved 77.38%
//! Selected medium (q60): 38.10 KB, saved 69.14% (reused)
//! Cache: 1 cached, 3 encoded (4 total)
//! ```
//!
//! ## Progress
//!
//! ```text
//! photo.jpg: decoding
//! photo.jpg: encoding
//! photo.jpg: done
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{CompressionLevel, QualitySetting};
use crate::metrics::{MetricsReport, format_kb};
use crate::pipeline::{CompressError, StageEvent};
use crate::types::CompressionResult;
use serde::Serialize;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `(q35)` for encoded output, `(original)` for passthrough.
fn quality_label(result: &CompressionResult) -> String {
    match result.quality {
        Some(q) => format!("q{q}"),
        None => "original".to_string(),
    }
}

/// One-line error with its stable code.
///
/// ```text
/// error[UnsupportedFormat]: Unsupported format: BMP (expected JPEG, PNG or GIF)
/// ```
pub fn format_error(err: &CompressError) -> String {
    format!("error[{}]: {}", err.code(), err)
}

// ============================================================================
// Compress
// ============================================================================

/// Format the outcome of a single `compress` run.
pub fn format_result(source: &str, result: &CompressionResult) -> Vec<String> {
    let report = result.report();
    vec![
        format!("{} → {}", source, result.filename),
        format!(
            "{}Format: {} {} ({})",
            indent(1),
            result.format,
            result.dimensions,
            quality_label(result)
        ),
        format!("{}Original: {} KB", indent(1), report.original_kb),
        format!("{}Compressed: {} KB", indent(1), report.compressed_kb),
        format!("{}Saved: {}", indent(1), report.ratio),
    ]
}

pub fn print_result(source: &str, result: &CompressionResult) {
    for line in format_result(source, result) {
        println!("{}", line);
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    #[serde(flatten)]
    result: &'a CompressionResult,
    #[serde(flatten)]
    metrics: MetricsReport,
}

/// Machine-readable report for `compress --json`. Output bytes are omitted.
pub fn format_json(source: &str, result: &CompressionResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        source,
        result,
        metrics: result.report(),
    })
}

/// JSON body for a failed `compress --json`.
pub fn format_json_error(source: &str, err: &CompressError) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "source": source,
        "error": err.code(),
        "message": err.to_string(),
    }))
}

// ============================================================================
// Tiers
// ============================================================================

/// Format a side-by-side comparison of the encoding tiers.
pub fn format_tiers(
    source: &str,
    original_size: usize,
    tiers: &[(CompressionLevel, Result<CompressionResult, CompressError>)],
) -> Vec<String> {
    let mut lines = vec![format!("{} ({} KB)", source, format_kb(original_size))];
    for (level, outcome) in tiers {
        let line = match outcome {
            Ok(result) => {
                let report = result.report();
                format!(
                    "{}{} ({}): {} KB, saved {}",
                    indent(1),
                    level,
                    quality_label(result),
                    report.compressed_kb,
                    report.ratio
                )
            }
            Err(err) => format!("{}{}: {}", indent(1), level, format_error(err)),
        };
        lines.push(line);
    }
    lines
}

pub fn print_tiers(
    source: &str,
    original_size: usize,
    tiers: &[(CompressionLevel, Result<CompressionResult, CompressError>)],
) {
    for line in format_tiers(source, original_size, tiers) {
        println!("{}", line);
    }
}

/// The setting `tiers` would apply, marked `(reused)` when the memo already
/// held it from the comparison.
pub fn format_selected(
    setting: QualitySetting,
    outcome: &Result<CompressionResult, CompressError>,
    reused: bool,
) -> String {
    match outcome {
        Ok(result) => {
            let report = result.report();
            format!(
                "Selected {} ({}): {} KB, saved {}{}",
                setting,
                quality_label(result),
                report.compressed_kb,
                report.ratio,
                if reused { " (reused)" } else { "" }
            )
        }
        Err(err) => format!("Selected {}: {}", setting, format_error(err)),
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single stage transition as display lines.
pub fn format_stage_event(event: &StageEvent) -> Vec<String> {
    vec![format!("{}: {}", event.filename, event.stage)]
}
