//! # imgpress
//!
//! Lossy image recompression for uploads. Give it the bytes of a JPEG, PNG
//! or GIF, a quality tier, and optionally a size bound; it hands back smaller
//! bytes in the same format, a download name, a MIME type, and the savings.
//!
//! ```no_run
//! use imgpress::imaging::{CompressionLevel, ResizeSpec};
//!
//! let upload = std::fs::read("photo.jpg")?;
//! let result = imgpress::process(
//!     &upload,
//!     "photo.jpg",
//!     CompressionLevel::High.into(),
//!     Some(ResizeSpec::max_width(400)),
//! )?;
//! println!("{} saved {}", result.filename, result.report().ratio);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture: One Request, One Pass
//!
//! ```text
//! bytes + filename + tier (+ resize)
//!   → detect format (header first)
//!   → decode → resize? → encode
//!   → CompressionResult { bytes, filename, mime, sizes }
//! ```
//!
//! Requests share nothing. State that outlives a request (a memo of earlier
//! results, the "last result" of an interactive session) is owned by the
//! caller, never global.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Request orchestration, format detection, error taxonomy, stage events |
//! | [`imaging`] | Pure-Rust codec adapter: sniff, identify, decode, Lanczos3 resize, per-format encode |
//! | [`metrics`] | KB and percentage strings for the before/after report |
//! | [`naming`] | Upload filename parsing and the suggested download name |
//! | [`cache`] | Content-addressed LRU memo and the caller-owned last result |
//! | [`config`] | `imgpress.toml` loading, validation, merging |
//! | [`types`] | [`CompressionResult`](types::CompressionResult), the value handed back |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Tiers Name the Squeeze, Not the Fidelity
//!
//! `high` means high compression, so quality falls as the tier rises:
//! low = 85, medium = 60, high = 35. `original` skips encoding and returns
//! the upload untouched.
//!
//! ## Output Never Grows
//!
//! Quality only affects JPEG. PNG is re-encoded losslessly with tuned
//! deflate settings and GIF is re-quantized at a fixed speed, so every tier
//! produces the same bytes. When any re-encode is not smaller than the
//! upload (and nothing was resized), the upload itself is returned.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for every decode and encode.
//! No system libraries, so the binary is self-contained.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod metrics;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod types;

pub use pipeline::{CompressError, Compressor, process};
pub use types::CompressionResult;

#[cfg(test)]
pub(crate) mod test_helpers;
