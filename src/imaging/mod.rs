//! Image codec adapter: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` (magic bytes) |
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image` JPEG/PNG/GIF decoders |
//! | **Resize** | Lanczos3 |
//! | **Encode** | per-format [`Encoder`] dispatch |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality tiers, resize specs, the supported format set
//! - **Backend**: [`ImageCodec`] trait + shared types
//! - **Encoders**: Per-format encoding rules
//! - **Rust backend**: [`RustCodec`], the production codec

pub mod backend;
mod calculations;
pub mod encoders;
mod params;
pub mod rust_backend;

pub use backend::{
    CodecError, DecodedImage, Dimensions, ImageAsset, ImageCodec, Pixels, Sniffed, sniff,
};
pub use calculations::{
    MAX_PIXELS, MAX_SCALE, calculate_fit_dimensions, calculate_resize_dimensions,
    calculate_scaled_dimensions, exceeds_pixel_limit,
};
pub use encoders::{Encoder, EncoderSettings, FormatEncoder, PngCompression, PngFilter};
pub use params::{
    CompressionLevel, ImageKind, ParseLevelError, Quality, QualitySetting, ResizeSpec,
};
pub use rust_backend::{EncodedImage, RustCodec};
