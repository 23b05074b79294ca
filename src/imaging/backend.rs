//! Codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the four operations every codec must
//! support: identify, decode, resize, and encode. The pipeline only talks to
//! this trait, so its orchestration can be tested against a recording mock.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec): pure Rust, statically
//! linked, no system libraries.

use super::params::{ImageKind, Quality};
use image::{DynamicImage, Frame, GenericImageView};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the magic bytes at the start of an upload say it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed {
    /// One of the formats we re-encode.
    Supported(ImageKind),
    /// A recognised image format we do not handle (BMP, WebP, TIFF, ...).
    Other(String),
    /// No known signature.
    Unknown,
}

/// Identify the format of `bytes` from its header.
pub fn sniff(bytes: &[u8]) -> Sniffed {
    match image::guess_format(bytes) {
        Ok(format) => match ImageKind::from_image_format(format) {
            Some(kind) => Sniffed::Supported(kind),
            None => Sniffed::Other(format!("{format:?}").to_uppercase()),
        },
        Err(_) => Sniffed::Unknown,
    }
}

/// One uploaded image: raw bytes plus what we learned from its header.
///
/// Borrowed for the duration of a single request and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct ImageAsset<'a> {
    bytes: &'a [u8],
    kind: ImageKind,
    dimensions: Dimensions,
}

impl<'a> ImageAsset<'a> {
    pub fn new(bytes: &'a [u8], kind: ImageKind, dimensions: Dimensions) -> Self {
        Self {
            bytes,
            kind,
            dimensions,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decoded pixels, ready to resize or encode.
#[derive(Clone)]
pub enum Pixels {
    Still(DynamicImage),
    /// Every frame of an animated GIF, composited to full canvas size.
    Animated(Vec<Frame>),
}

// `image::Frame` has no `Debug`, so frames are summarised by count.
impl fmt::Debug for Pixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pixels::Still(img) => f
                .debug_struct("Still")
                .field("color", &img.color())
                .field("width", &img.width())
                .field("height", &img.height())
                .finish(),
            Pixels::Animated(frames) => f
                .debug_struct("Animated")
                .field("frames", &frames.len())
                .finish(),
        }
    }
}

/// Decoded image plus bookkeeping the encoders need.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: Pixels,
    dimensions: Dimensions,
    resized: bool,
}

impl DecodedImage {
    pub fn still(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pixels: Pixels::Still(image),
            dimensions: Dimensions { width, height },
            resized: false,
        }
    }

    pub fn animated(frames: Vec<Frame>, canvas: Dimensions) -> Self {
        Self {
            pixels: Pixels::Animated(frames),
            dimensions: canvas,
            resized: false,
        }
    }

    /// Mark the pixels as resampled. Resampled images can no longer fall
    /// back to the source bytes.
    pub fn into_resized(mut self) -> Self {
        self.resized = true;
        self
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn into_pixels(self) -> Pixels {
        self.pixels
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn is_resized(&self) -> bool {
        self.resized
    }
}

/// Trait for image codecs.
///
/// Every codec implements all four operations so the pipeline stays
/// codec-agnostic.
pub trait ImageCodec: Sync {
    /// Read dimensions from the header without a full decode.
    fn identify(&self, bytes: &[u8], kind: ImageKind) -> Result<Dimensions, CodecError>;

    /// Fully decode an asset.
    fn decode(&self, asset: &ImageAsset<'_>) -> Result<DecodedImage, CodecError>;

    /// Resample to exactly `target` with a high-quality filter.
    fn resize(&self, image: DecodedImage, target: Dimensions) -> Result<DecodedImage, CodecError>;

    /// Encode `image` in the asset's format.
    ///
    /// `quality` is honoured by lossy formats only.
    fn encode(
        &self,
        asset: &ImageAsset<'_>,
        image: &DecodedImage,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;
}
