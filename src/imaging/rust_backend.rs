//! Pure Rust codec, no system libraries.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG) | `image::load_from_memory_with_format`; JPEG must end in an EOI marker |
//! | Decode (GIF) | `image::codecs::gif::GifDecoder` → all frames |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter, up to [`MAX_PIXELS`] |
//! | Encode | [`Encoder`](super::encoders::Encoder) dispatch per format |

use super::backend::{CodecError, DecodedImage, Dimensions, ImageAsset, ImageCodec, Pixels};
use super::calculations::{MAX_PIXELS, exceeds_pixel_limit, scale_offset};
use super::encoders::{Encoder, EncoderSettings, FormatEncoder};
use super::params::{ImageKind, Quality};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, Frame, ImageReader};
use std::io::Cursor;

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Default)]
pub struct RustCodec {
    settings: EncoderSettings,
}

/// Output of [`RustCodec::encode_asset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub dimensions: Dimensions,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Decode and re-encode an asset at its own size.
    pub fn encode_asset(
        &self,
        asset: &ImageAsset<'_>,
        quality: Quality,
    ) -> Result<EncodedImage, CodecError> {
        let decoded = self.decode(asset)?;
        let bytes = self.encode(asset, &decoded, quality)?;
        Ok(EncodedImage {
            bytes,
            kind: asset.kind(),
            dimensions: decoded.dimensions(),
        })
    }
}

fn decode_gif(bytes: &[u8], canvas: Dimensions) -> Result<DecodedImage, CodecError> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| CodecError::Decode(format!("GIF: {e}")))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| CodecError::Decode(format!("GIF: {e}")))?;
    if frames.is_empty() {
        return Err(CodecError::Decode("GIF: no frames".into()));
    }
    Ok(DecodedImage::animated(frames, canvas))
}

/// The JPEG decoder fills a cut-off scan with grey instead of failing, so
/// completeness is checked up front. Entropy-coded data stuffs every `0xFF`,
/// so `FF DA` (start of scan) and `FF D9` (end of image) only occur as markers.
fn jpeg_is_complete(bytes: &[u8]) -> bool {
    bytes
        .windows(2)
        .rposition(|w| w == [0xFF, 0xDA])
        .is_some_and(|last_scan| bytes[last_scan..].windows(2).any(|w| w == [0xFF, 0xD9]))
}

fn resize_frame(frame: &Frame, from: Dimensions, to: Dimensions) -> Frame {
    let buffer = frame.buffer();
    let width = scale_offset(buffer.width(), from.width, to.width).max(1);
    let height = scale_offset(buffer.height(), from.height, to.height).max(1);
    let resized = image::imageops::resize(buffer, width, height, FilterType::Lanczos3);
    Frame::from_parts(
        resized,
        scale_offset(frame.left(), from.width, to.width),
        scale_offset(frame.top(), from.height, to.height),
        frame.delay(),
    )
}

impl ImageCodec for RustCodec {
    fn identify(&self, bytes: &[u8], kind: ImageKind) -> Result<Dimensions, CodecError> {
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), kind.image_format())
            .into_dimensions()
            .map_err(|e| CodecError::Decode(format!("Failed to read {kind} header: {e}")))?;
        if width == 0 || height == 0 {
            return Err(CodecError::Decode(format!(
                "{kind} header declares an empty {width}x{height} image"
            )));
        }
        Ok(Dimensions { width, height })
    }

    fn decode(&self, asset: &ImageAsset<'_>) -> Result<DecodedImage, CodecError> {
        match asset.kind() {
            ImageKind::Gif => decode_gif(asset.bytes(), asset.dimensions()),
            ImageKind::Jpeg if !jpeg_is_complete(asset.bytes()) => Err(CodecError::Decode(
                "Failed to decode JPEG: no end-of-image marker after the last scan (truncated)"
                    .into(),
            )),
            kind => image::load_from_memory_with_format(asset.bytes(), kind.image_format())
                .map(DecodedImage::still)
                .map_err(|e| CodecError::Decode(format!("Failed to decode {kind}: {e}"))),
        }
    }

    fn resize(&self, image: DecodedImage, target: Dimensions) -> Result<DecodedImage, CodecError> {
        if exceeds_pixel_limit(target) {
            return Err(CodecError::Encode(format!(
                "resize target {target} exceeds the {MAX_PIXELS} pixel limit"
            )));
        }
        let from = image.dimensions();
        let resized = match image.into_pixels() {
            Pixels::Still(img) => DecodedImage::still(img.resize_exact(
                target.width,
                target.height,
                FilterType::Lanczos3,
            )),
            Pixels::Animated(frames) => {
                let frames = frames
                    .iter()
                    .map(|frame| resize_frame(frame, from, target))
                    .collect();
                DecodedImage::animated(frames, target)
            }
        };
        Ok(resized.into_resized())
    }

    fn encode(
        &self,
        asset: &ImageAsset<'_>,
        image: &DecodedImage,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        Encoder::for_kind(asset.kind(), &self.settings).encode(asset, image, quality)
    }
}
