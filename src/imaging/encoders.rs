//! Per-format encoding rules.
//!
//! | Format | Quality | Strategy |
//! |---|---|---|
//! | JPEG | honoured | baseline DCT re-encode at the given quality |
//! | PNG | advisory | lossless re-encode with tuned deflate level + row filter |
//! | GIF | ignored | full re-encode of every frame at a fixed quantizer speed |
//!
//! No format is allowed to grow. When the pixels were not resampled and the
//! re-encoded stream is no smaller than the upload, the upload's own bytes
//! are returned unchanged. For JPEG this happens when the upload was already
//! saved at a lower quality than the tier asks for.

use super::backend::{CodecError, DecodedImage, ImageAsset, Pixels};
use super::params::{ImageKind, Quality};
use image::codecs::gif::{GifEncoder as ImageGifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder as ImagePngEncoder};
use image::{DynamicImage, Frame};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Deflate effort for PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

/// Row filter for PNG output. `Adaptive` picks per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngFilter {
    None,
    Sub,
    Up,
    Avg,
    Paeth,
    #[default]
    Adaptive,
}

/// Quantizer speed bounds accepted by the GIF encoder.
pub const GIF_SPEED_RANGE: std::ops::RangeInclusive<i32> = 1..=30;

/// Tunables for the lossless encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub png_compression: PngCompression,
    pub png_filter: PngFilter,
    pub gif_speed: i32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            png_compression: PngCompression::Best,
            png_filter: PngFilter::Adaptive,
            gif_speed: 10,
        }
    }
}

/// Anything that can turn decoded pixels into a byte stream for one format.
pub trait FormatEncoder {
    fn kind(&self) -> ImageKind;

    fn encode(
        &self,
        source: &ImageAsset<'_>,
        image: &DecodedImage,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Tagged dispatch over the supported formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Jpeg(JpegEncoder),
    Png(PngEncoder),
    Gif(GifEncoder),
}

impl Encoder {
    pub fn for_kind(kind: ImageKind, settings: &EncoderSettings) -> Self {
        match kind {
            ImageKind::Jpeg => Self::Jpeg(JpegEncoder),
            ImageKind::Png => Self::Png(PngEncoder {
                compression: settings.png_compression,
                filter: settings.png_filter,
            }),
            ImageKind::Gif => Self::Gif(GifEncoder {
                speed: settings.gif_speed,
            }),
        }
    }
}

impl FormatEncoder for Encoder {
    fn kind(&self) -> ImageKind {
        match self {
            Self::Jpeg(e) => e.kind(),
            Self::Png(e) => e.kind(),
            Self::Gif(e) => e.kind(),
        }
    }

    fn encode(
        &self,
        source: &ImageAsset<'_>,
        image: &DecodedImage,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Jpeg(e) => e.encode(source, image, quality),
            Self::Png(e) => e.encode(source, image, quality),
            Self::Gif(e) => e.encode(source, image, quality),
        }
    }
}

/// Baseline JPEG at the requested quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder;

impl FormatEncoder for JpegEncoder {
    fn kind(&self) -> ImageKind {
        ImageKind::Jpeg
    }

    fn encode(
        &self,
        source: &ImageAsset<'_>,
        image: &DecodedImage,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let still = still_image(image);
        // JPEG carries neither alpha nor 16-bit samples.
        let pixels = if matches!(
            still.as_ref(),
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)
        ) {
            still
        } else {
            Cow::Owned(DynamicImage::ImageRgb8(still.to_rgb8()))
        };

        let mut out = Vec::new();
        // The baseline quantizer has no quality-0 table.
        let encoder = ImageJpegEncoder::new_with_quality(&mut out, quality.value().max(1));
        pixels
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode(format!("JPEG: {e}")))?;
        Ok(keep_smaller(source, image, out))
    }
}

/// Lossless PNG with tuned deflate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngEncoder {
    pub compression: PngCompression,
    pub filter: PngFilter,
}

impl PngEncoder {
    fn compression_type(&self) -> CompressionType {
        match self.compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }

    fn filter_type(&self) -> FilterType {
        match self.filter {
            PngFilter::None => FilterType::NoFilter,
            PngFilter::Sub => FilterType::Sub,
            PngFilter::Up => FilterType::Up,
            PngFilter::Avg => FilterType::Avg,
            PngFilter::Paeth => FilterType::Paeth,
            PngFilter::Adaptive => FilterType::Adaptive,
        }
    }
}

impl FormatEncoder for PngEncoder {
    fn kind(&self) -> ImageKind {
        ImageKind::Png
    }

    fn encode(
        &self,
        source: &ImageAsset<'_>,
        image: &DecodedImage,
        _quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        let encoder =
            ImagePngEncoder::new_with_quality(&mut out, self.compression_type(), self.filter_type());
        still_image(image)
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode(format!("PNG: {e}")))?;
        Ok(keep_smaller(source, image, out))
    }
}

/// GIF re-encode. Colours are requantized only where a frame exceeds the
/// 256-entry palette, and always at the same speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifEncoder {
    pub speed: i32,
}

impl FormatEncoder for GifEncoder {
    fn kind(&self) -> ImageKind {
        ImageKind::Gif
    }

    fn encode(
        &self,
        source: &ImageAsset<'_>,
        image: &DecodedImage,
        _quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let speed = self
            .speed
            .clamp(*GIF_SPEED_RANGE.start(), *GIF_SPEED_RANGE.end());
        let frames: Vec<Frame> = match image.pixels() {
            Pixels::Animated(frames) => frames.clone(),
            Pixels::Still(img) => vec![Frame::new(img.to_rgba8())],
        };

        let mut out = Vec::new();
        {
            let mut encoder = ImageGifEncoder::new_with_speed(&mut out, speed);
            if frames.len() > 1 {
                encoder
                    .set_repeat(Repeat::Infinite)
                    .map_err(|e| CodecError::Encode(format!("GIF: {e}")))?;
            }
            encoder
                .encode_frames(frames)
                .map_err(|e| CodecError::Encode(format!("GIF: {e}")))?;
        }
        Ok(keep_smaller(source, image, out))
    }
}

/// View decoded pixels as a single still image (first frame of an animation).
fn still_image(image: &DecodedImage) -> Cow<'_, DynamicImage> {
    match image.pixels() {
        Pixels::Still(img) => Cow::Borrowed(img),
        Pixels::Animated(frames) => {
            let first = frames
                .first()
                .map(|f| f.buffer().clone())
                .unwrap_or_default();
            Cow::Owned(DynamicImage::ImageRgba8(first))
        }
    }
}

/// Return the upload's bytes when re-encoding untouched pixels did not help.
fn keep_smaller(source: &ImageAsset<'_>, image: &DecodedImage, encoded: Vec<u8>) -> Vec<u8> {
    if !image.is_resized() && encoded.len() >= source.len() {
        log::debug!(
            "{} re-encode not smaller ({} >= {} bytes), keeping source stream",
            source.kind(),
            encoded.len(),
            source.len()
        );
        return source.bytes().to_vec();
    }
    encoded
}
