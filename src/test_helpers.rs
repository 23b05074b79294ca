//! Shared test utilities for the imgpress test suite.
//!
//! Builds small synthetic images in every format the pipeline touches, so
//! tests never depend on fixture files.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let jpeg = jpeg_bytes(200, 100, 95);
//! let result = process(&jpeg, "photo.jpg", CompressionLevel::High.into(), None).unwrap();
//! assert!(result.compressed_size < jpeg.len());
//! ```

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, Frame, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

// =========================================================================
// Pixel sources
// =========================================================================

/// Textured RGB gradient. The texture gives the JPEG quantizer something to
/// throw away, so size differences between qualities are pronounced.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let texture = ((x.wrapping_mul(7) ^ y.wrapping_mul(13)) % 32) as u8;
        Rgb([
            ((x * 255) / width.max(1)) as u8 ^ texture,
            ((y * 255) / height.max(1)) as u8,
            128u8.wrapping_add(texture),
        ])
    })
}

/// Same as [`gradient_rgb`] with a horizontal alpha ramp.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    let rgb = gradient_rgb(width, height);
    RgbaImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Rgba([r, g, b, (255 - (x * 200) / width.max(1)) as u8])
    })
}

// =========================================================================
// Encoded uploads
// =========================================================================

/// A baseline JPEG at the given quality.
pub fn jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A deliberately poorly compressed PNG (fast deflate, no filtering), so the
/// optimizer always has room to win.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgba(width, height);
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// A GIF with `frames` frames, each using at most 16 colours.
pub fn gif_bytes(width: u32, height: u32, frames: u32) -> Vec<u8> {
    let frames: Vec<Frame> = (0..frames.max(1))
        .map(|n| {
            Frame::new(RgbaImage::from_fn(width, height, |x, y| {
                let band = (((x / 4) + (y / 4) + n) % 16) as u8;
                Rgba([band * 16, 255 - band * 16, (n * 60) as u8, 255])
            }))
        })
        .collect();

    let animated = frames.len() > 1;
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, 10);
        if animated {
            encoder.set_repeat(Repeat::Infinite).unwrap();
        }
        encoder.encode_frames(frames).unwrap();
    }
    out
}

/// An uncompressed 24-bit BMP, written by hand since the BMP codec is not
/// compiled in.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row = (width * 3).div_ceil(4) * 4;
    let pixel_bytes = row * height;
    let file_size = 54 + pixel_bytes;

    let mut out = Vec::with_capacity(file_size as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&pixel_bytes.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.resize(file_size as usize, 0x80);
    out
}

/// Decode any supported upload, panicking with the format on failure.
pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes)
        .unwrap_or_else(|e| panic!("failed to decode {} bytes: {e}", bytes.len()))
}
