//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::ResizeSpec;

/// Largest accepted scale factor. Keeps a typo like `--scale 80` from
/// allocating a gigapixel canvas.
pub const MAX_SCALE: f64 = 8.0;

/// Largest resize target, in pixels. At four bytes per pixel this is a
/// 400 MB canvas before the filter's working buffers.
pub const MAX_PIXELS: u64 = 100_000_000;

/// Whether a resize target is too large to allocate.
pub fn exceeds_pixel_limit(target: Dimensions) -> bool {
    u64::from(target.width) * u64::from(target.height) > MAX_PIXELS
}

/// Compute the output dimensions for a resize request.
///
/// Rounds to the nearest pixel and never returns a zero-length side.
///
/// # Examples
/// ```
/// # use imgpress::imaging::{Dimensions, ResizeSpec, calculate_resize_dimensions};
/// let source = Dimensions { width: 1000, height: 500 };
/// let out = calculate_resize_dimensions(source, ResizeSpec::max_width(400));
/// assert_eq!((out.width, out.height), (400, 200));
/// ```
pub fn calculate_resize_dimensions(source: Dimensions, spec: ResizeSpec) -> Dimensions {
    match spec {
        ResizeSpec::Fit {
            max_width,
            max_height,
        } => calculate_fit_dimensions(source, max_width, max_height),
        ResizeSpec::Scale { factor } => calculate_scaled_dimensions(source, factor),
    }
}

/// Shrink `source` to fit inside the bounds, keeping its aspect ratio.
///
/// The tighter bound wins. Images already inside the bounds are returned
/// unchanged (no upscaling).
pub fn calculate_fit_dimensions(
    source: Dimensions,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Dimensions {
    let ratio_for = |bound: Option<u32>, side: u32| {
        bound.map_or(1.0, |b| b.max(1) as f64 / side.max(1) as f64)
    };
    let ratio = ratio_for(max_width, source.width)
        .min(ratio_for(max_height, source.height))
        .min(1.0);

    if ratio >= 1.0 {
        return source;
    }
    scale_by(source, ratio)
}

/// Multiply both sides by `factor`.
///
/// Non-finite or non-positive factors leave the image unchanged; factors
/// above [`MAX_SCALE`] are capped.
pub fn calculate_scaled_dimensions(source: Dimensions, factor: f64) -> Dimensions {
    if !factor.is_finite() || factor <= 0.0 {
        return source;
    }
    scale_by(source, factor.min(MAX_SCALE))
}

fn scale_by(source: Dimensions, ratio: f64) -> Dimensions {
    let side = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    Dimensions {
        width: side(source.width),
        height: side(source.height),
    }
}

/// Scale a frame offset from one canvas size to another.
pub(crate) fn scale_offset(offset: u32, from: u32, to: u32) -> u32 {
    if from == 0 {
        return 0;
    }
    (offset as f64 * to as f64 / from as f64).round() as u32
}
