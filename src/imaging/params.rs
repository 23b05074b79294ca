//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`pipeline`](crate::pipeline) (which decides what a
//! request needs) and the [`backend`](super::backend) (which does the actual
//! pixel work).
//!
//! ## Types
//!
//! - [`ImageKind`]: The closed set of formats the codec adapter accepts.
//! - [`Quality`]: Numeric encoding quality (0–100). Clamped on construction.
//! - [`CompressionLevel`]: Named tier (Low/Medium/High/Original) mapped to a fixed quality.
//! - [`QualitySetting`]: Either a tier or a raw [`Quality`].
//! - [`ResizeSpec`]: Fit-within bounds or an explicit scale factor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Image formats the codec adapter can re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Map a filename extension (without the dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Map a format sniffed by the `image` crate to a supported kind.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    /// `image/<format>`; JPEG uses `jpeg`, never `jpg`.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
        };
        f.write_str(name)
    }
}

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Same as the Medium tier.
impl Default for Quality {
    fn default() -> Self {
        Self(60)
    }
}

/// Named compression tier.
///
/// The name describes how hard the image is squeezed, so numeric quality
/// falls as the tier rises: Low = 85, Medium = 60, High = 35. `Original`
/// bypasses encoding entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    Medium,
    High,
    Original,
}

impl CompressionLevel {
    /// The three encoding tiers, weakest first.
    pub const ENCODING: [CompressionLevel; 3] = [Self::Low, Self::Medium, Self::High];

    /// Fixed tier-to-quality table. `None` for [`CompressionLevel::Original`].
    pub fn quality(self) -> Option<Quality> {
        match self {
            Self::Low => Some(Quality(85)),
            Self::Medium => Some(Quality(60)),
            Self::High => Some(Quality(35)),
            Self::Original => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Original => "original",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown compression level '{0}' (expected low, medium, high or original)")]
pub struct ParseLevelError(String);

impl FromStr for CompressionLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "original" | "none" => Ok(Self::Original),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

/// A user's quality choice: a named tier or a raw number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualitySetting {
    Level(CompressionLevel),
    Value(Quality),
}

impl QualitySetting {
    /// Numeric quality to encode with, or `None` when encoding is bypassed.
    pub fn resolve(self) -> Option<Quality> {
        match self {
            Self::Level(level) => level.quality(),
            Self::Value(quality) => Some(quality),
        }
    }

    pub fn is_original(self) -> bool {
        self.resolve().is_none()
    }
}

impl From<CompressionLevel> for QualitySetting {
    fn from(level: CompressionLevel) -> Self {
        Self::Level(level)
    }
}

impl From<Quality> for QualitySetting {
    fn from(quality: Quality) -> Self {
        Self::Value(quality)
    }
}

impl fmt::Display for QualitySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => write!(f, "{level}"),
            Self::Value(q) => write!(f, "q{}", q.value()),
        }
    }
}

/// How to resize before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeSpec {
    /// Fit inside the given bounds, preserving aspect ratio. Never upscales.
    /// A missing bound leaves that axis unconstrained.
    Fit {
        max_width: Option<u32>,
        max_height: Option<u32>,
    },
    /// Multiply both sides by `factor`. Values above 1 upscale.
    Scale { factor: f64 },
}

impl ResizeSpec {
    pub fn max_width(width: u32) -> Self {
        Self::Fit {
            max_width: Some(width),
            max_height: None,
        }
    }

    pub fn fit(max_width: u32, max_height: u32) -> Self {
        Self::Fit {
            max_width: Some(max_width),
            max_height: Some(max_height),
        }
    }

    pub fn scale(factor: f64) -> Self {
        Self::Scale { factor }
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fit {
                max_width,
                max_height,
            } => {
                let axis = |v: &Option<u32>| v.map_or_else(|| "*".to_string(), |n| n.to_string());
                write!(f, "fit {}x{}", axis(max_width), axis(max_height))
            }
            Self::Scale { factor } => write!(f, "scale {factor}"),
        }
    }
}
