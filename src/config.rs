//! CLI configuration.
//!
//! Handles loading, validating, and merging `imgpress.toml`. Stock defaults
//! are the base layer; the user file only needs the keys it wants to change.
//! The library pipeline never reads configuration itself; the binary turns a
//! [`Config`] into a [`RustCodec`] and request parameters.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! level = "medium"          # low | medium | high | original
//!
//! [preview]
//! max_width = 400           # Width bound used by --preview
//!
//! [png]
//! compression = "best"      # fast | default | best
//! filter = "adaptive"       # none | sub | up | avg | paeth | adaptive
//!
//! [gif]
//! speed = 10                # Palette quantizer speed, 1 (best) - 30 (fastest)
//!
//! [cache]
//! capacity = 16             # Results memoized by `imgpress tiers`
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::encoders::GIF_SPEED_RANGE;
use crate::imaging::{CompressionLevel, EncoderSettings, PngCompression, PngFilter, RustCodec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "imgpress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `imgpress.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default quality tier.
    pub compression: CompressionConfig,
    /// `--preview` resize bound.
    pub preview: PreviewConfig,
    /// Lossless PNG encoder tuning.
    pub png: PngConfig,
    /// GIF encoder tuning.
    pub gif: GifConfig,
    /// Result memo size.
    pub cache: CacheConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.max_width == 0 {
            return Err(ConfigError::Validation(
                "preview.max_width must be greater than 0".into(),
            ));
        }
        if !GIF_SPEED_RANGE.contains(&self.gif.speed) {
            return Err(ConfigError::Validation(format!(
                "gif.speed must be {}-{}",
                GIF_SPEED_RANGE.start(),
                GIF_SPEED_RANGE.end()
            )));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation(
                "cache.capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            png_compression: self.png.compression,
            png_filter: self.png.filter,
            gif_speed: self.gif.speed,
        }
    }

    pub fn codec(&self) -> RustCodec {
        RustCodec::with_settings(self.encoder_settings())
    }

    /// Cache size as a non-zero count. Falls back to 1 for configs that
    /// skipped [`validate`](Self::validate).
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Tier used when neither `--level` nor `--quality` is given.
    pub level: CompressionLevel,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Maximum preview width in pixels.
    pub max_width: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_width: 400 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PngConfig {
    pub compression: PngCompression,
    pub filter: PngFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GifConfig {
    /// NeuQuant sampling speed. Lower is slower and more accurate.
    pub speed: i32,
}

impl Default for GifConfig {
    fn default() -> Self {
        Self { speed: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// A missing file yields the stock defaults. Otherwise user values are
/// merged on top of the defaults, unknown keys are rejected, and the result
/// is validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("loaded config from {}", path.display());
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `imgpress.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgpress Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# imgpress reads ./imgpress.toml unless --config points elsewhere.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# Tier used when neither --level nor --quality is given.
#   low      = quality 85, light compression
#   medium   = quality 60
#   high     = quality 35, strongest compression
#   original = no re-encoding, the upload is returned as-is
level = "medium"

# ---------------------------------------------------------------------------
# Preview
# ---------------------------------------------------------------------------
[preview]
# Width bound applied by --preview. Aspect ratio is kept; never upscales.
max_width = 400

# ---------------------------------------------------------------------------
# PNG (lossless; quality settings do not change PNG pixels)
# ---------------------------------------------------------------------------
[png]
# Deflate effort: "fast", "default" or "best".
compression = "best"
# Row filter: "none", "sub", "up", "avg", "paeth" or "adaptive".
filter = "adaptive"

# ---------------------------------------------------------------------------
# GIF (palette formats ignore quality)
# ---------------------------------------------------------------------------
[gif]
# Palette quantizer speed, 1-30. Lower is slower and more accurate.
speed = 10

# ---------------------------------------------------------------------------
# Cache
# ---------------------------------------------------------------------------
[cache]
# Number of results `imgpress tiers` keeps in memory.
capacity = 16
"##
}
