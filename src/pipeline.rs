//! The compression pipeline.
//!
//! One request takes raw upload bytes, a filename, a quality setting and an
//! optional resize, and returns a [`CompressionResult`] or a
//! [`CompressError`]. Every request is independent; nothing is kept between
//! calls unless the caller asks for it ([`Compressor::with_cache`],
//! [`Compressor::process_with_last`]).
//!
//! ## Steps
//!
//! ```text
//! bytes ──▶ detect format ──▶ identify ──▶ decode ──▶ resize? ──▶ encode ──▶ result
//!                 │                            ▲
//!                 └── original tier ───────────┴──── (source bytes, no decode)
//! ```
//!
//! Format detection trusts the header over the filename:
//!
//! | Header | Extension | Outcome |
//! |---|---|---|
//! | JPEG/PNG/GIF | anything | that format (warn if the extension disagrees) |
//! | other image (BMP, WebP, ...) | anything | `UnsupportedFormat` |
//! | unrecognised | jpg/png/gif | `DecodeError` (corrupt file) |
//! | unrecognised | other or none | `UnsupportedFormat` |
//!
//! ## Stages
//!
//! Each request walks `Idle → Decoding → (Resizing) → Encoding → Done`, or
//! ends in `Failed` from any step. Stages never go backwards. Transitions
//! are logged at debug level and, when a sender is attached with
//! [`Compressor::with_progress`], published as [`StageEvent`]s.

use crate::cache::{CacheKey, CacheStats, LastResult, ResultCache};
use crate::imaging::{
    CodecError, Dimensions, ImageAsset, ImageCodec, ImageKind, QualitySetting, ResizeSpec,
    RustCodec, Sniffed, calculate_resize_dimensions, sniff,
};
use crate::naming;
use crate::types::CompressionResult;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;

/// Why a request failed. Flat on purpose: each variant maps to one message
/// the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressError {
    #[error("No image data received")]
    EmptyInput,
    #[error("Unsupported format: {0} (expected JPEG, PNG or GIF)")]
    UnsupportedFormat(String),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Could not encode image: {0}")]
    Encode(String),
}

impl CompressError {
    /// Stable identifier for callers that branch on the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EmptyInput",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::Decode(_) => "DecodeError",
            Self::Encode(_) => "EncodeError",
        }
    }
}

impl From<CodecError> for CompressError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnsupportedFormat(name) => Self::UnsupportedFormat(name),
            CodecError::Decode(msg) => Self::Decode(msg),
            CodecError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// Where a request is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Decoding,
    Resizing,
    Encoding,
    Done,
    Failed(CompressError),
}

impl Stage {
    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Decoding => 1,
            Self::Resizing => 2,
            Self::Encoding => 3,
            Self::Done | Self::Failed(_) => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Decoding => f.write_str("decoding"),
            Self::Resizing => f.write_str("resizing"),
            Self::Encoding => f.write_str("encoding"),
            Self::Done => f.write_str("done"),
            Self::Failed(err) => write!(f, "failed ({})", err.code()),
        }
    }
}

/// A stage transition, as published to a progress listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    pub filename: String,
    pub stage: Stage,
}

/// Per-request stage tracker.
struct Progress<'a> {
    filename: &'a str,
    stage: Stage,
    sender: Option<&'a Sender<StageEvent>>,
}

impl<'a> Progress<'a> {
    fn new(filename: &'a str, sender: Option<&'a Sender<StageEvent>>) -> Self {
        Self {
            filename,
            stage: Stage::Idle,
            sender,
        }
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(
            next.rank() > self.stage.rank(),
            "stage went backwards: {} -> {}",
            self.stage,
            next
        );
        log::debug!("{}: {} -> {}", self.filename, self.stage, next);
        if let Some(sender) = self.sender {
            // A listener that hung up is not the request's problem.
            let _ = sender.send(StageEvent {
                filename: self.filename.to_string(),
                stage: next.clone(),
            });
        }
        self.stage = next;
    }
}

/// Runs requests against an [`ImageCodec`].
///
/// Cheap to build and `Sync` when the codec is, so one value can serve many
/// threads. The only shared state is the optional result cache.
pub struct Compressor<C: ImageCodec = RustCodec> {
    codec: C,
    cache: Option<ResultCache>,
    progress: Option<Sender<StageEvent>>,
}

impl Compressor<RustCodec> {
    pub fn new() -> Self {
        Self::with_codec(RustCodec::new())
    }
}

impl Default for Compressor<RustCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ImageCodec> Compressor<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            cache: None,
            progress: None,
        }
    }

    /// Memoize up to `capacity` results.
    pub fn with_cache(mut self, capacity: NonZeroUsize) -> Self {
        self.cache = Some(ResultCache::new(capacity));
        self
    }

    /// Publish stage transitions to `sender`.
    pub fn with_progress(mut self, sender: Sender<StageEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Hit/miss counts, when a cache is attached.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResultCache::stats)
    }

    /// Compress one upload.
    pub fn process(
        &self,
        bytes: &[u8],
        filename: &str,
        setting: QualitySetting,
        resize: Option<ResizeSpec>,
    ) -> Result<CompressionResult, CompressError> {
        match &self.cache {
            Some(cache) if !bytes.is_empty() => {
                let key = CacheKey::new(bytes, filename, setting, resize);
                cache.get_or_compute(key, || self.run(bytes, filename, setting, resize))
            }
            _ => self.run(bytes, filename, setting, resize),
        }
    }

    /// Like [`process`](Self::process), but reuse `last` when the request
    /// is identical to the previous one. Any other request replaces it; a
    /// failed request leaves it empty.
    pub fn process_with_last(
        &self,
        last: &mut LastResult,
        bytes: &[u8],
        filename: &str,
        setting: QualitySetting,
        resize: Option<ResizeSpec>,
    ) -> Result<CompressionResult, CompressError> {
        if bytes.is_empty() {
            last.clear();
            return self.run(bytes, filename, setting, resize);
        }

        let key = CacheKey::new(bytes, filename, setting, resize);
        if let Some(result) = last.get(&key) {
            log::debug!("{filename}: parameters unchanged, reusing last result");
            return Ok(result.clone());
        }
        last.clear();

        let result = match &self.cache {
            Some(cache) => {
                cache.get_or_compute(key.clone(), || self.run(bytes, filename, setting, resize))?
            }
            None => self.run(bytes, filename, setting, resize)?,
        };
        last.store(key, result.clone());
        Ok(result)
    }

    fn run(
        &self,
        bytes: &[u8],
        filename: &str,
        setting: QualitySetting,
        resize: Option<ResizeSpec>,
    ) -> Result<CompressionResult, CompressError> {
        let started = Instant::now();
        let mut progress = Progress::new(filename, self.progress.as_ref());

        let outcome = self.execute(&mut progress, bytes, filename, setting, resize);
        match &outcome {
            Ok(result) => {
                progress.enter(Stage::Done);
                log::info!(
                    "{filename}: {} {} -> {} bytes ({}) at {setting} in {:.0?}",
                    result.format,
                    result.original_size,
                    result.compressed_size,
                    result.report().ratio,
                    started.elapsed()
                );
            }
            Err(err) => {
                progress.enter(Stage::Failed(err.clone()));
                log::debug!("{filename}: {err}");
            }
        }
        outcome
    }

    fn execute(
        &self,
        progress: &mut Progress<'_>,
        bytes: &[u8],
        filename: &str,
        setting: QualitySetting,
        resize: Option<ResizeSpec>,
    ) -> Result<CompressionResult, CompressError> {
        if bytes.is_empty() {
            return Err(CompressError::EmptyInput);
        }

        progress.enter(Stage::Decoding);
        let kind = detect_kind(bytes, filename)?;
        let dimensions = self.codec.identify(bytes, kind)?;
        let asset = ImageAsset::new(bytes, kind, dimensions);

        let Some(quality) = setting.resolve() else {
            if let Some(spec) = resize {
                log::debug!("{filename}: original tier, ignoring {spec}");
            }
            return Ok(build_result(&asset, bytes.to_vec(), dimensions, None, filename));
        };

        let mut image = self.codec.decode(&asset)?;
        if let Some(spec) = resize {
            let target = calculate_resize_dimensions(dimensions, spec);
            if target != image.dimensions() {
                progress.enter(Stage::Resizing);
                image = self.codec.resize(image, target)?;
            }
        }

        progress.enter(Stage::Encoding);
        let encoded = self.codec.encode(&asset, &image, quality)?;
        Ok(build_result(
            &asset,
            encoded,
            image.dimensions(),
            Some(quality.value()),
            filename,
        ))
    }
}

/// Compress one upload with a default [`Compressor`].
pub fn process(
    bytes: &[u8],
    filename: &str,
    setting: QualitySetting,
    resize: Option<ResizeSpec>,
) -> Result<CompressionResult, CompressError> {
    Compressor::new().process(bytes, filename, setting, resize)
}

/// Decide the format from the header, using the filename only to tell a
/// corrupt upload apart from an unsupported one.
pub fn detect_kind(bytes: &[u8], filename: &str) -> Result<ImageKind, CompressError> {
    let claimed = naming::extension_kind(filename);
    match sniff(bytes) {
        Sniffed::Supported(kind) => {
            if let Some(claimed) = claimed
                && claimed != kind
            {
                log::warn!("{filename}: extension says {claimed} but contents are {kind}");
            }
            Ok(kind)
        }
        Sniffed::Other(name) => Err(CompressError::UnsupportedFormat(name)),
        Sniffed::Unknown => match claimed {
            Some(kind) => Err(CompressError::Decode(format!("not a valid {kind} file"))),
            None => Err(CompressError::UnsupportedFormat(
                naming::extension(filename)
                    .map(str::to_ascii_uppercase)
                    .unwrap_or_else(|| "unknown".to_string()),
            )),
        },
    }
}

fn build_result(
    asset: &ImageAsset<'_>,
    bytes: Vec<u8>,
    dimensions: Dimensions,
    quality: Option<u8>,
    filename: &str,
) -> CompressionResult {
    let format = asset.kind();
    CompressionResult {
        compressed_size: bytes.len(),
        bytes,
        format,
        dimensions,
        original_size: asset.len(),
        quality,
        filename: naming::output_filename(filename, format),
        mime_type: format.mime_type().to_string(),
    }
}
