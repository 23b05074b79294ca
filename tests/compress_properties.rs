//! End-to-end behaviour of the compression pipeline against the real codec.

mod common;

use imgpress::imaging::{CompressionLevel, ImageKind, Quality, ResizeSpec};
use imgpress::metrics::SizeMetrics;
use imgpress::{CompressError, Compressor, process};
use std::num::NonZeroUsize;
use std::thread;

fn tier(level: CompressionLevel, bytes: &[u8], name: &str) -> imgpress::CompressionResult {
    process(bytes, name, level.into(), None)
        .unwrap_or_else(|e| panic!("{level} on {name} failed: {e}"))
}

// =========================================================================
// Size
// =========================================================================

#[test]
fn jpeg_tiers_shrink_monotonically() {
    let source = common::jpeg(320, 240, 100);
    let low = tier(CompressionLevel::Low, &source, "photo.jpg");
    let medium = tier(CompressionLevel::Medium, &source, "photo.jpg");
    let high = tier(CompressionLevel::High, &source, "photo.jpg");

    assert!(low.compressed_size <= source.len());
    assert!(
        high.compressed_size <= medium.compressed_size
            && medium.compressed_size <= low.compressed_size,
        "high {} medium {} low {}",
        high.compressed_size,
        medium.compressed_size,
        low.compressed_size
    );
    assert_eq!(low.quality, Some(85));
    assert_eq!(medium.quality, Some(60));
    assert_eq!(high.quality, Some(35));
}

#[test]
fn low_quality_jpeg_never_grows_at_any_tier() {
    let source = common::jpeg(320, 240, 30);
    for level in CompressionLevel::ENCODING {
        let result = tier(level, &source, "photo.jpg");
        assert!(
            result.compressed_size <= source.len(),
            "{level}: {} > {}",
            result.compressed_size,
            source.len()
        );
        assert_eq!(result.compressed_size, result.bytes.len());
    }
    let low = tier(CompressionLevel::Low, &source, "photo.jpg");
    assert_eq!(low.bytes, source);
    assert_eq!(low.report().ratio, "0.00%");
}

#[test]
fn png_never_grows_and_ignores_tier() {
    let source = common::png(200, 150);
    let results: Vec<_> = CompressionLevel::ENCODING
        .iter()
        .map(|&level| tier(level, &source, "shot.png"))
        .collect();

    for result in &results {
        assert_eq!(result.format, ImageKind::Png);
        assert!(result.compressed_size <= source.len());
    }
    assert!(results.windows(2).all(|w| w[0].bytes == w[1].bytes));
    assert_eq!(common::dimensions(&results[0].bytes), (200, 150));
}

#[test]
fn already_optimal_png_is_returned_unchanged() {
    let first = tier(CompressionLevel::Medium, &common::png(120, 90), "a.png");
    let second = tier(CompressionLevel::Medium, &first.bytes, "a.png");
    assert_eq!(second.bytes, first.bytes);
    assert_eq!(second.report().ratio, "0.00%");
}

#[test]
fn ratio_of_half() {
    assert_eq!(SizeMetrics::new(1024, 512).report().ratio, "50.00%");
}

// =========================================================================
// Determinism
// =========================================================================

#[test]
fn identical_requests_give_identical_bytes() {
    let uploads = [
        (common::jpeg(160, 120, 95), "a.jpg"),
        (common::png(96, 64), "b.png"),
        (common::gif(48, 32, 3), "c.gif"),
    ];
    for (bytes, name) in &uploads {
        let resize = Some(ResizeSpec::max_width(40));
        let a = process(bytes, name, CompressionLevel::High.into(), resize).unwrap();
        let b = process(bytes, name, CompressionLevel::High.into(), resize).unwrap();
        assert_eq!(a.bytes, b.bytes, "{name} not deterministic");
    }
}

#[test]
fn gif_tiers_are_byte_identical() {
    let source = common::gif(64, 48, 4);
    let low = tier(CompressionLevel::Low, &source, "anim.gif");
    let high = tier(CompressionLevel::High, &source, "anim.gif");
    let raw = process(&source, "anim.gif", Quality::new(5).into(), None).unwrap();

    assert_eq!(low.bytes, high.bytes);
    assert_eq!(low.bytes, raw.bytes);
    assert_eq!(low.mime_type, "image/gif");
    assert!(low.compressed_size <= source.len());
}

#[test]
fn shared_compressor_is_consistent_across_threads() {
    let source = common::jpeg(200, 100, 100);
    let compressor = Compressor::new().with_cache(NonZeroUsize::new(4).unwrap());
    let expected = compressor
        .process(&source, "t.jpg", CompressionLevel::Medium.into(), None)
        .unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let r = compressor
                    .process(&source, "t.jpg", CompressionLevel::Medium.into(), None)
                    .unwrap();
                assert_eq!(r.bytes, expected.bytes);
            });
        }
    });
    assert_eq!(compressor.cache_stats().map(|s| s.misses), Some(1));
}

// =========================================================================
// Resize
// =========================================================================

#[test]
fn fit_to_width_keeps_aspect() {
    let source = common::jpeg(1000, 500, 90);
    let result = process(
        &source,
        "wide.jpg",
        CompressionLevel::Medium.into(),
        Some(ResizeSpec::max_width(400)),
    )
    .unwrap();
    assert_eq!((result.dimensions.width, result.dimensions.height), (400, 200));
    assert_eq!(common::dimensions(&result.bytes), (400, 200));
}

#[test]
fn fit_never_upscales() {
    let source = common::png(120, 80);
    let result = process(
        &source,
        "small.png",
        CompressionLevel::Low.into(),
        Some(ResizeSpec::fit(1000, 1000)),
    )
    .unwrap();
    assert_eq!(common::dimensions(&result.bytes), (120, 80));
}

#[test]
fn scale_resizes_png_exactly() {
    let source = common::png(101, 51);
    let result = process(
        &source,
        "odd.png",
        CompressionLevel::Low.into(),
        Some(ResizeSpec::scale(0.5)),
    )
    .unwrap();
    // 50.5 and 25.5 round half away from zero.
    assert_eq!(common::dimensions(&result.bytes), (51, 26));
}

#[test]
fn animated_gif_resize_keeps_every_frame() {
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;

    let source = common::gif(60, 40, 3);
    let result = process(
        &source,
        "anim.gif",
        CompressionLevel::Medium.into(),
        Some(ResizeSpec::max_width(30)),
    )
    .unwrap();

    let frames = GifDecoder::new(std::io::Cursor::new(&result.bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].buffer().dimensions(), (30, 20));
}

// =========================================================================
// Original tier
// =========================================================================

#[test]
fn original_tier_returns_input_bytes() {
    let source = common::jpeg(80, 60, 70);
    let result = process(
        &source,
        "keep.jpg",
        CompressionLevel::Original.into(),
        Some(ResizeSpec::max_width(10)),
    )
    .unwrap();
    assert_eq!(result.bytes, source);
    assert_eq!(result.report().ratio, "0.00%");
    assert_eq!(result.filename, "compressed_keep.jpg");
    assert_eq!(result.quality, None);
}

// =========================================================================
// Errors
// =========================================================================

#[test]
fn empty_input_is_rejected() {
    let err = process(&[], "a.jpg", CompressionLevel::Low.into(), None).unwrap_err();
    assert_eq!(err, CompressError::EmptyInput);
}

#[test]
fn bmp_is_unsupported() {
    for name in ["pic.bmp", "pic.jpg", ""] {
        let err = process(&common::bmp(8, 8), name, CompressionLevel::Low.into(), None).unwrap_err();
        assert_eq!(err.code(), "UnsupportedFormat", "uploaded as {name:?}");
    }
}

#[test]
fn truncated_jpeg_is_a_decode_error() {
    let source = common::jpeg(64, 64, 90);
    let err = process(&source[..100], "cut.jpg", CompressionLevel::Low.into(), None).unwrap_err();
    assert_eq!(err.code(), "DecodeError");
}

#[test]
fn jpeg_cut_mid_scan_is_not_recovered() {
    let source = common::jpeg(200, 150, 90);
    for cut in [source.len() / 2, source.len() - 10] {
        let err = process(&source[..cut], "cut.jpg", CompressionLevel::Low.into(), None)
            .unwrap_err();
        assert_eq!(err.code(), "DecodeError", "cut at {cut} of {}", source.len());
    }
}

#[test]
fn oversized_scale_is_an_encode_error() {
    // 2000x1000 scaled by 8 is 128 megapixels.
    let source = common::png(2000, 1000);
    let err = process(
        &source,
        "big.png",
        CompressionLevel::Low.into(),
        Some(ResizeSpec::scale(8.0)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "EncodeError");
}

#[test]
fn text_file_is_unsupported() {
    let err = process(b"hello", "notes.txt", CompressionLevel::Low.into(), None).unwrap_err();
    assert!(matches!(err, CompressError::UnsupportedFormat(_)));
}

// =========================================================================
// Naming
// =========================================================================

#[test]
fn mislabelled_upload_keeps_name_and_reports_real_type() {
    let source = common::jpeg(40, 40, 95);
    let result = tier(CompressionLevel::Medium, &source, "really-a-jpeg.png");
    assert_eq!(result.format, ImageKind::Jpeg);
    assert_eq!(result.mime_type, "image/jpeg");
    assert_eq!(result.filename, "compressed_really-a-jpeg.png");
}

#[test]
fn nameless_upload_gets_format_extension() {
    let result = tier(CompressionLevel::Low, &common::png(16, 16), "");
    assert_eq!(result.filename, "compressed.png");
}
