//! Result memoization.
//!
//! Encoding is the expensive part of a request. A front end that lets the
//! user flip between tiers, or re-renders while nothing changed, would
//! otherwise re-encode the same image over and over. This module lets the
//! [`Compressor`](crate::pipeline::Compressor) skip that work.
//!
//! # Design
//!
//! Two independent pieces of caller-owned state, never globals:
//!
//! - [`ResultCache`]: a bounded LRU memo shared by every call on one
//!   `Compressor`. Safe to use from several threads.
//! - [`LastResult`]: a single slot holding the most recent parameters and
//!   result, owned by whoever drives a session.
//!
//! ## Cache keys
//!
//! Lookups are **content-addressed**:
//!
//! - **`source_hash`**: SHA-256 of the upload bytes. Two uploads with
//!   the same bytes share entries no matter what they were called.
//! - **`params_hash`**: SHA-256 of (filename, quality setting, resize spec).
//!   The filename takes part because it ends up in the result.
//!
//! ## In-flight requests
//!
//! Each key maps to a shared `OnceCell`. The first caller computes; any
//! concurrent caller for the same key blocks on the cell and receives the
//! same result. A failed computation leaves the cell empty and the slot is
//! dropped, so errors are never cached and the next caller tries again.

use crate::imaging::{QualitySetting, ResizeSpec};
use crate::pipeline::CompressError;
use crate::types::CompressionResult;
use lru::LruCache;
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// SHA-256 hash of an upload's bytes, returned as a hex string.
pub fn hash_source(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 hash of the request parameters.
///
/// Inputs: filename, quality setting, and resize spec. A tier and the raw
/// quality it maps to hash differently; they produce the same bytes but
/// are treated as separate requests.
pub fn hash_params(filename: &str, setting: QualitySetting, resize: Option<ResizeSpec>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"process\0");
    hasher.update(filename.as_bytes());
    hasher.update(b"\0");
    match setting {
        QualitySetting::Level(level) => {
            hasher.update(b"L");
            hasher.update(level.as_str().as_bytes());
        }
        QualitySetting::Value(quality) => {
            hasher.update(b"Q");
            hasher.update([quality.value()]);
        }
    }
    match resize {
        None => hasher.update(b"\x00"),
        Some(ResizeSpec::Fit {
            max_width,
            max_height,
        }) => {
            hasher.update(b"\x01");
            hash_bound(&mut hasher, max_width);
            hash_bound(&mut hasher, max_height);
        }
        Some(ResizeSpec::Scale { factor }) => {
            hasher.update(b"\x02");
            hasher.update(factor.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

fn hash_bound(hasher: &mut Sha256, bound: Option<u32>) {
    match bound {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.to_le_bytes());
        }
        None => hasher.update(b"\x00"),
    }
}

/// Identity of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_hash: String,
    pub params_hash: String,
}

impl CacheKey {
    pub fn new(
        bytes: &[u8],
        filename: &str,
        setting: QualitySetting,
        resize: Option<ResizeSpec>,
    ) -> Self {
        Self {
            source_hash: hash_source(bytes),
            params_hash: hash_params(filename, setting, resize),
        }
    }
}

type Slot = Arc<OnceCell<CompressionResult>>;

/// Bounded, thread-safe memo of pipeline results.
pub struct ResultCache {
    slots: Mutex<LruCache<CacheKey, Slot>>,
    stats: Mutex<CacheStats>,
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Return the memoized result for `key`, running `compute` on a miss.
    ///
    /// At most one computation per key runs at a time; concurrent callers
    /// with the same key wait for it. Errors are returned to the caller that
    /// computed them and are not stored.
    pub fn get_or_compute<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<CompressionResult, CompressError>
    where
        F: FnOnce() -> Result<CompressionResult, CompressError>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            match slots.get(&key) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let slot = Slot::default();
                    slots.put(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        let mut computed = false;
        let outcome = slot
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .cloned();

        match &outcome {
            Ok(_) if computed => lock(&self.stats).miss(),
            Ok(_) => lock(&self.stats).hit(),
            Err(_) => {
                lock(&self.stats).miss();
                let mut slots = lock(&self.slots);
                // Only drop the slot we failed on; a retry may already have
                // installed a fresh one.
                if slots.peek(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    slots.pop(&key);
                }
            }
        }
        outcome
    }

    pub fn stats(&self) -> CacheStats {
        *lock(&self.stats)
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.slots).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// A poisoned lock only means another request panicked mid-update; the
/// map itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Summary of cache performance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// The most recent request of a session and what it produced.
///
/// Changing any parameter discards the previous result.
#[derive(Debug, Default, Clone)]
pub struct LastResult {
    entry: Option<(CacheKey, CompressionResult)>,
}

impl LastResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored result, if it was produced for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<&CompressionResult> {
        match &self.entry {
            Some((stored, result)) if stored == key => Some(result),
            _ => None,
        }
    }

    /// The stored result regardless of key.
    pub fn result(&self) -> Option<&CompressionResult> {
        self.entry.as_ref().map(|(_, result)| result)
    }

    pub fn store(&mut self, key: CacheKey, result: CompressionResult) {
        self.entry = Some((key, result));
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{CompressionLevel, Dimensions, ImageKind, Quality};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn result(tag: u8) -> CompressionResult {
        CompressionResult {
            bytes: vec![tag; 4],
            format: ImageKind::Jpeg,
            dimensions: Dimensions {
                width: 2,
                height: 2,
            },
            original_size: 8,
            compressed_size: 4,
            quality: Some(60),
            filename: "compressed_a.jpg".into(),
            mime_type: "image/jpeg".into(),
        }
    }

    fn key(source: &[u8], setting: QualitySetting) -> CacheKey {
        CacheKey::new(source, "a.jpg", setting, None)
    }

    fn cache(capacity: usize) -> ResultCache {
        ResultCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    // =========================================================================
    // Hash functions
    // =========================================================================

    #[test]
    fn hash_source_deterministic() {
        let h1 = hash_source(b"hello world");
        let h2 = hash_source(b"hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex is 64 chars
        assert_ne!(h1, hash_source(b"hello world!"));
    }

    #[test]
    fn hash_params_varies_with_each_input() {
        let base = hash_params("a.jpg", CompressionLevel::Medium.into(), None);
        assert_eq!(
            base,
            hash_params("a.jpg", CompressionLevel::Medium.into(), None)
        );
        assert_ne!(
            base,
            hash_params("b.jpg", CompressionLevel::Medium.into(), None)
        );
        assert_ne!(base, hash_params("a.jpg", CompressionLevel::High.into(), None));
        assert_ne!(
            base,
            hash_params(
                "a.jpg",
                CompressionLevel::Medium.into(),
                Some(ResizeSpec::max_width(400))
            )
        );
    }

    #[test]
    fn hash_params_distinguishes_resize_shapes() {
        let setting = QualitySetting::Value(Quality::new(50));
        let width_only = hash_params("a", setting, Some(ResizeSpec::max_width(400)));
        let both = hash_params("a", setting, Some(ResizeSpec::fit(400, 400)));
        let height_only = hash_params(
            "a",
            setting,
            Some(ResizeSpec::Fit {
                max_width: None,
                max_height: Some(400),
            }),
        );
        let scaled = hash_params("a", setting, Some(ResizeSpec::scale(0.5)));
        assert_ne!(width_only, both);
        assert_ne!(width_only, height_only);
        assert_ne!(both, scaled);
    }

    // =========================================================================
    // ResultCache
    // =========================================================================

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = cache(4);
        let k = key(b"src", CompressionLevel::Low.into());

        let first = cache.get_or_compute(k.clone(), || Ok(result(1))).unwrap();
        let second = cache
            .get_or_compute(k, || panic!("must not recompute"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = cache(4);
        let k = key(b"src", CompressionLevel::Low.into());

        let err = cache
            .get_or_compute(k.clone(), || Err(CompressError::Decode("bad".into())))
            .unwrap_err();
        assert_eq!(err.code(), "DecodeError");
        assert!(cache.is_empty());

        let ok = cache.get_or_compute(k, || Ok(result(2))).unwrap();
        assert_eq!(ok.bytes, vec![2; 4]);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let a = key(b"a", CompressionLevel::Low.into());
        let b = key(b"b", CompressionLevel::Low.into());
        let c = key(b"c", CompressionLevel::Low.into());

        cache.get_or_compute(a.clone(), || Ok(result(1))).unwrap();
        cache.get_or_compute(b, || Ok(result(2))).unwrap();
        cache.get_or_compute(a.clone(), || Ok(result(9))).unwrap(); // touch a
        cache.get_or_compute(c, || Ok(result(3))).unwrap(); // evicts b

        assert_eq!(cache.len(), 2);
        let again = cache.get_or_compute(a, || Ok(result(9))).unwrap();
        assert_eq!(again.bytes, vec![1; 4]);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let cache = cache(4);
        let k = key(b"shared", CompressionLevel::High.into());
        let runs = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let r = cache
                        .get_or_compute(k.clone(), || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(result(7))
                        })
                        .unwrap();
                    assert_eq!(r.bytes, vec![7; 4]);
                });
            }
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 3, misses: 1 });
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = cache(4);
        cache
            .get_or_compute(key(b"x", CompressionLevel::Low.into()), || Ok(result(1)))
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    // =========================================================================
    // LastResult
    // =========================================================================

    #[test]
    fn last_result_matches_only_its_key() {
        let mut last = LastResult::new();
        let low = key(b"src", CompressionLevel::Low.into());
        let high = key(b"src", CompressionLevel::High.into());

        assert!(last.get(&low).is_none());
        last.store(low.clone(), result(1));
        assert_eq!(last.get(&low).map(|r| r.bytes[0]), Some(1));
        assert!(last.get(&high).is_none());
        assert!(last.result().is_some());

        last.clear();
        assert!(last.result().is_none());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats { hits: 5, misses: 2 };
        assert_eq!(format!("{}", s), "5 cached, 2 encoded (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats { hits: 0, misses: 3 };
        assert_eq!(format!("{}", s), "3 encoded");
    }
}
