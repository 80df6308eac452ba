// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The thread-safe glyph cache.

use core::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use hashbrown::hash_map::RawEntryMut;
use peniko::kurbo::BezPath;

use crate::fixed::{F16Dot16, F26Dot6};
use crate::glyph::{Glyph, GlyphId, Product};
use crate::key::{
    ColorKey, GlyphKey, GlyphKeyRef, LineCap, LineJoin, StrikeKey, StrokeKey, StrokeStyle,
};
use crate::lru::{LruCache, SegmentId};
use crate::rasterizer::{GlyphRasterizer, RasterizerFactory, TypefaceRasterizers};

/// Default byte budget of a [`GlyphCache`].
pub const DEFAULT_CAPACITY: usize = 8 * 1024 * 1024;

/// Configuration of a [`GlyphCache`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlyphCacheOptions {
    /// Maximum number of bytes held by cached glyph products.
    pub capacity: usize,
}

impl Default for GlyphCacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A snapshot of the counters of a [`GlyphCache`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphCacheStats {
    /// Requests answered with an already resolved product.
    pub hits: u64,
    /// Requests that computed their product.
    pub misses: u64,
    /// Number of glyph records in the cache.
    pub entries: usize,
    /// Number of segments, one per distinct [`GlyphKey`].
    pub segments: usize,
    /// Bytes held by cached products.
    pub size: usize,
}

/// A cache of rasterized glyph images, outlines and paths.
///
/// Glyph records are grouped in segments, one per [`GlyphKey`]: plain strikes,
/// strikes with a foreground color, and stroked strikes. Each segment owns the
/// rasterizer of its strike. All segments share one byte budget; when it is
/// exceeded, the least recently used records are evicted, whatever their
/// segment.
///
/// The cache is meant to be created once and shared, typically behind an
/// [`Arc`]. Products are computed without holding the cache lock, so glyphs
/// for different typefaces rasterize in parallel. When several threads ask for
/// the same product of the same glyph, one of them computes it and the others
/// wait for its result.
///
/// Rasterization failures are not errors: the returned record simply has no
/// product, meaning there is nothing to draw.
pub struct GlyphCache<F: RasterizerFactory = TypefaceRasterizers> {
    factory: F,
    state: Mutex<CacheState<F::Rasterizer>>,
}

struct CacheState<R> {
    segments: HashMap<GlyphKey, Segment<R>>,
    lru: LruCache<GlyphId, Arc<Glyph>>,
    hits: u64,
    misses: u64,
}

struct Segment<R> {
    id: SegmentId,
    rasterizer: Arc<R>,
}

fn glyph_size(_: &GlyphId, glyph: &Arc<Glyph>) -> usize {
    glyph.byte_size()
}

/// Resolves a claimed product to nothing if its computation unwinds, so that
/// waiters are released.
struct Claim<'a> {
    glyph: &'a Glyph,
    product: Product,
    done: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.glyph.abandon(self.product);
        }
    }
}

impl GlyphCache {
    /// Creates a cache that rasterizes with the [`Typeface`](crate::Typeface)
    /// named by each key.
    pub fn new(options: GlyphCacheOptions) -> Self {
        Self::with_factory(options, TypefaceRasterizers::default())
    }
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new(GlyphCacheOptions::default())
    }
}

impl<F: RasterizerFactory> GlyphCache<F> {
    /// Creates a cache whose segments get their rasterizers from `factory`.
    pub fn with_factory(options: GlyphCacheOptions, factory: F) -> Self {
        Self {
            factory,
            state: Mutex::new(CacheState {
                segments: HashMap::new(),
                lru: LruCache::new(options.capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Returns the rasterizer factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the record of `glyph_id` at `key` with its alpha mask resolved.
    pub fn mask_glyph(&self, key: &StrikeKey, glyph_id: GlyphId) -> Arc<Glyph> {
        self.resolve(
            GlyphKeyRef::Data(key),
            glyph_id,
            Product::Image,
            |rasterizer| rasterizer.make_image(glyph_id),
            Glyph::install_image,
        )
    }

    /// Returns the record of `glyph_id` at `key` with its outline resolved.
    pub fn glyph_outline(&self, key: &StrikeKey, glyph_id: GlyphId) -> Arc<Glyph> {
        self.resolve(
            GlyphKeyRef::Data(key),
            glyph_id,
            Product::Outline,
            |rasterizer| rasterizer.make_outline(glyph_id),
            Glyph::install_outline,
        )
    }

    /// Returns the filled path of `glyph_id` at `key`, with the y axis pointing
    /// down.
    pub fn glyph_path(&self, key: &StrikeKey, glyph_id: GlyphId) -> Option<BezPath> {
        self.resolve(
            GlyphKeyRef::Data(key),
            glyph_id,
            Product::Path,
            |rasterizer| rasterizer.make_path(glyph_id),
            Glyph::install_path,
        )
        .path()
        .cloned()
    }

    /// Returns the record of `glyph_id` at `key` with its color image resolved.
    ///
    /// Glyphs without color layers or color bitmaps resolve to an alpha mask.
    pub fn color_glyph(&self, key: &ColorKey, glyph_id: GlyphId) -> Arc<Glyph> {
        let foreground = key.foreground();
        self.resolve(
            GlyphKeyRef::Color(key),
            glyph_id,
            Product::Image,
            |rasterizer| rasterizer.make_color_image(glyph_id, foreground),
            Glyph::install_image,
        )
    }

    /// Returns the record of `glyph_id` stroked as described by `key`.
    ///
    /// The outline is cached with the plain strike, and the stroked image with
    /// the stroke key. The returned record holds only the stroked image.
    pub fn stroked_glyph(&self, key: &StrokeKey, glyph_id: GlyphId) -> Arc<Glyph> {
        let style = key.style();
        self.resolve(
            GlyphKeyRef::Stroke(key),
            glyph_id,
            Product::Image,
            |rasterizer| {
                let base = self.glyph_outline(key.strike(), glyph_id);
                rasterizer.make_stroked_glyph(&base, &style).into_image()
            },
            Glyph::install_image,
        )
    }

    /// Strokes `glyph_id` at `key` with the given parameters.
    ///
    /// This is [`Self::stroked_glyph`] with a [`StrokeKey`] derived from `key`.
    pub fn mask_glyph_stroked(
        &self,
        key: &StrikeKey,
        glyph_id: GlyphId,
        line_radius: F26Dot6,
        line_cap: LineCap,
        line_join: LineJoin,
        miter_limit: F16Dot16,
    ) -> Arc<Glyph> {
        let style = StrokeStyle {
            line_radius,
            line_cap,
            line_join,
            miter_limit,
        };
        self.stroked_glyph(&StrokeKey::new(key.clone(), style), glyph_id)
    }

    /// Drops every segment and record. Records held by callers stay valid.
    pub fn clear(&self) {
        let mut state = self.lock();
        log::debug!(
            "clearing glyph cache: {} records in {} segments, {} bytes",
            state.lru.len(),
            state.segments.len(),
            state.lru.size()
        );
        state.segments.clear();
        state.lru.clear();
    }

    /// Returns the number of bytes held by cached products.
    pub fn size(&self) -> usize {
        self.lock().lru.size()
    }

    /// Returns the byte budget.
    pub fn capacity(&self) -> usize {
        self.lock().lru.capacity()
    }

    /// Returns the number of cached glyph records.
    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    /// Returns true if no glyph records are cached.
    pub fn is_empty(&self) -> bool {
        self.lock().lru.is_empty()
    }

    /// Returns the current counters.
    pub fn stats(&self) -> GlyphCacheStats {
        let state = self.lock();
        GlyphCacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.lru.len(),
            segments: state.segments.len(),
            size: state.lru.size(),
        }
    }

    /// Resets the hit and miss counters.
    pub fn reset_stats(&self) {
        let mut state = self.lock();
        state.hits = 0;
        state.misses = 0;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<F::Rasterizer>> {
        // Every mutation leaves the state consistent before anything can panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the record of `glyph_id` under `key` with `product` resolved.
    ///
    /// The product is computed by `compute` without holding the cache lock, and
    /// stored with `install` once the lock is taken again.
    fn resolve<T>(
        &self,
        key: GlyphKeyRef<'_>,
        glyph_id: GlyphId,
        product: Product,
        compute: impl FnOnce(&F::Rasterizer) -> T,
        install: fn(&Glyph, T) -> bool,
    ) -> Arc<Glyph> {
        let (glyph, rasterizer) = {
            let mut state = self.lock();
            let (glyph, rasterizer) = self.entry(&mut state, key, glyph_id);
            if glyph.is_resolved(product) {
                state.hits += 1;
                return glyph;
            }
            if !glyph.claim(product) {
                // Another thread is computing this product.
                state.hits += 1;
                drop(state);
                glyph.wait(product);
                return glyph;
            }
            state.misses += 1;
            (glyph, rasterizer)
        };

        let mut claim = Claim {
            glyph: &glyph,
            product,
            done: false,
        };
        let value = compute(&rasterizer);

        let mut state = self.lock();
        let installed = install(&glyph, value);
        debug_assert!(installed, "only the claimant resolves a product");
        Self::register(&mut state, key, &glyph);
        claim.done = true;
        drop(state);
        drop(claim);
        glyph
    }

    /// Finds or creates the segment for `key` and the record for `glyph_id` in it.
    fn entry(
        &self,
        state: &mut CacheState<F::Rasterizer>,
        key: GlyphKeyRef<'_>,
        glyph_id: GlyphId,
    ) -> (Arc<Glyph>, Arc<F::Rasterizer>) {
        let CacheState { segments, lru, .. } = state;
        let segment = match segments.raw_entry_mut().from_key(&key) {
            RawEntryMut::Occupied(entry) => entry.into_mut(),
            RawEntryMut::Vacant(entry) => {
                let segment = Segment {
                    id: lru.add_segment(glyph_size),
                    rasterizer: Arc::new(self.factory.create(key.strike())),
                };
                entry.insert(key.into_owned(), segment).1
            }
        };
        let rasterizer = segment.rasterizer.clone();
        if let Some(glyph) = lru.get(segment.id, &glyph_id) {
            return (glyph.clone(), rasterizer);
        }
        let glyph = Arc::new(Glyph::new(glyph_id));
        lru.set(segment.id, glyph_id, glyph.clone());
        (glyph, rasterizer)
    }

    /// Charges the current size of `glyph` to its segment.
    ///
    /// The segment is looked up again by key because the cache may have been
    /// cleared while the product was computed; in that case the record is not
    /// cached again.
    fn register(
        state: &mut CacheState<F::Rasterizer>,
        key: GlyphKeyRef<'_>,
        glyph: &Arc<Glyph>,
    ) {
        let Some(segment) = state.segments.get(&key) else {
            return;
        };
        let id = segment.id;
        let glyph_id = glyph.id();
        let cached = state
            .lru
            .peek(id, &glyph_id)
            .map(|current| Arc::ptr_eq(current, glyph));
        match cached {
            Some(true) => {
                state.lru.remove(id, &glyph_id);
                state.lru.set(id, glyph_id, glyph.clone());
            }
            // The placeholder was evicted while the product was computed.
            None => state.lru.set(id, glyph_id, glyph.clone()),
            // A newer record replaced it; that one is kept.
            Some(false) => {
                log::trace!("glyph {glyph_id}: record was replaced, result not cached");
            }
        }
    }
}

impl<F: RasterizerFactory> Debug for GlyphCache<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let stats = self.stats();
        f.debug_struct("GlyphCache")
            .field("capacity", &self.capacity())
            .field("stats", &stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{GlyphImage, GlyphOutline, PixelFormat};
    use crate::key::Rgba8;
    use crate::rasterizer::outline_to_path;
    use crate::typeface::Typeface;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Duration;
    use swash::zeno::{Point, Verb};

    const FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

    #[derive(Default)]
    struct Counts {
        image: AtomicUsize,
        color: AtomicUsize,
        outline: AtomicUsize,
        path: AtomicUsize,
        stroke: AtomicUsize,
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Counts calls and produces 10-byte images. Glyph 0 has no products and
    /// glyph 13 panics. When `slow` is set, only that glyph is delayed.
    #[derive(Default)]
    struct StubFactory {
        counts: Arc<Counts>,
        delay: Duration,
        slow: Option<GlyphId>,
        started: Mutex<Option<mpsc::Sender<GlyphId>>>,
    }

    struct Stub {
        counts: Arc<Counts>,
        delay: Duration,
        slow: Option<GlyphId>,
        started: Option<mpsc::Sender<GlyphId>>,
    }

    impl RasterizerFactory for StubFactory {
        type Rasterizer = Stub;

        fn create(&self, _: &StrikeKey) -> Stub {
            Stub {
                counts: self.counts.clone(),
                delay: self.delay,
                slow: self.slow,
                started: self.started.lock().unwrap().clone(),
            }
        }
    }

    impl Stub {
        fn work(&self, counter: &AtomicUsize, glyph_id: GlyphId) -> bool {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(started) = &self.started {
                started.send(glyph_id).ok();
            }
            if self.slow.is_none_or(|slow| slow == glyph_id) {
                thread::sleep(self.delay);
            }
            assert_ne!(glyph_id, 13, "glyph 13 cannot be rasterized");
            glyph_id != 0
        }
    }

    fn image(format: PixelFormat, width: u32, fill: u8) -> GlyphImage {
        GlyphImage {
            format,
            left: 0,
            top: 1,
            width,
            height: 1,
            data: vec![fill; width as usize * format.bytes_per_pixel()],
        }
    }

    fn square() -> GlyphOutline {
        GlyphOutline::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
            ],
            vec![Verb::MoveTo, Verb::LineTo, Verb::LineTo, Verb::Close],
        )
    }

    impl GlyphRasterizer for Stub {
        fn make_image(&self, glyph_id: GlyphId) -> Option<GlyphImage> {
            self.work(&self.counts.image, glyph_id)
                .then(|| image(PixelFormat::Alpha, 10, 255))
        }

        fn make_color_image(&self, glyph_id: GlyphId, foreground: Rgba8) -> Option<GlyphImage> {
            self.work(&self.counts.color, glyph_id)
                .then(|| image(PixelFormat::Rgba, 1, foreground.r))
        }

        fn make_outline(&self, glyph_id: GlyphId) -> Option<GlyphOutline> {
            self.work(&self.counts.outline, glyph_id).then(square)
        }

        fn make_path(&self, glyph_id: GlyphId) -> Option<BezPath> {
            self.work(&self.counts.path, glyph_id)
                .then(|| outline_to_path(&square()))
                .flatten()
        }

        fn make_stroked_glyph(&self, base: &Glyph, style: &StrokeStyle) -> Glyph {
            self.counts.stroke.fetch_add(1, Ordering::SeqCst);
            let width = style.line_radius.to_f32() as u32;
            Glyph::with_image(
                base.id(),
                base.outline().map(|_| image(PixelFormat::Alpha, width, 128)),
            )
        }
    }

    fn cache(capacity: usize, delay: Duration) -> (GlyphCache<StubFactory>, Arc<Counts>) {
        let factory = StubFactory {
            delay,
            ..StubFactory::default()
        };
        let counts = factory.counts.clone();
        (
            GlyphCache::with_factory(GlyphCacheOptions { capacity }, factory),
            counts,
        )
    }

    fn strike() -> StrikeKey {
        let typeface = Typeface::from_bytes(FONT.to_vec(), 0).unwrap();
        StrikeKey::new(typeface, 16.0)
    }

    #[test]
    fn mask_glyph_is_idempotent() {
        let (cache, counts) = cache(1024, Duration::ZERO);
        let key = strike();
        let first = cache.mask_glyph(&key, 7);
        let second = cache.mask_glyph(&key, 7);
        assert!(Arc::ptr_eq(&first, &second), "same record is returned");
        assert_eq!(count(&counts.image), 1);
        assert_eq!(second.image().map(|i| i.data.len()), Some(10));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!((stats.entries, stats.segments, stats.size), (1, 1, 10));

        cache.reset_stats();
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn failures_are_memoized() {
        let (cache, counts) = cache(1024, Duration::ZERO);
        let key = strike();
        assert!(cache.mask_glyph(&key, 0).image().is_none(), "nothing to draw");
        assert!(cache.mask_glyph(&key, 0).image().is_none(), "still nothing");
        assert_eq!(count(&counts.image), 1);
        assert!(cache.glyph_path(&key, 0).is_none());
        assert!(cache.glyph_path(&key, 0).is_none());
        assert_eq!(count(&counts.path), 1);
    }

    #[test]
    fn two_threads_share_one_rasterization() {
        let (cache, counts) = cache(1024, Duration::from_millis(50));
        let key = strike();
        let barrier = Barrier::new(2);
        let glyphs: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.mask_glyph(&key, 5)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(Arc::ptr_eq(&glyphs[0], &glyphs[1]));
        for glyph in &glyphs {
            assert_eq!(glyph.id(), 5);
            assert_eq!(glyph.image().map(|i| i.data.len()), Some(10));
        }
        assert_eq!(count(&counts.image), 1);
    }

    #[test]
    fn many_threads_compute_each_product_once() {
        let (cache, counts) = cache(1 << 20, Duration::from_millis(5));
        let key = strike();
        let threads = 8;
        let barrier = Barrier::new(threads);
        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    barrier.wait();
                    for glyph_id in 1..4 {
                        assert!(cache.mask_glyph(&key, glyph_id).image().is_some());
                        assert!(cache.glyph_outline(&key, glyph_id).outline().is_some());
                        assert!(cache.glyph_path(&key, glyph_id).is_some());
                    }
                });
            }
        });
        assert_eq!(count(&counts.image), 3);
        assert_eq!(count(&counts.outline), 3);
        assert_eq!(count(&counts.path), 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().misses, 9);
    }

    #[test]
    fn products_share_a_record() {
        let (cache, _) = cache(1 << 20, Duration::ZERO);
        let key = strike();
        let masked = cache.mask_glyph(&key, 3);
        let size_with_image = cache.size();
        let outlined = cache.glyph_outline(&key, 3);
        assert!(Arc::ptr_eq(&masked, &outlined), "one record per glyph and key");
        assert!(outlined.image().is_some() && outlined.outline().is_some());
        assert!(cache.size() > size_with_image, "outline bytes are charged");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn color_glyphs_are_keyed_by_foreground() {
        let (cache, counts) = cache(1 << 20, Duration::ZERO);
        let strike = strike();
        let red = ColorKey::new(strike.clone(), Rgba8::new(255, 0, 0, 255));
        let blue = ColorKey::new(strike.clone(), Rgba8::new(0, 0, 255, 255));

        let a = cache.color_glyph(&red, 4);
        let b = cache.color_glyph(&red, 4);
        let c = cache.color_glyph(&blue, 4);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c), "each foreground has its own segment");
        assert_eq!(a.image().map(|i| i.data[0]), Some(255));
        assert_eq!(c.image().map(|i| i.data[0]), Some(0));
        assert_eq!(count(&counts.color), 2);

        let plain = cache.mask_glyph(&strike, 4);
        assert!(!Arc::ptr_eq(&a, &plain), "color and plain records are separate");
        assert_eq!(cache.stats().segments, 3);
    }

    #[test]
    fn stroked_glyphs_are_cached_under_the_stroke_key() {
        let (cache, counts) = cache(1 << 20, Duration::ZERO);
        let strike = strike();
        let radius = F26Dot6::from_i32(3);
        let style = StrokeStyle {
            line_radius: radius,
            ..StrokeStyle::default()
        };
        let key = StrokeKey::new(strike.clone(), style);

        let first = cache.stroked_glyph(&key, 6);
        let second = cache.mask_glyph_stroked(
            &strike,
            6,
            radius,
            style.line_cap,
            style.line_join,
            style.miter_limit,
        );
        assert!(Arc::ptr_eq(&first, &second), "derived key finds the same record");
        assert_eq!(first.image().map(|i| i.width), Some(3));
        assert!(first.outline().is_none(), "stroke records hold only an image");
        assert_eq!(count(&counts.stroke), 1);
        assert_eq!(count(&counts.outline), 1);

        // The outline lives in the plain segment and is reused by other styles.
        assert!(cache.glyph_outline(&strike, 6).outline().is_some());
        let wider = cache.mask_glyph_stroked(
            &strike,
            6,
            F26Dot6::from_i32(5),
            LineCap::Round,
            LineJoin::Round,
            F16Dot16::ONE,
        );
        assert_eq!(wider.image().map(|i| i.width), Some(5));
        assert_eq!(count(&counts.stroke), 2);
        assert_eq!(count(&counts.outline), 1);

        // No outline, no stroke.
        assert!(cache.stroked_glyph(&key, 0).image().is_none());
    }

    #[test]
    fn eviction_respects_the_budget() {
        let (cache, counts) = cache(25, Duration::ZERO);
        let key = strike();
        for glyph_id in 1..=5 {
            cache.mask_glyph(&key, glyph_id);
            assert!(cache.size() <= cache.capacity(), "over budget");
        }
        assert_eq!(cache.len(), 2, "two 10-byte images fit");
        assert_eq!(cache.size(), 20);

        // The most recent glyphs are still cached, the oldest was evicted.
        cache.mask_glyph(&key, 5);
        assert_eq!(count(&counts.image), 5);
        cache.mask_glyph(&key, 1);
        assert_eq!(count(&counts.image), 6);
    }

    #[test]
    fn clear_empties_the_cache() {
        let (cache, counts) = cache(1024, Duration::ZERO);
        let key = strike();
        let kept = cache.mask_glyph(&key, 2);
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 1024);
        assert!(kept.image().is_some(), "records held by callers stay valid");

        let again = cache.mask_glyph(&key, 2);
        assert!(!Arc::ptr_eq(&kept, &again), "prior keys miss");
        assert_eq!(count(&counts.image), 2);
    }

    #[test]
    fn clear_during_rasterization() {
        let (sender, receiver) = mpsc::channel();
        let factory = StubFactory {
            delay: Duration::from_millis(30),
            started: Mutex::new(Some(sender)),
            ..StubFactory::default()
        };
        let counts = factory.counts.clone();
        let cache = GlyphCache::with_factory(GlyphCacheOptions { capacity: 1024 }, factory);
        let key = strike();

        let glyph = thread::scope(|s| {
            let handle = s.spawn(|| cache.mask_glyph(&key, 8));
            assert_eq!(receiver.recv().unwrap(), 8);
            cache.clear();
            handle.join().unwrap()
        });
        assert!(glyph.image().is_some(), "the caller still gets its product");
        assert!(cache.is_empty(), "the cleared segment is not revived");
        assert_eq!(cache.size(), 0);

        cache.mask_glyph(&key, 8);
        assert_eq!(count(&counts.image), 2);
    }

    /// A cache of 25 bytes where only glyph 1 is slow to rasterize.
    fn slow_glyph_cache() -> (GlyphCache<StubFactory>, Arc<Counts>, mpsc::Receiver<GlyphId>) {
        let (sender, receiver) = mpsc::channel();
        let factory = StubFactory {
            delay: Duration::from_millis(100),
            slow: Some(1),
            started: Mutex::new(Some(sender)),
            ..StubFactory::default()
        };
        let counts = factory.counts.clone();
        let cache = GlyphCache::with_factory(GlyphCacheOptions { capacity: 25 }, factory);
        (cache, counts, receiver)
    }

    #[test]
    fn placeholder_evicted_during_rasterization_is_reinserted() {
        let (cache, counts, started) = slow_glyph_cache();
        let key = strike();

        let first = thread::scope(|s| {
            let handle = s.spawn(|| cache.mask_glyph(&key, 1));
            assert_eq!(started.recv().unwrap(), 1);
            // Glyphs 2, 3 and 4 overflow the budget and evict the placeholder of 1.
            for glyph_id in 2..=4 {
                cache.mask_glyph(&key, glyph_id);
            }
            handle.join().unwrap()
        });
        assert!(first.image().is_some(), "the caller gets its image");
        assert!(cache.size() <= cache.capacity(), "over budget");
        assert_eq!((cache.len(), cache.size()), (2, 20));

        let again = cache.mask_glyph(&key, 1);
        assert!(Arc::ptr_eq(&first, &again), "the finished record was cached");
        assert_eq!(count(&counts.image), 4);
    }

    #[test]
    fn replaced_record_is_not_cached() {
        let (cache, counts, started) = slow_glyph_cache();
        let key = strike();

        let (first, second) = thread::scope(|s| {
            let handle = s.spawn(|| cache.mask_glyph(&key, 1));
            assert_eq!(started.recv().unwrap(), 1);
            for glyph_id in 2..=4 {
                cache.mask_glyph(&key, glyph_id);
            }
            // The placeholder is gone, so this creates a second record for glyph 1.
            // It finishes after the first one, which then finds itself replaced.
            let second = cache.mask_glyph(&key, 1);
            (handle.join().unwrap(), second)
        });
        assert!(!Arc::ptr_eq(&first, &second), "two records were created");
        assert!(first.image().is_some(), "the replaced record keeps its image");
        assert!(second.image().is_some());
        assert_eq!(count(&counts.image), 5);

        let cached = cache.mask_glyph(&key, 1);
        assert!(Arc::ptr_eq(&cached, &second), "only the newer record is cached");
        assert_eq!(count(&counts.image), 5);
        assert!(cache.size() <= cache.capacity(), "over budget");
        assert_eq!((cache.len(), cache.size()), (2, 20));
    }

    #[test]
    fn panicking_rasterizer_releases_the_claim() {
        let (cache, counts) = cache(1024, Duration::ZERO);
        let key = strike();
        let result = thread::scope(|s| s.spawn(|| cache.mask_glyph(&key, 13)).join());
        assert!(result.is_err(), "the rasterizer panicked");

        let glyph = cache.mask_glyph(&key, 13);
        assert!(glyph.image().is_none(), "the failed product resolves to nothing");
        assert_eq!(count(&counts.image), 1);
    }

    #[test]
    fn default_cache_uses_the_typeface() {
        let cache = GlyphCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
        let key = strike();
        let glyph_id = key.typeface().glyph_id('x');
        let glyph = cache.mask_glyph(&key, glyph_id);
        assert!(glyph.image().is_some_and(|i| !i.is_empty()));
        assert!(cache.size() >= glyph.byte_size());
    }
}
