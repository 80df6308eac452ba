// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parley Raster provides a thread-safe cache of rasterized glyphs.
//!
//! A [`GlyphCache`] hands out shared [`Glyph`] records holding an alpha mask,
//! a color image, a scaled outline or a filled path, computing each of them at
//! most once per key. Keys describe a strike: a [`Typeface`] at a pixel size
//! and skew ([`StrikeKey`]), optionally with a foreground color
//! ([`ColorKey`]) or a stroke style ([`StrokeKey`]). Rasterization is done
//! with [swash] by default, and can be replaced through
//! [`RasterizerFactory`].
//!
//! All cached products share one byte budget, evicted in least recently used
//! order.
//!
//! ## Example
//!
//! ```no_run
//! use parley_raster::{GlyphCache, GlyphCacheOptions, StrikeKey, Typeface};
//!
//! let typeface = Typeface::load("DejaVuSans.ttf", 0)?;
//! let cache = GlyphCache::new(GlyphCacheOptions::default());
//! let key = StrikeKey::new(typeface.clone(), 16.0);
//! let glyph = cache.mask_glyph(&key, typeface.glyph_id('g'));
//! if let Some(image) = glyph.image() {
//!     assert_eq!(image.data.len(), image.stride() * image.height as usize);
//! }
//! # Ok::<(), parley_raster::Error>(())
//! ```

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use peniko;
pub use swash;

mod cache;
mod error;
mod fixed;
mod glyph;
mod key;
mod rasterizer;
mod stroker;
mod typeface;

pub mod lru;

pub use cache::{DEFAULT_CAPACITY, GlyphCache, GlyphCacheOptions, GlyphCacheStats};
pub use error::{Error, ErrorKind};
pub use fixed::{F16Dot16, F26Dot6};
pub use glyph::{Glyph, GlyphId, GlyphImage, GlyphOutline, PixelFormat};
pub use key::{ColorKey, GlyphKey, LineCap, LineJoin, Rgba8, StrikeKey, StrokeKey, StrokeStyle};
pub use rasterizer::{
    GlyphRasterizer, OutlineSink, Rasterizer, RasterizerFactory, RasterizerOptions,
    TypefaceRasterizers, outline_to_path,
};
pub use stroker::{MAX_STROKE_EXTENT, Stroker};
pub use typeface::{Face, FontMetrics, Typeface, TypefaceId};
