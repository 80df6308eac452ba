// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared font handles.

use core::fmt::{Debug, Formatter};
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use peniko::{Blob, FontData};
use swash::scale::{ScaleContext, Scaler};
use swash::{CacheKey, FontDataRef, FontRef};

use crate::error::Error;
use crate::glyph::GlyphId;
use crate::stroker::Stroker;

/// Identity token of a [`Typeface`].
///
/// Every typeface receives a fresh token when it is created, and clones of a
/// typeface share it. Two typefaces loaded from the same bytes have different
/// tokens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypefaceId(u64);

impl TypefaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value of the token.
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

/// Global font metrics, in design units.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FontMetrics {
    /// Number of design units per em.
    pub units_per_em: u16,
    /// Number of glyphs in the font.
    pub glyph_count: u16,
    /// Distance from the baseline to the top of the alignment box.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the alignment box.
    pub descent: f32,
    /// Recommended additional spacing between lines.
    pub leading: f32,
    /// Height of capital letters above the baseline.
    pub cap_height: f32,
    /// Height of lowercase letters above the baseline.
    pub x_height: f32,
    /// Offset of the underline from the baseline.
    pub underline_offset: f32,
    /// Thickness of the underline and strikeout strokes.
    pub stroke_size: f32,
}

impl FontMetrics {
    /// Returns the metrics scaled to pixels at `size_px` pixels per em.
    ///
    /// Counts are left as they are.
    #[must_use]
    pub fn scale(&self, size_px: f32) -> Self {
        let factor = if self.units_per_em == 0 {
            1.0
        } else {
            size_px / f32::from(self.units_per_em)
        };
        Self {
            ascent: self.ascent * factor,
            descent: self.descent * factor,
            leading: self.leading * factor,
            cap_height: self.cap_height * factor,
            x_height: self.x_height * factor,
            underline_offset: self.underline_offset * factor,
            stroke_size: self.stroke_size * factor,
            ..*self
        }
    }
}

/// A font face that can be shared between threads.
///
/// Cloning is cheap: clones refer to the same font data and share the same
/// [`TypefaceId`], lock and stroker. Equality and hashing use the identity
/// token only.
///
/// The scaling engine keeps mutable state, so every engine call goes through
/// [`Typeface::with_face`] or [`Typeface::with_stroker`], which hold the
/// typeface lock for the duration of the closure.
#[derive(Clone)]
pub struct Typeface {
    inner: Arc<TypefaceInner>,
}

struct TypefaceInner {
    id: TypefaceId,
    font: FontData,
    offset: u32,
    key: CacheKey,
    metrics: FontMetrics,
    state: Mutex<FaceState>,
}

struct FaceState {
    context: ScaleContext,
    stroker: Option<Stroker>,
}

impl Typeface {
    /// Creates a typeface for the font at `font.index` in `font.data`.
    ///
    /// Fails if the data is not a font file or collection, or if the collection
    /// has no font at the requested index.
    pub fn new(font: FontData) -> Result<Self, Error> {
        let index = font.index;
        let Some(collection) = FontDataRef::new(font.data.data()) else {
            return Err(Error::invalid_font_data(index));
        };
        let Some(font_ref) = collection.get(index as usize) else {
            return Err(Error::index_out_of_range(index, collection.len()));
        };
        let m = font_ref.metrics(&[]);
        let metrics = FontMetrics {
            units_per_em: m.units_per_em,
            glyph_count: m.glyph_count,
            ascent: m.ascent,
            descent: m.descent,
            leading: m.leading,
            cap_height: m.cap_height,
            x_height: m.x_height,
            underline_offset: m.underline_offset,
            stroke_size: m.stroke_size,
        };
        let (offset, key) = (font_ref.offset, font_ref.key);
        let id = TypefaceId::next();
        log::debug!(
            "created typeface {id:?} (index {index}, {} glyphs)",
            metrics.glyph_count
        );
        Ok(Self {
            inner: Arc::new(TypefaceInner {
                id,
                font,
                offset,
                key,
                metrics,
                state: Mutex::new(FaceState {
                    context: ScaleContext::new(),
                    stroker: None,
                }),
            }),
        })
    }

    /// Creates a typeface from owned font bytes.
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self, Error> {
        Self::new(FontData::new(Blob::from(data), index))
    }

    /// Reads a font file and creates a typeface for the font at `index`.
    pub fn load(path: impl AsRef<Path>, index: u32) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|err| Error::io(index, &err))?;
        Self::from_bytes(data, index)
    }

    /// Returns the identity token of this typeface.
    pub fn id(&self) -> TypefaceId {
        self.inner.id
    }

    /// Returns the underlying font data.
    pub fn font(&self) -> &FontData {
        &self.inner.font
    }

    /// Returns the global metrics of the font, in design units.
    pub fn metrics(&self) -> FontMetrics {
        self.inner.metrics
    }

    /// Returns the number of glyphs in the font.
    pub fn glyph_count(&self) -> u16 {
        self.inner.metrics.glyph_count
    }

    /// Maps a character to its nominal glyph. Returns 0 (the missing glyph) if
    /// the font does not cover `ch`.
    pub fn glyph_id(&self, ch: char) -> GlyphId {
        self.font_ref().charmap().map(ch)
    }

    /// Returns the horizontal advance of `glyph_id` in pixels at `size_px`
    /// pixels per em.
    pub fn advance(&self, glyph_id: GlyphId, size_px: f32) -> f32 {
        self.font_ref()
            .glyph_metrics(&[])
            .scale(size_px)
            .advance_width(glyph_id)
    }

    /// Runs `f` with exclusive access to the scaling engine of this typeface.
    pub fn with_face<R>(&self, f: impl FnOnce(&mut Face<'_>) -> R) -> R {
        let mut state = self.lock();
        let mut face = Face {
            font: self.font_ref(),
            context: &mut state.context,
        };
        f(&mut face)
    }

    /// Runs `f` with exclusive access to the scaling engine and the shared
    /// stroker of this typeface, creating the stroker on first use.
    pub fn with_stroker<R>(&self, f: impl FnOnce(&mut Face<'_>, &mut Stroker) -> R) -> R {
        let mut state = self.lock();
        let FaceState { context, stroker } = &mut *state;
        let stroker = stroker.get_or_insert_with(Stroker::new);
        let mut face = Face {
            font: self.font_ref(),
            context,
        };
        f(&mut face, stroker)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FaceState> {
        // The state is only scratch memory, which stays usable after a panic.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: self.inner.font.data.data(),
            offset: self.inner.offset,
            key: self.inner.key,
        }
    }
}

impl PartialEq for Typeface {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Typeface {}

impl Hash for Typeface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl Debug for Typeface {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Typeface")
            .field("id", &self.inner.id)
            .field("index", &self.inner.font.index)
            .field("glyph_count", &self.inner.metrics.glyph_count)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the scaling engine of a [`Typeface`].
///
/// Only reachable through [`Typeface::with_face`] and
/// [`Typeface::with_stroker`].
pub struct Face<'a> {
    font: FontRef<'a>,
    context: &'a mut ScaleContext,
}

impl Face<'_> {
    /// Returns the font being scaled.
    pub fn font_ref(&self) -> FontRef<'_> {
        self.font
    }

    /// Builds a scaler for the font at `size_px` pixels per em.
    pub fn scaler(&mut self, size_px: f32, hint: bool) -> Scaler<'_> {
        self.context
            .builder(self.font)
            .size(size_px)
            .hint(hint)
            .build()
    }
}

impl Debug for Face<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Face")
            .field("offset", &self.font.offset)
            .finish_non_exhaustive()
    }
}
