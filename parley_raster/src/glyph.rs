// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached glyph records and the products stored in them.

use core::fmt::{Debug, Formatter};
use core::mem::size_of;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use peniko::kurbo::{BezPath, PathEl};
use swash::zeno::{Point, Verb};

use crate::rasterizer::OutlineSink;

/// The font-specific identifier of a glyph.
///
/// This is an index into the glyph table of a typeface, not a Unicode code point.
pub type GlyphId = u16;

/// Pixel layout of a [`GlyphImage`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte of coverage per pixel.
    Alpha,
    /// Four bytes per pixel, in RGBA order.
    Rgba,
}

impl PixelFormat {
    /// Returns the number of bytes used by a single pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha => 1,
            Self::Rgba => 4,
        }
    }
}

/// A rasterized glyph bitmap.
///
/// `left` and `top` are the side bearings of the bitmap relative to the glyph
/// origin, with `top` measured upwards from the baseline. Rows are stored top
/// to bottom without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct GlyphImage {
    /// Pixel layout of `data`.
    pub format: PixelFormat,
    /// Horizontal offset of the left edge from the glyph origin.
    pub left: i32,
    /// Vertical offset of the top edge above the baseline.
    pub top: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data.
    pub data: Vec<u8>,
}

impl GlyphImage {
    /// Returns the number of bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Returns true if the image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the memory held by the pixel data, in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.capacity()
    }
}

impl Debug for GlyphImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlyphImage")
            .field("format", &self.format)
            .field("left", &self.left)
            .field("top", &self.top)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .finish()
    }
}

/// A scaled glyph outline in pixel units, with the y axis pointing up.
///
/// The outline is a sequence of verbs, each consuming a fixed number of points:
/// one for [`Verb::MoveTo`] and [`Verb::LineTo`], two for [`Verb::QuadTo`],
/// three for [`Verb::CurveTo`] and none for [`Verb::Close`].
#[derive(Clone, Default, PartialEq)]
pub struct GlyphOutline {
    points: Vec<Point>,
    verbs: Vec<Verb>,
}

impl GlyphOutline {
    /// Creates an outline from its points and verbs.
    pub fn new(points: Vec<Point>, verbs: Vec<Verb>) -> Self {
        Self { points, verbs }
    }

    /// Returns the points of the outline.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the verbs of the outline.
    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Returns true if the outline has no contours.
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Returns the memory held by the outline, in bytes.
    pub fn byte_size(&self) -> usize {
        self.points.capacity() * size_of::<Point>() + self.verbs.capacity() * size_of::<Verb>()
    }

    /// Feeds the outline to `sink`, one segment at a time.
    ///
    /// Contours that are not explicitly closed are closed before the next
    /// contour starts and at the end of the outline. Returns `false` without
    /// finishing if the verbs reference more points than the outline holds.
    pub fn decompose(&self, sink: &mut impl OutlineSink) -> bool {
        let mut points = self.points.iter().copied();
        let mut open = false;
        for verb in &self.verbs {
            match verb {
                Verb::MoveTo => {
                    let Some(p) = points.next() else {
                        return false;
                    };
                    if open {
                        sink.close();
                    }
                    sink.move_to(p);
                    open = true;
                }
                Verb::LineTo => {
                    let Some(p) = points.next() else {
                        return false;
                    };
                    sink.line_to(p);
                }
                Verb::QuadTo => {
                    let (Some(c), Some(p)) = (points.next(), points.next()) else {
                        return false;
                    };
                    sink.quad_to(c, p);
                }
                Verb::CurveTo => {
                    let (Some(c0), Some(c1), Some(p)) = (points.next(), points.next(), points.next())
                    else {
                        return false;
                    };
                    sink.curve_to(c0, c1, p);
                }
                Verb::Close => {
                    if open {
                        sink.close();
                        open = false;
                    }
                }
            }
        }
        if open {
            sink.close();
        }
        true
    }
}

impl Debug for GlyphOutline {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlyphOutline")
            .field("points", &self.points.len())
            .field("verbs", &self.verbs.len())
            .finish()
    }
}

/// A product slot of a [`Glyph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Product {
    Image,
    Outline,
    Path,
}

impl Product {
    fn bit(self) -> u8 {
        match self {
            Self::Image => 1,
            Self::Outline => 2,
            Self::Path => 4,
        }
    }
}

/// A cached glyph record.
///
/// A record starts out as a placeholder with every product unresolved. Each
/// product (image, outline and path) is resolved at most once; afterwards it
/// either holds a value or is known to be absent, for example because the glyph
/// is blank or the font has no data for it.
pub struct Glyph {
    id: GlyphId,
    image: OnceLock<Option<GlyphImage>>,
    outline: OnceLock<Option<GlyphOutline>>,
    path: OnceLock<Option<BezPath>>,
    /// Products some thread has committed to computing.
    claims: AtomicU8,
}

impl Glyph {
    /// Creates a placeholder record with no resolved products.
    pub fn new(id: GlyphId) -> Self {
        Self {
            id,
            image: OnceLock::new(),
            outline: OnceLock::new(),
            path: OnceLock::new(),
            claims: AtomicU8::new(0),
        }
    }

    /// Creates a record whose image is already resolved.
    ///
    /// Passing `None` produces an empty record: its image is known to be absent.
    pub fn with_image(id: GlyphId, image: Option<GlyphImage>) -> Self {
        let glyph = Self::new(id);
        glyph.install_image(image);
        glyph
    }

    /// Creates a record whose outline is already resolved.
    pub fn with_outline(id: GlyphId, outline: Option<GlyphOutline>) -> Self {
        let glyph = Self::new(id);
        glyph.install_outline(outline);
        glyph
    }

    /// Returns the glyph identifier.
    pub fn id(&self) -> GlyphId {
        self.id
    }

    /// Returns the rasterized image, if it has been resolved and is present.
    pub fn image(&self) -> Option<&GlyphImage> {
        self.image.get().and_then(Option::as_ref)
    }

    /// Returns the scaled outline, if it has been resolved and is present.
    pub fn outline(&self) -> Option<&GlyphOutline> {
        self.outline.get().and_then(Option::as_ref)
    }

    /// Returns the filled path, if it has been resolved and is present.
    pub fn path(&self) -> Option<&BezPath> {
        self.path.get().and_then(Option::as_ref)
    }

    /// Returns true once the image slot has been resolved, even if to nothing.
    pub fn has_resolved_image(&self) -> bool {
        self.image.get().is_some()
    }

    /// Returns true once the outline slot has been resolved, even if to nothing.
    pub fn has_resolved_outline(&self) -> bool {
        self.outline.get().is_some()
    }

    /// Returns true once the path slot has been resolved, even if to nothing.
    pub fn has_resolved_path(&self) -> bool {
        self.path.get().is_some()
    }

    /// Returns the memory held by the resolved products, in bytes.
    ///
    /// Every product is charged for its allocated buffers.
    pub fn byte_size(&self) -> usize {
        self.image().map_or(0, GlyphImage::byte_size)
            + self.outline().map_or(0, GlyphOutline::byte_size)
            // Stored paths are compacted, so their length is their capacity.
            + self.path().map_or(0, |path| {
                path.elements().len() * size_of::<PathEl>()
            })
    }

    pub(crate) fn is_resolved(&self, product: Product) -> bool {
        match product {
            Product::Image => self.has_resolved_image(),
            Product::Outline => self.has_resolved_outline(),
            Product::Path => self.has_resolved_path(),
        }
    }

    /// Marks `product` as being computed. Returns false if another caller
    /// already claimed it.
    pub(crate) fn claim(&self, product: Product) -> bool {
        let bit = product.bit();
        self.claims.fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    /// Blocks until `product` is resolved.
    pub(crate) fn wait(&self, product: Product) {
        match product {
            Product::Image => {
                self.image.wait();
            }
            Product::Outline => {
                self.outline.wait();
            }
            Product::Path => {
                self.path.wait();
            }
        }
    }

    /// Resolves `product` to absent unless it is already resolved, releasing
    /// anyone waiting on a claim that will never be fulfilled.
    pub(crate) fn abandon(&self, product: Product) {
        match product {
            Product::Image => self.install_image(None),
            Product::Outline => self.install_outline(None),
            Product::Path => self.install_path(None),
        };
    }

    /// Consumes the record and returns its image.
    pub(crate) fn into_image(self) -> Option<GlyphImage> {
        self.image.into_inner().flatten()
    }

    // The install methods return false if the slot was already resolved, in
    // which case `value` is dropped.

    pub(crate) fn install_image(&self, value: Option<GlyphImage>) -> bool {
        self.image.set(value).is_ok()
    }

    pub(crate) fn install_outline(&self, value: Option<GlyphOutline>) -> bool {
        self.outline.set(value).is_ok()
    }

    pub(crate) fn install_path(&self, value: Option<BezPath>) -> bool {
        if self.path.get().is_some() {
            return false;
        }
        // `BezPath` does not expose its capacity; copy into an exact allocation.
        let value = value.map(|path| BezPath::from_vec(path.elements().to_vec()));
        self.path.set(value).is_ok()
    }
}

impl Debug for Glyph {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Glyph")
            .field("id", &self.id)
            .field("image", &self.image.get())
            .field("outline", &self.outline.get())
            .field("path", &self.path.get().map(|p| p.as_ref().map(|p| p.elements().len())))
            .finish_non_exhaustive()
    }
}
