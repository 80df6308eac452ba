// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outline stroking.

use core::fmt::{Debug, Formatter};

use swash::zeno::{Cap, Format, Join, Mask, Origin, Scratch, Stroke};

use crate::glyph::{GlyphImage, GlyphOutline, PixelFormat};
use crate::key::{LineCap, LineJoin, StrokeStyle};

/// Largest width or height, in pixels, of a stroked mask.
pub const MAX_STROKE_EXTENT: f32 = 4096.0;

/// Converts glyph outlines into stroked coverage masks.
///
/// Every [`Typeface`](crate::Typeface) owns at most one stroker, created on first
/// use and reached through [`Typeface::with_stroker`](crate::Typeface::with_stroker).
/// The stroker keeps its scratch buffers between calls, so it must only be used
/// while the typeface lock is held.
pub struct Stroker {
    scratch: Scratch,
    radius: f32,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f32,
}

impl Stroker {
    pub(crate) fn new() -> Self {
        Self {
            scratch: Scratch::new(),
            radius: 0.0,
            cap: LineCap::default(),
            join: LineJoin::default(),
            miter_limit: 4.0,
        }
    }

    /// Sets the stroke parameters used by subsequent calls to [`Self::stroke`].
    ///
    /// `radius` is half the line width, in pixels. `miter_limit` is the ratio
    /// of miter length to line width beyond which miter joins are beveled.
    pub fn set(&mut self, radius: f32, cap: LineCap, join: LineJoin, miter_limit: f32) {
        self.radius = radius;
        self.cap = cap;
        self.join = join;
        self.miter_limit = miter_limit;
    }

    /// Sets the stroke parameters from a [`StrokeStyle`].
    pub fn set_style(&mut self, style: &StrokeStyle) {
        self.set(
            style.line_radius.to_f32(),
            style.line_cap,
            style.line_join,
            style.miter_limit.to_f32(),
        );
    }

    /// Returns the current stroke radius in pixels.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Strokes `outline` with the current parameters and renders the result to an
    /// alpha mask.
    ///
    /// Returns `None` if the outline is empty, the radius is not positive, the
    /// stroked shape could exceed [`MAX_STROKE_EXTENT`] in either direction or it
    /// covers no pixels.
    pub fn stroke(&mut self, outline: &GlyphOutline) -> Option<GlyphImage> {
        if outline.is_empty() || self.radius.is_nan() || self.radius <= 0.0 {
            return None;
        }
        // Miter joins reach up to `miter_limit` radii past the outline.
        let reach = 2.0 * self.radius * self.miter_limit.max(1.0);
        let (width, height) = extent(outline);
        let fits = width + reach <= MAX_STROKE_EXTENT && height + reach <= MAX_STROKE_EXTENT;
        if !fits {
            log::warn!(
                "stroke of a {width}x{height} px outline with radius {} exceeds the mask limit",
                self.radius
            );
            return None;
        }
        let mut stroke = Stroke::new(self.radius * 2.0);
        stroke
            .cap(zeno_cap(self.cap))
            .join(zeno_join(self.join))
            .miter_limit(self.miter_limit);
        let mut data = Vec::new();
        let placement = Mask::with_scratch((outline.points(), outline.verbs()), &mut self.scratch)
            .format(Format::Alpha)
            .origin(Origin::BottomLeft)
            .style(stroke)
            .inspect(|format, width, height| {
                data.resize(format.buffer_size(width, height), 0);
            })
            .render_into(&mut data, None);
        if placement.width == 0 || placement.height == 0 {
            return None;
        }
        Some(GlyphImage {
            format: PixelFormat::Alpha,
            left: placement.left,
            top: placement.top,
            width: placement.width,
            height: placement.height,
            data,
        })
    }
}

impl Debug for Stroker {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stroker")
            .field("radius", &self.radius)
            .field("cap", &self.cap)
            .field("join", &self.join)
            .field("miter_limit", &self.miter_limit)
            .finish_non_exhaustive()
    }
}

/// Width and height of the bounding box of the outline's points.
fn extent(outline: &GlyphOutline) -> (f32, f32) {
    let mut points = outline.points().iter();
    let Some(first) = points.next() else {
        return (0.0, 0.0);
    };
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (max.x - min.x, max.y - min.y)
}

fn zeno_cap(cap: LineCap) -> Cap {
    match cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    }
}

fn zeno_join(join: LineJoin) -> Join {
    match join {
        LineJoin::Round => Join::Round,
        LineJoin::Bevel => Join::Bevel,
        LineJoin::Miter => Join::Miter,
    }
}
