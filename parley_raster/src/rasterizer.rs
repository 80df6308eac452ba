// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producing glyph images, outlines and paths for a strike.

use core::fmt::{Debug, Formatter};

use peniko::kurbo::{self, BezPath};
use swash::scale::image::{Content, Image};
use swash::scale::{Render, Source, StrikeWith};
use swash::zeno::{Format, Point, Transform};

use crate::fixed::F26Dot6;
use crate::glyph::{Glyph, GlyphId, GlyphImage, GlyphOutline, PixelFormat};
use crate::key::{Rgba8, StrikeKey, StrokeStyle};
use crate::typeface::Typeface;

const MASK_SOURCES: [Source; 2] = [Source::Outline, Source::Bitmap(StrikeWith::BestFit)];

const COLOR_SOURCES: [Source; 3] = [
    Source::ColorOutline(0),
    Source::ColorBitmap(StrikeWith::BestFit),
    Source::Outline,
];

/// Receives the segments of a glyph outline, one callback per segment.
///
/// Points are in pixel units with the y axis pointing up, as produced by the
/// scaler. See [`GlyphOutline::decompose`].
pub trait OutlineSink {
    /// Starts a new contour at `p`.
    fn move_to(&mut self, p: Point);
    /// Adds a straight segment to `p`.
    fn line_to(&mut self, p: Point);
    /// Adds a quadratic Bézier segment with control point `c`, ending at `p`.
    fn quad_to(&mut self, c: Point, p: Point);
    /// Adds a cubic Bézier segment with control points `c0` and `c1`, ending at `p`.
    fn curve_to(&mut self, c0: Point, c1: Point, p: Point);
    /// Closes the current contour.
    fn close(&mut self);
}

/// Collects outline segments into a [`BezPath`] with the y axis pointing down.
struct PathSink(BezPath);

impl PathSink {
    fn point(p: Point) -> kurbo::Point {
        kurbo::Point::new(f64::from(p.x), -f64::from(p.y))
    }
}

impl OutlineSink for PathSink {
    fn move_to(&mut self, p: Point) {
        self.0.move_to(Self::point(p));
    }

    fn line_to(&mut self, p: Point) {
        self.0.line_to(Self::point(p));
    }

    fn quad_to(&mut self, c: Point, p: Point) {
        self.0.quad_to(Self::point(c), Self::point(p));
    }

    fn curve_to(&mut self, c0: Point, c1: Point, p: Point) {
        self.0
            .curve_to(Self::point(c0), Self::point(c1), Self::point(p));
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

/// Converts an outline into a filled path with the y axis pointing down, the
/// convention of [`kurbo`] and most 2D renderers.
///
/// Returns `None` if the outline is empty or malformed.
pub fn outline_to_path(outline: &GlyphOutline) -> Option<BezPath> {
    if outline.is_empty() {
        return None;
    }
    let mut sink = PathSink(BezPath::new());
    outline.decompose(&mut sink).then_some(sink.0)
}

/// Produces the cached products of glyphs at one strike.
///
/// Each method computes its product from scratch; the
/// [`GlyphCache`](crate::GlyphCache) makes sure that, for a given key and glyph,
/// the result of at most one call survives. Failures yield `None` (or an empty
/// record) rather than an error: to a renderer they mean "nothing to draw".
pub trait GlyphRasterizer: Send + Sync {
    /// Renders the glyph as an alpha mask.
    fn make_image(&self, glyph_id: GlyphId) -> Option<GlyphImage>;

    /// Renders the glyph with its color layers or color bitmap, falling back to
    /// an alpha mask for glyphs that have neither.
    ///
    /// `foreground` is used for color layers that refer to the text color.
    fn make_color_image(&self, glyph_id: GlyphId, foreground: Rgba8) -> Option<GlyphImage>;

    /// Produces the scaled outline of the glyph.
    fn make_outline(&self, glyph_id: GlyphId) -> Option<GlyphOutline>;

    /// Produces the filled path of the glyph, with the y axis pointing down.
    fn make_path(&self, glyph_id: GlyphId) -> Option<BezPath> {
        outline_to_path(&self.make_outline(glyph_id)?)
    }

    /// Strokes the outline held by `base` and returns a record holding only
    /// the stroked image.
    ///
    /// Returns an empty record if `base` has no outline or stroking fails.
    fn make_stroked_glyph(&self, base: &Glyph, style: &StrokeStyle) -> Glyph;
}

/// Settings shared by all rasterizers created by [`TypefaceRasterizers`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RasterizerOptions {
    /// Whether to apply font hinting.
    ///
    /// Hinting is skipped for strikes that are stretched or skewed.
    pub hint: bool,
}

impl Default for RasterizerOptions {
    fn default() -> Self {
        Self { hint: true }
    }
}

/// Creates the rasterizer of a strike when its cache segment is first used.
pub trait RasterizerFactory {
    /// The rasterizer type.
    type Rasterizer: GlyphRasterizer;

    /// Creates a rasterizer bound to the strike described by `key`.
    fn create(&self, key: &StrikeKey) -> Self::Rasterizer;
}

/// The default [`RasterizerFactory`], creating a [`Rasterizer`] for the
/// typeface named by each key.
#[derive(Copy, Clone, Debug, Default)]
pub struct TypefaceRasterizers {
    options: RasterizerOptions,
}

impl TypefaceRasterizers {
    /// Creates a factory whose rasterizers use `options`.
    pub fn new(options: RasterizerOptions) -> Self {
        Self { options }
    }
}

impl RasterizerFactory for TypefaceRasterizers {
    type Rasterizer = Rasterizer;

    fn create(&self, key: &StrikeKey) -> Rasterizer {
        Rasterizer::new(key, self.options)
    }
}

/// A [`GlyphRasterizer`] backed by the scaler and renderer of a [`Typeface`].
///
/// The pixel height of the strike is used as the size in pixels per em. A pixel
/// width that differs from the height, and any skew, are applied as a transform
/// after scaling. A strike whose pixel width or height rounds to zero or below
/// has nothing to draw.
#[derive(Clone)]
pub struct Rasterizer {
    typeface: Typeface,
    size: Option<f32>,
    transform: Option<Transform>,
    hint: bool,
}

impl Rasterizer {
    /// Creates a rasterizer for the strike described by `key`.
    pub fn new(key: &StrikeKey, options: RasterizerOptions) -> Self {
        let (width, height) = (key.pixel_width(), key.pixel_height());
        // swash scales nothing at size zero and would render in design units.
        let size =
            (width > F26Dot6::ZERO && height > F26Dot6::ZERO).then(|| height.to_f32());
        let x_scale = size.map_or(1.0, |size| width.to_f32() / size);
        let skew = key.skew().to_f32();
        let transform = (x_scale != 1.0 || skew != 0.0)
            .then(|| Transform::new(x_scale, 0.0, skew, 1.0, 0.0, 0.0));
        Self {
            typeface: key.typeface().clone(),
            size,
            hint: options.hint && transform.is_none(),
            transform,
        }
    }

    /// Returns the typeface.
    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Returns the size in pixels per em, or `None` for an empty strike.
    pub fn size(&self) -> Option<f32> {
        self.size
    }

    fn render(&self, glyph_id: GlyphId, sources: &[Source], color: Rgba8) -> Option<GlyphImage> {
        let size = self.size?;
        let image = self.typeface.with_face(|face| {
            let mut scaler = face.scaler(size, self.hint);
            Render::new(sources)
                .format(Format::Alpha)
                .transform(self.transform)
                .default_color(color.to_array())
                .render(&mut scaler, glyph_id)
        })?;
        convert_image(glyph_id, image)
    }
}

fn convert_image(glyph_id: GlyphId, image: Image) -> Option<GlyphImage> {
    let format = match image.content {
        Content::Mask => PixelFormat::Alpha,
        Content::Color => PixelFormat::Rgba,
        Content::SubpixelMask => {
            log::warn!("glyph {glyph_id}: subpixel masks are not supported");
            return None;
        }
    };
    let placement = image.placement;
    if placement.width == 0 || placement.height == 0 {
        return None;
    }
    Some(GlyphImage {
        format,
        left: placement.left,
        top: placement.top,
        width: placement.width,
        height: placement.height,
        data: image.data,
    })
}

impl GlyphRasterizer for Rasterizer {
    fn make_image(&self, glyph_id: GlyphId) -> Option<GlyphImage> {
        self.render(glyph_id, &MASK_SOURCES, Rgba8::BLACK)
    }

    fn make_color_image(&self, glyph_id: GlyphId, foreground: Rgba8) -> Option<GlyphImage> {
        self.render(glyph_id, &COLOR_SOURCES, foreground)
    }

    fn make_outline(&self, glyph_id: GlyphId) -> Option<GlyphOutline> {
        let size = self.size?;
        self.typeface.with_face(|face| {
            let mut outline = face
                .scaler(size, self.hint)
                .scale_outline(glyph_id)?;
            if outline.verbs().is_empty() {
                return None;
            }
            if let Some(transform) = &self.transform {
                outline.transform(transform);
            }
            Some(GlyphOutline::new(
                outline.points().to_vec(),
                outline.verbs().to_vec(),
            ))
        })
    }

    fn make_stroked_glyph(&self, base: &Glyph, style: &StrokeStyle) -> Glyph {
        let Some(outline) = base.outline() else {
            return Glyph::with_image(base.id(), None);
        };
        let image = self.typeface.with_stroker(|_, stroker| {
            stroker.set_style(style);
            stroker.stroke(outline)
        });
        if image.is_none() {
            log::warn!("glyph {}: stroking produced no coverage", base.id());
        }
        Glyph::with_image(base.id(), image)
    }
}

impl Debug for Rasterizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("typeface", &self.typeface)
            .field("size", &self.size)
            .field("transform", &self.transform.is_some())
            .field("hint", &self.hint)
            .finish()
    }
}
