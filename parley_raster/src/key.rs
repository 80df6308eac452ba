// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keys identifying a rasterization configuration.
//!
//! A [`StrikeKey`] names a typeface at a pixel size and skew. [`ColorKey`] and
//! [`StrokeKey`] extend it with a foreground color and a stroke style. The
//! cache keeps one segment per distinct [`GlyphKey`].

use core::hash::{Hash, Hasher};

use hashbrown::Equivalent;

use crate::fixed::{F16Dot16, F26Dot6};
use crate::typeface::Typeface;

/// An 8-bit per channel RGBA color, not premultiplied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the channels as `[r, g, b, a]`.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Shape of the ends of open stroked contours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineCap {
    /// The stroke ends flush with the end point.
    #[default]
    Butt,
    /// The stroke ends with a half circle.
    Round,
    /// The stroke ends with a half square.
    Square,
}

/// Shape of the corners of stroked contours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineJoin {
    /// Corners are rounded.
    #[default]
    Round,
    /// Corners are cut off.
    Bevel,
    /// Corners are extended to a point, up to the miter limit.
    Miter,
}

/// Parameters of a stroke.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrokeStyle {
    /// Half the line width, in pixels.
    pub line_radius: F26Dot6,
    /// Shape of open contour ends.
    pub line_cap: LineCap,
    /// Shape of corners.
    pub line_join: LineJoin,
    /// Ratio of miter length to line width beyond which miter joins are beveled.
    pub miter_limit: F16Dot16,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            line_radius: F26Dot6::ONE,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: F16Dot16::from_bits(4 << 16),
        }
    }
}

/// A typeface at a pixel size and horizontal skew.
///
/// This is the key of glyph data (plain images, outlines and paths), and the
/// common prefix of [`ColorKey`] and [`StrokeKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrikeKey {
    typeface: Typeface,
    pixel_width: F26Dot6,
    pixel_height: F26Dot6,
    skew: F16Dot16,
}

impl StrikeKey {
    /// Creates a key for `typeface` at `size_px` pixels per em, unskewed.
    pub fn new(typeface: Typeface, size_px: f32) -> Self {
        let size = F26Dot6::from_f32(size_px);
        Self {
            typeface,
            pixel_width: size,
            pixel_height: size,
            skew: F16Dot16::ZERO,
        }
    }

    /// Sets a separate horizontal and vertical pixel size.
    ///
    /// A width different from the height stretches glyphs horizontally.
    #[must_use]
    pub fn with_pixel_size(mut self, width: f32, height: f32) -> Self {
        self.pixel_width = F26Dot6::from_f32(width);
        self.pixel_height = F26Dot6::from_f32(height);
        self
    }

    /// Sets the horizontal skew, as the x offset per unit of y.
    #[must_use]
    pub fn with_skew(mut self, skew: F16Dot16) -> Self {
        self.skew = skew;
        self
    }

    /// Replaces the typeface.
    pub fn set_typeface(&mut self, typeface: Typeface) {
        self.typeface = typeface;
    }

    /// Replaces the pixel size.
    pub fn set_pixel_size(&mut self, width: F26Dot6, height: F26Dot6) {
        self.pixel_width = width;
        self.pixel_height = height;
    }

    /// Replaces the skew.
    pub fn set_skew(&mut self, skew: F16Dot16) {
        self.skew = skew;
    }

    /// Returns the typeface.
    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Returns the horizontal pixel size.
    pub fn pixel_width(&self) -> F26Dot6 {
        self.pixel_width
    }

    /// Returns the vertical pixel size, which is the pixels per em.
    pub fn pixel_height(&self) -> F26Dot6 {
        self.pixel_height
    }

    /// Returns the horizontal skew.
    pub fn skew(&self) -> F16Dot16 {
        self.skew
    }
}

/// A strike rendered with color layers and a foreground color.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorKey {
    strike: StrikeKey,
    foreground: Rgba8,
}

impl ColorKey {
    /// Creates a key for `strike` with the given foreground color.
    pub fn new(strike: StrikeKey, foreground: Rgba8) -> Self {
        Self { strike, foreground }
    }

    /// Copies the strike fields from `strike`, keeping the foreground color.
    pub fn set_from(&mut self, strike: &StrikeKey) {
        self.strike.clone_from(strike);
    }

    /// Replaces the foreground color.
    pub fn set_foreground(&mut self, foreground: Rgba8) {
        self.foreground = foreground;
    }

    /// Returns the strike.
    pub fn strike(&self) -> &StrikeKey {
        &self.strike
    }

    /// Returns the foreground color, used for color layers that refer to it.
    pub fn foreground(&self) -> Rgba8 {
        self.foreground
    }
}

/// A strike whose outlines are stroked rather than filled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrokeKey {
    strike: StrikeKey,
    line_radius: F26Dot6,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: F16Dot16,
}

impl StrokeKey {
    /// Creates a key for `strike` stroked with `style`.
    pub fn new(strike: StrikeKey, style: StrokeStyle) -> Self {
        Self {
            strike,
            line_radius: style.line_radius,
            line_cap: style.line_cap,
            line_join: style.line_join,
            miter_limit: style.miter_limit,
        }
    }

    /// Copies the strike fields from `strike`, keeping the stroke style.
    pub fn set_from(&mut self, strike: &StrikeKey) {
        self.strike.clone_from(strike);
    }

    /// Replaces the line radius.
    pub fn set_line_radius(&mut self, line_radius: F26Dot6) {
        self.line_radius = line_radius;
    }

    /// Replaces the line cap.
    pub fn set_line_cap(&mut self, line_cap: LineCap) {
        self.line_cap = line_cap;
    }

    /// Replaces the line join.
    pub fn set_line_join(&mut self, line_join: LineJoin) {
        self.line_join = line_join;
    }

    /// Replaces the miter limit.
    pub fn set_miter_limit(&mut self, miter_limit: F16Dot16) {
        self.miter_limit = miter_limit;
    }

    /// Returns the strike.
    pub fn strike(&self) -> &StrikeKey {
        &self.strike
    }

    /// Returns the stroke style.
    pub fn style(&self) -> StrokeStyle {
        StrokeStyle {
            line_radius: self.line_radius,
            line_cap: self.line_cap,
            line_join: self.line_join,
            miter_limit: self.miter_limit,
        }
    }
}

/// Key of a cache segment.
///
/// Keys of different variants never compare equal, even when they share a
/// strike.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlyphKey {
    /// Plain glyph data: alpha masks, outlines and paths.
    Data(StrikeKey),
    /// Color glyph images.
    Color(ColorKey),
    /// Stroked glyph images.
    Stroke(StrokeKey),
}

impl GlyphKey {
    /// Returns the strike shared by all variants.
    pub fn strike(&self) -> &StrikeKey {
        match self {
            Self::Data(key) => key,
            Self::Color(key) => &key.strike,
            Self::Stroke(key) => &key.strike,
        }
    }

    pub(crate) fn as_key_ref(&self) -> GlyphKeyRef<'_> {
        match self {
            Self::Data(key) => GlyphKeyRef::Data(key),
            Self::Color(key) => GlyphKeyRef::Color(key),
            Self::Stroke(key) => GlyphKeyRef::Stroke(key),
        }
    }
}

impl Hash for GlyphKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `GlyphKeyRef` so that borrowed lookups find owned keys.
        self.as_key_ref().hash(state);
    }
}

impl From<StrikeKey> for GlyphKey {
    fn from(key: StrikeKey) -> Self {
        Self::Data(key)
    }
}

impl From<ColorKey> for GlyphKey {
    fn from(key: ColorKey) -> Self {
        Self::Color(key)
    }
}

impl From<StrokeKey> for GlyphKey {
    fn from(key: StrokeKey) -> Self {
        Self::Stroke(key)
    }
}

/// Borrowed form of [`GlyphKey`] for probing maps without cloning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum GlyphKeyRef<'a> {
    Data(&'a StrikeKey),
    Color(&'a ColorKey),
    Stroke(&'a StrokeKey),
}

impl<'a> GlyphKeyRef<'a> {
    pub(crate) fn strike(self) -> &'a StrikeKey {
        match self {
            Self::Data(key) => key,
            Self::Color(key) => &key.strike,
            Self::Stroke(key) => &key.strike,
        }
    }

    pub(crate) fn into_owned(self) -> GlyphKey {
        match self {
            Self::Data(key) => GlyphKey::Data(key.clone()),
            Self::Color(key) => GlyphKey::Color(key.clone()),
            Self::Stroke(key) => GlyphKey::Stroke(key.clone()),
        }
    }
}

impl Equivalent<GlyphKey> for GlyphKeyRef<'_> {
    fn equivalent(&self, key: &GlyphKey) -> bool {
        *self == key.as_key_ref()
    }
}
