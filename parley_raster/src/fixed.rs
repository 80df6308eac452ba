// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-point numbers used to key rasterization configurations.
//!
//! Keys store sizes and transforms in fixed point so that they hash and compare
//! exactly. Sizes use the 26.6 format (1/64th of a pixel); ratios such as skew
//! and miter limits use the 16.16 format.

#![allow(
    clippy::cast_possible_truncation,
    reason = "Values are rounded and saturated before narrowing to i32."
)]

use core::fmt::{Debug, Formatter};

/// A signed 26.6 fixed-point number, typically a length in pixels.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct F26Dot6(i32);

impl F26Dot6 {
    /// The value zero.
    pub const ZERO: Self = Self(0);
    /// The value one.
    pub const ONE: Self = Self(1 << 6);

    /// Creates a value from its raw bit representation.
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit representation.
    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Creates a value from an integer number of pixels.
    #[inline]
    pub const fn from_i32(value: i32) -> Self {
        Self(value.saturating_mul(64))
    }

    /// Converts a floating-point value, rounding to the nearest 1/64th.
    ///
    /// Non-finite inputs saturate; NaN maps to zero.
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        Self((value * 64.0).round() as i32)
    }

    /// Converts to floating point.
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 64.0
    }

    /// Rounds to the nearest whole pixel.
    #[inline]
    pub const fn round(self) -> Self {
        Self(self.0.saturating_add(32) & !63)
    }

    /// Rounds down to a whole pixel.
    #[inline]
    pub const fn floor(self) -> Self {
        Self(self.0 & !63)
    }

    /// Rounds up to a whole pixel.
    #[inline]
    pub const fn ceil(self) -> Self {
        Self(self.0.saturating_add(63) & !63)
    }
}

impl Debug for F26Dot6 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

/// A signed 16.16 fixed-point number, typically a ratio or a matrix coefficient.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct F16Dot16(i32);

impl F16Dot16 {
    /// The value zero.
    pub const ZERO: Self = Self(0);
    /// The value one.
    pub const ONE: Self = Self(1 << 16);

    /// Creates a value from its raw bit representation.
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit representation.
    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Converts a floating-point value, rounding to the nearest 1/65536th.
    ///
    /// Non-finite inputs saturate; NaN maps to zero.
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        Self((f64::from(value) * 65536.0).round() as i32)
    }

    /// Converts to floating point.
    #[inline]
    pub fn to_f32(self) -> f32 {
        (f64::from(self.0) / 65536.0) as f32
    }
}

impl Debug for F16Dot16 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f26dot6_conversions() {
        assert_eq!(F26Dot6::from_f32(1.0).to_bits(), 64);
        assert_eq!(F26Dot6::from_f32(12.5).to_bits(), 800);
        assert_eq!(F26Dot6::from_f32(-0.5).to_bits(), -32);
        assert_eq!(F26Dot6::from_i32(3), F26Dot6::from_bits(192));
        assert_eq!(F26Dot6::from_bits(800).to_f32(), 12.5);
        // 1/128 is exactly halfway between two steps and rounds away from zero.
        assert_eq!(F26Dot6::from_f32(1.0 / 128.0).to_bits(), 1);
    }

    #[test]
    fn f26dot6_rounding() {
        let value = F26Dot6::from_f32(2.25);
        assert_eq!(value.floor(), F26Dot6::from_i32(2));
        assert_eq!(value.ceil(), F26Dot6::from_i32(3));
        assert_eq!(value.round(), F26Dot6::from_i32(2));
        assert_eq!(F26Dot6::from_f32(2.5).round(), F26Dot6::from_i32(3));
        assert_eq!(F26Dot6::from_f32(-1.25).floor(), F26Dot6::from_i32(-2));
        assert_eq!(F26Dot6::from_i32(4).ceil(), F26Dot6::from_i32(4));
    }

    #[test]
    fn f16dot16_conversions() {
        assert_eq!(F16Dot16::from_f32(1.0), F16Dot16::ONE);
        assert_eq!(F16Dot16::from_f32(0.25).to_bits(), 0x4000);
        assert_eq!(F16Dot16::from_f32(-0.5).to_bits(), -0x8000);
        assert_eq!(F16Dot16::from_bits(0x3000).to_f32(), 0.1875);
    }

    #[test]
    fn non_finite_values_saturate() {
        assert_eq!(F26Dot6::from_f32(f32::NAN), F26Dot6::ZERO);
        assert_eq!(F26Dot6::from_f32(f32::INFINITY).to_bits(), i32::MAX);
        assert_eq!(F16Dot16::from_f32(f32::NEG_INFINITY).to_bits(), i32::MIN);
    }
}
