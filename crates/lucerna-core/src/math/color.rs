// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Color types: [`LinearRgba`] for shading math and [`Rgba8`] for packed GPU data.

use std::ops::{Add, Mul};

/// A color in linear RGBA space with `f32` components.
///
/// Values may exceed `1.0` for HDR intensities.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component in linear space.
    pub r: f32,
    /// The green component in linear space.
    pub g: f32,
    /// The blue component in linear space.
    pub b: f32,
    /// The alpha component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new color with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a new opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Builds a fully saturated color from a hue in `[0, 1)`.
    ///
    /// The hue wheel is made of overlapping linear ramps; values outside the
    /// range wrap around.
    pub fn from_hue(hue: f32) -> Self {
        let s = hue.rem_euclid(1.0) * 6.0;
        let ramp = |v: f32| v.clamp(0.0, 1.0);
        let r = ramp(s - 4.0) + ramp(2.0 - s);
        let g = ramp(s) * ramp(4.0 - s);
        let b = ramp(s - 2.0) * ramp(6.0 - s);
        Self::rgb(r, g, b)
    }

    /// Applies `c * scale + bias` to the RGB components, leaving alpha unchanged.
    #[inline]
    pub fn scale_bias(self, scale: f32, bias: f32) -> Self {
        Self::new(
            self.r * scale + bias,
            self.g * scale + bias,
            self.b * scale + bias,
            self.a,
        )
    }

    /// Returns the color with a different alpha.
    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Converts the color to a `[r, g, b, a]` array.
    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for LinearRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Add for LinearRgba {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Mul<f32> for LinearRgba {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

/// A color packed as four unsigned normalized bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Rgba8 {
    /// Red byte.
    pub r: u8,
    /// Green byte.
    pub g: u8,
    /// Blue byte.
    pub b: u8,
    /// Alpha byte.
    pub a: u8,
}

impl Rgba8 {
    /// Creates a new packed color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Quantizes a linear color, clamping every channel to `[0, 1]` first.
    pub fn from_linear(c: LinearRgba) -> Self {
        fn unorm(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Self::new(unorm(c.r), unorm(c.g), unorm(c.b), unorm(c.a))
    }

    /// Expands the packed color back to floating point.
    pub fn to_linear(self) -> LinearRgba {
        LinearRgba::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hue_primaries() {
        assert_eq!(LinearRgba::from_hue(0.0), LinearRgba::rgb(1.0, 0.0, 0.0));
        let green = LinearRgba::from_hue(1.0 / 3.0);
        assert_relative_eq!(green.g, 1.0, epsilon = 1e-5);
        assert_relative_eq!(green.r, 0.0, epsilon = 1e-5);
        let blue = LinearRgba::from_hue(2.0 / 3.0);
        assert_relative_eq!(blue.b, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_hue_wraps() {
        assert_eq!(LinearRgba::from_hue(1.25), LinearRgba::from_hue(0.25));
    }

    #[test]
    fn test_unorm_quantization_clamps() {
        let c = LinearRgba::new(1.3, -0.15, 0.5, 0.0);
        assert_eq!(Rgba8::from_linear(c), Rgba8::new(255, 0, 128, 0));
    }
}
