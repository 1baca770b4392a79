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

//! A small, `f32`-based linear algebra library covering what the renderer needs:
//! vectors, column-major 4x4 matrices, axis-aligned boxes, spherical coordinates
//! and colors.

/// A small constant used for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// Multiplicative factor to convert degrees to radians.
pub const DEG_TO_RAD: f32 = PI / 180.0;

pub mod color;
pub mod dimension;
pub mod geometry;
pub mod matrix;
pub mod spherical;
pub mod vector;

pub use self::color::{LinearRgba, Rgba8};
pub use self::dimension::{Extent2D, Extent3D};
pub use self::geometry::Aabb;
pub use self::matrix::Mat4;
pub use self::spherical::Spherical;
pub use self::vector::{Vec3, Vec4};

/// Converts an angle from degrees to radians.
#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * DEG_TO_RAD
}

/// Checks if two floats are approximately equal within [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
