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

//! Provides the column-major [`Mat4`] type used for view, projection and model
//! transforms.

use super::vector::{Vec3, Vec4};
use super::EPSILON;
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// The memory layout matches what WGSL expects for a `mat4x4<f32>`, so the
/// value can be copied straight into a uniform buffer via
/// [`Mat4::to_cols_array_2d`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix.
    #[inline]
    pub fn row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::from_vec3(v, 1.0))
    }

    /// Creates a non-uniform scale matrix.
    #[inline]
    pub fn from_scale(s: Vec3) -> Self {
        Self::from_cols(
            Vec4::new(s.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z, 0.0),
            Vec4::W,
        )
    }

    /// Creates a right-handed perspective projection with a `[0, 1]` depth range.
    ///
    /// # Arguments
    ///
    /// * `fov_y_radians`: Vertical field of view in radians.
    /// * `aspect_ratio`: Width divided by height of the viewport.
    /// * `z_near`: Distance to the near clipping plane (positive).
    /// * `z_far`: Distance to the far clipping plane (greater than `z_near`).
    #[inline]
    pub fn perspective_rh_zo(fov_y_radians: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let f = 1.0 / (fov_y_radians / 2.0).tan();
        let range_inv = 1.0 / (z_near - z_far);
        Self::from_cols(
            Vec4::new(f / aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, z_far * range_inv, -1.0),
            Vec4::new(0.0, 0.0, z_near * z_far * range_inv, 0.0),
        )
    }

    /// Creates a right-handed view matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` if `eye` and `target` coincide or if `up` is parallel to
    /// the view direction.
    #[inline]
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let forward = target - eye;
        if forward.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let f = forward.normalize();
        let s = f.cross(up);
        if s.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let s = s.normalize();
        let u = s.cross(f);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-eye.dot(s), -eye.dot(u), eye.dot(f), 1.0),
        ))
    }

    /// Returns the transpose of the matrix.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2), self.row(3))
    }

    /// Computes the inverse, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let m: [[f32; 4]; 4] = self.to_cols_array_2d();
        let a2323 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let a1323 = m[1][2] * m[3][3] - m[3][2] * m[1][3];
        let a1223 = m[1][2] * m[2][3] - m[2][2] * m[1][3];
        let a0323 = m[0][2] * m[3][3] - m[3][2] * m[0][3];
        let a0223 = m[0][2] * m[2][3] - m[2][2] * m[0][3];
        let a0123 = m[0][2] * m[1][3] - m[1][2] * m[0][3];
        let a2313 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let a1313 = m[1][1] * m[3][3] - m[3][1] * m[1][3];
        let a1213 = m[1][1] * m[2][3] - m[2][1] * m[1][3];
        let a2312 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let a1312 = m[1][1] * m[3][2] - m[3][1] * m[1][2];
        let a1212 = m[1][1] * m[2][2] - m[2][1] * m[1][2];
        let a0313 = m[0][1] * m[3][3] - m[3][1] * m[0][3];
        let a0213 = m[0][1] * m[2][3] - m[2][1] * m[0][3];
        let a0312 = m[0][1] * m[3][2] - m[3][1] * m[0][2];
        let a0212 = m[0][1] * m[2][2] - m[2][1] * m[0][2];
        let a0113 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let a0112 = m[0][1] * m[1][2] - m[1][1] * m[0][2];

        let det = m[0][0] * (m[1][1] * a2323 - m[2][1] * a1323 + m[3][1] * a1223)
            - m[1][0] * (m[0][1] * a2323 - m[2][1] * a0323 + m[3][1] * a0223)
            + m[2][0] * (m[0][1] * a1323 - m[1][1] * a0323 + m[3][1] * a0123)
            - m[3][0] * (m[0][1] * a1223 - m[1][1] * a0223 + m[2][1] * a0123);
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        let r = [
            [
                inv * (m[1][1] * a2323 - m[2][1] * a1323 + m[3][1] * a1223),
                inv * -(m[0][1] * a2323 - m[2][1] * a0323 + m[3][1] * a0223),
                inv * (m[0][1] * a1323 - m[1][1] * a0323 + m[3][1] * a0123),
                inv * -(m[0][1] * a1223 - m[1][1] * a0223 + m[2][1] * a0123),
            ],
            [
                inv * -(m[1][0] * a2323 - m[2][0] * a1323 + m[3][0] * a1223),
                inv * (m[0][0] * a2323 - m[2][0] * a0323 + m[3][0] * a0223),
                inv * -(m[0][0] * a1323 - m[1][0] * a0323 + m[3][0] * a0123),
                inv * (m[0][0] * a1223 - m[1][0] * a0223 + m[2][0] * a0123),
            ],
            [
                inv * (m[1][0] * a2313 - m[2][0] * a1313 + m[3][0] * a1213),
                inv * -(m[0][0] * a2313 - m[2][0] * a0313 + m[3][0] * a0213),
                inv * (m[0][0] * a1313 - m[1][0] * a0313 + m[3][0] * a0113),
                inv * -(m[0][0] * a1213 - m[1][0] * a0213 + m[2][0] * a0113),
            ],
            [
                inv * -(m[1][0] * a2312 - m[2][0] * a1312 + m[3][0] * a1212),
                inv * (m[0][0] * a2312 - m[2][0] * a0312 + m[3][0] * a0212),
                inv * -(m[0][0] * a1312 - m[1][0] * a0312 + m[3][0] * a0112),
                inv * (m[0][0] * a1212 - m[1][0] * a0212 + m[2][0] * a0112),
            ],
        ];
        Some(Self::from_cols_array_2d(&r))
    }

    /// Transforms a point (w = 1) and returns the `xyz` part without the
    /// perspective divide.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        (*self * Vec4::from_vec3(p, 1.0)).truncate()
    }

    /// Builds a matrix from a column-major 2D array.
    #[inline]
    pub fn from_cols_array_2d(m: &[[f32; 4]; 4]) -> Self {
        Self::from_cols(
            Vec4::new(m[0][0], m[0][1], m[0][2], m[0][3]),
            Vec4::new(m[1][0], m[1][1], m[1][2], m[1][3]),
            Vec4::new(m[2][0], m[2][1], m[2][2], m[2][3]),
            Vec4::new(m[3][0], m[3][1], m[3][2], m[3][3]),
        )
    }

    /// Returns the matrix as a column-major 2D array, ready for GPU upload.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        [
            self.cols[0].to_array(),
            self.cols[1].to_array(),
            self.cols[2].to_array(),
            self.cols[3].to_array(),
        ]
    }
}

impl Default for Mat4 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self {
        Self::from_cols(
            self * rhs.cols[0],
            self * rhs.cols[1],
            self * rhs.cols[2],
            self * rhs.cols[3],
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    fn mat_approx_eq(a: &Mat4, b: &Mat4) -> bool {
        a.to_cols_array_2d()
            .iter()
            .flatten()
            .zip(b.to_cols_array_2d().iter().flatten())
            .all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_translation_moves_points() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.transform_point(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_inverse_of_view_matrix() {
        let view = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        let inv = view.inverse().unwrap();
        assert!(mat_approx_eq(&(view * inv), &Mat4::IDENTITY));
        // Camera origin in world space is the eye position.
        let eye = inv.transform_point(Vec3::ZERO);
        assert!(approx_eq(eye.x, 3.0) && approx_eq(eye.y, 4.0) && approx_eq(eye.z, 5.0));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_rh_zo(1.0, 1.0, 0.5, 50.0);
        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -50.0, 1.0);
        assert!(approx_eq(near.z / near.w, 0.0));
        assert!(approx_eq(far.z / far.w, 1.0));
    }

    #[test]
    fn test_look_at_degenerate_inputs() {
        assert!(Mat4::look_at_rh(Vec3::ONE, Vec3::ONE, Vec3::Y).is_none());
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
    }
}
