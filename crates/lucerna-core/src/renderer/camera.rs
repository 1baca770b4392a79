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

//! A simple look-at perspective camera.

use crate::math::{degrees_to_radians, Extent2D, Mat4, Spherical, Vec3};

/// A perspective camera looking from `eye` at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Camera position in world space.
    pub eye: Vec3,
    /// The point the camera looks at.
    pub target: Vec3,
    /// World up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// Viewport width over height.
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, -4.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: degrees_to_radians(45.0),
            near: 0.1,
            far: 100.0,
            aspect: 4.0 / 3.0,
        }
    }
}

impl Camera {
    /// Creates a camera with the default lens looking from `eye` at `target`.
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            ..Default::default()
        }
    }

    /// The world-to-view transform. Falls back to identity for degenerate
    /// eye/target pairs.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up).unwrap_or(Mat4::IDENTITY)
    }

    /// The view-to-clip transform.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_zo(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Updates the aspect ratio from a viewport size.
    pub fn set_viewport(&mut self, extent: Extent2D) {
        self.aspect = extent.aspect_ratio();
    }

    /// Orbits the eye around the target. `delta_zoom` scales the distance
    /// relatively, the angles are in radians.
    pub fn orbit(&mut self, delta_zoom: f32, delta_phi: f32, delta_theta: f32) {
        let mut s = Spherical::from_vec(self.eye - self.target);
        s.radius *= 1.0 + delta_zoom;
        s.phi += delta_phi;
        s.theta += delta_theta;
        s.restrict_phi();
        self.eye = self.target + s.to_vec();
    }

    /// Moves eye and target along the view's right and up axes.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let Some(world) = self.view_matrix().inverse() else {
            return;
        };
        let right = world.cols[0].truncate();
        let up = world.cols[1].truncate();
        let offset = right * delta_x - up * delta_y;
        self.eye += offset;
        self.target += offset;
    }

    /// Moves eye and target along the view's backward axis.
    pub fn forward(&mut self, delta_z: f32) {
        let Some(world) = self.view_matrix().inverse() else {
            return;
        };
        let offset = world.cols[2].truncate() * delta_z;
        self.eye += offset;
        self.target += offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::default();
        camera.orbit(0.0, 0.1, 0.3);
        assert_relative_eq!((camera.eye - camera.target).length(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_zoom_scales_distance() {
        let mut camera = Camera::default();
        camera.orbit(0.5, 0.0, 0.0);
        assert_relative_eq!((camera.eye - camera.target).length(), 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_pan_moves_eye_and_target_together() {
        let mut camera = Camera::default();
        let before = camera.eye - camera.target;
        camera.pan(1.0, 0.5);
        let after = camera.eye - camera.target;
        assert_relative_eq!(before.x, after.x, epsilon = 1e-5);
        assert_relative_eq!(before.z, after.z, epsilon = 1e-5);
        assert!(camera.target.length() > 0.5);
    }
}
