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

//! Spherical coordinates, used to orbit lights and the camera around a pivot.

use super::vector::Vec3;
use super::{EPSILON, PI};

/// A point in spherical coordinates.
///
/// `phi` is the polar angle measured from the `-Y` axis and `theta` the azimuth
/// in the XZ plane, measured from `+X` towards `-Z`.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Spherical {
    /// Distance from the origin.
    pub radius: f32,
    /// Polar angle in radians, in `[0, PI]`.
    pub phi: f32,
    /// Azimuthal angle in radians.
    pub theta: f32,
}

impl Spherical {
    /// Creates new spherical coordinates.
    #[inline]
    pub const fn new(radius: f32, phi: f32, theta: f32) -> Self {
        Self { radius, phi, theta }
    }

    /// Converts a cartesian vector to spherical coordinates.
    ///
    /// A zero vector yields all-zero coordinates.
    pub fn from_vec(v: Vec3) -> Self {
        let radius = v.length();
        if radius < EPSILON {
            return Self::default();
        }
        let phi = (-v.y / radius).clamp(-1.0, 1.0).acos();
        let theta = if v.x == 0.0 && v.z == 0.0 {
            0.0
        } else {
            (-v.z).atan2(v.x)
        };
        Self { radius, phi, theta }
    }

    /// Converts back to a cartesian vector.
    pub fn to_vec(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * cos_theta,
            -self.radius * cos_phi,
            -self.radius * sin_phi * sin_theta,
        )
    }

    /// Keeps `phi` strictly away from the poles so a look-at basis stays defined.
    pub fn restrict_phi(&mut self) {
        self.phi = self.phi.clamp(EPSILON, PI - EPSILON);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_through_cartesian() {
        let v = Vec3::new(1.0, 2.0, -3.0);
        let back = Spherical::from_vec(v).to_vec();
        assert_relative_eq!(back.x, v.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-4);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-4);
    }

    #[test]
    fn test_zero_vector() {
        assert_eq!(Spherical::from_vec(Vec3::ZERO), Spherical::default());
    }

    #[test]
    fn test_restrict_phi() {
        let mut s = Spherical::new(1.0, 0.0, 0.0);
        s.restrict_phi();
        assert!(s.phi > 0.0);
        s.phi = PI;
        s.restrict_phi();
        assert!(s.phi < PI);
    }
}
