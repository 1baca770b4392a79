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

//! Point lights and the procedurally generated light field.

use crate::math::{Aabb, LinearRgba, Rgba8, Spherical, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Azimuth advanced by every light on each update, in radians.
pub const ORBIT_STEP: f32 = 0.001;

/// A point light with a hard influence radius.
///
/// Every light orbits a fixed center on a sphere; [`PointLight::update`]
/// advances it along that orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Light color. Alpha is unused.
    pub color: Rgba8,
    /// Radius of influence.
    pub range: f32,
    /// Center of the orbit.
    pub center: Vec3,
}

impl PointLight {
    /// Creates a light orbiting the world origin.
    pub fn new(position: Vec3, color: Rgba8, range: f32) -> Self {
        Self {
            position,
            color,
            range,
            center: Vec3::ZERO,
        }
    }

    /// Advances the light along its orbit, keeping radius and polar angle.
    pub fn update(&mut self) {
        let mut s = Spherical::from_vec(self.position - self.center);
        s.theta += ORBIT_STEP;
        s.restrict_phi();
        self.position = self.center + s.to_vec();
    }

    /// The GPU representation of the light.
    pub fn to_gpu(&self) -> GpuPointLight {
        GpuPointLight {
            position_range: [self.position.x, self.position.y, self.position.z, self.range],
            color: u32::from_le_bytes([self.color.r, self.color.g, self.color.b, self.color.a]),
            _pad: [0; 3],
        }
    }
}

/// A light as stored in the GPU light buffer.
///
/// The color is packed as four unorm bytes, read with `unpack4x8unorm`.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuPointLight {
    /// World position in `xyz`, range in `w`.
    pub position_range: [f32; 4],
    /// Packed RGBA8 color.
    pub color: u32,
    /// Keeps the stride at 32 bytes.
    pub _pad: [u32; 3],
}

/// A set of randomly placed, randomly colored lights scaled to a scene.
#[derive(Debug)]
pub struct LightField {
    lights: Vec<PointLight>,
    scene_bounds: Aabb,
    rng: SmallRng,
}

impl LightField {
    /// Generates `count` lights for a scene with the given bounds.
    ///
    /// Ranges are drawn from `[base / 1.5, base * 3]` where `base` is the edge
    /// of a cube with the scene volume divided by the light count. Positions
    /// are uniform inside the cube enclosing the scene's largest half extent.
    pub fn generate(count: usize, scene_bounds: Aabb, seed: u64) -> Self {
        let mut field = Self {
            lights: Vec::with_capacity(count),
            scene_bounds,
            rng: SmallRng::seed_from_u64(seed),
        };
        field.regenerate(count);
        field
    }

    /// Replaces every light with `count` fresh ones.
    pub fn regenerate(&mut self, count: usize) {
        self.lights.clear();
        if count == 0 {
            return;
        }
        let light_volume = self.scene_bounds.volume() / count as f32;
        let base_range = light_volume.cbrt();
        let min_range = base_range / 1.5;
        let max_range = base_range * 3.0;
        let pos_radius = self.scene_bounds.half_extents().max_element().max(0.0);

        for _ in 0..count {
            let range = self.rng.gen_range(min_range..=max_range);
            let color = LinearRgba::from_hue(self.rng.gen_range(0.0..1.0))
                .scale_bias(1.3, -0.15)
                .with_alpha(0.0);
            let position = Vec3::new(
                self.rng.gen_range(-pos_radius..=pos_radius),
                self.rng.gen_range(-pos_radius..=pos_radius),
                self.rng.gen_range(-pos_radius..=pos_radius),
            );
            self.lights
                .push(PointLight::new(position, Rgba8::from_linear(color), range));
        }
        log::debug!(
            "LightField: generated {} lights, range {:.3}..{:.3}",
            count,
            min_range,
            max_range
        );
    }

    /// Advances every light along its orbit.
    pub fn update(&mut self) {
        self.lights.iter_mut().for_each(PointLight::update);
    }

    /// The current lights.
    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Number of lights.
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Returns `true` if the field has no light.
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Writes the GPU representation of every light into `out`.
    pub fn write_gpu(&self, out: &mut Vec<GpuPointLight>) {
        out.clear();
        out.extend(self.lights.iter().map(PointLight::to_gpu));
    }
}
