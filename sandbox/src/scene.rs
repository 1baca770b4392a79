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

//! The procedural demo scene: a floor with a grid of pillars, some of them
//! made of glass.

use lucerna_core::math::Vec3;
use lucerna_core::renderer::{
    GpuMaterial, GraphicsDevice, MeshScene, ResourceError, SubMesh, Vertex,
};

const FLOOR_HALF_SIZE: f32 = 20.0;
const PILLARS_PER_SIDE: u32 = 7;
const PILLAR_HALF_WIDTH: f32 = 0.8;

/// Accumulates boxes into one vertex/index stream, one submesh per box.
#[derive(Debug, Default)]
struct SceneBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    submeshes: Vec<SubMesh>,
    materials: Vec<GpuMaterial>,
}

impl SceneBuilder {
    fn add_box(&mut self, center: Vec3, half: Vec3, base_color: [f32; 4]) {
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::new(-1.0, 0.0, 0.0), Vec3::Y, Vec3::new(0.0, 0.0, -1.0)),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::new(0.0, -1.0, 0.0), Vec3::Z, Vec3::new(-1.0, 0.0, 0.0)),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::new(0.0, 0.0, -1.0), Vec3::X, Vec3::new(0.0, -1.0, 0.0)),
        ];
        let index_start = self.indices.len() as u32;
        for (normal, u, v) in faces {
            let base = self.vertices.len() as u32;
            let face_center = center + scale(normal, half);
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = face_center + scale(u * su, half) + scale(v * sv, half);
                self.vertices.push(Vertex::new(position, normal));
            }
            // u x v == normal, so this winding is counter-clockwise seen from outside.
            self.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        self.submeshes.push(SubMesh {
            index_start,
            index_count: self.indices.len() as u32 - index_start,
            base_vertex: 0,
            material: self.materials.len() as u32,
        });
        self.materials.push(GpuMaterial { base_color });
    }

    fn upload(self, device: &dyn GraphicsDevice) -> Result<MeshScene, ResourceError> {
        MeshScene::upload(
            device,
            &self.vertices,
            &self.indices,
            self.submeshes,
            self.materials,
        )
    }
}

fn scale(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x * b.x, a.y * b.y, a.z * b.z)
}

/// Height of the pillar at grid cell `(i, j)`, between 1 and 8 units.
fn pillar_height(i: u32, j: u32) -> f32 {
    1.0 + ((i * 7 + j * 13) % 8) as f32
}

/// Builds and uploads the demo scene.
pub fn build_scene(device: &dyn GraphicsDevice) -> Result<MeshScene, ResourceError> {
    let mut builder = SceneBuilder::default();
    builder.add_box(
        Vec3::new(0.0, -0.1, 0.0),
        Vec3::new(FLOOR_HALF_SIZE, 0.1, FLOOR_HALF_SIZE),
        [0.8, 0.8, 0.8, 1.0],
    );

    let spacing = 2.0 * FLOOR_HALF_SIZE / PILLARS_PER_SIDE as f32;
    for i in 0..PILLARS_PER_SIDE {
        for j in 0..PILLARS_PER_SIDE {
            let x = -FLOOR_HALF_SIZE + spacing * (i as f32 + 0.5);
            let z = -FLOOR_HALF_SIZE + spacing * (j as f32 + 0.5);
            let height = pillar_height(i, j);
            let glass = (i + j) % 5 == 0;
            let color = if glass {
                [0.6, 0.8, 1.0, 0.35]
            } else {
                let cells = (PILLARS_PER_SIDE * PILLARS_PER_SIDE) as f32;
                let t = (i * PILLARS_PER_SIDE + j) as f32 / cells;
                [0.9 - 0.4 * t, 0.7, 0.5 + 0.4 * t, 1.0]
            };
            builder.add_box(
                Vec3::new(x, height * 0.5, z),
                Vec3::new(PILLAR_HALF_WIDTH, height * 0.5, PILLAR_HALF_WIDTH),
                color,
            );
        }
    }
    builder.upload(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_faces_point_outwards() {
        let mut builder = SceneBuilder::default();
        builder.add_box(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        assert_eq!(builder.vertices.len(), 24);
        assert_eq!(builder.indices.len(), 36);
        for vertex in &builder.vertices {
            let p = Vec3::new(vertex.position[0], vertex.position[1], vertex.position[2]);
            let n = Vec3::new(vertex.normal[0], vertex.normal[1], vertex.normal[2]);
            assert!((p.x * n.x + p.y * n.y + p.z * n.z - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_every_box_is_its_own_submesh() {
        let mut builder = SceneBuilder::default();
        builder.add_box(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        builder.add_box(Vec3::X, Vec3::ONE, [1.0, 1.0, 1.0, 0.5]);
        assert_eq!(builder.submeshes[1].index_start, 36);
        assert_eq!(builder.submeshes[1].material, 1);
        assert!(!builder.materials[1].is_opaque());
    }

    #[test]
    fn test_pillar_heights_stay_in_range() {
        for i in 0..PILLARS_PER_SIDE {
            for j in 0..PILLARS_PER_SIDE {
                assert!((1.0..=8.0).contains(&pillar_height(i, j)));
            }
        }
    }
}
