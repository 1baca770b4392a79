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

//! The scene collaborator: indexed triangle geometry split into submeshes,
//! each referencing one material.

use super::api::*;
use super::error::ResourceError;
use super::GraphicsDevice;
use crate::math::{Aabb, Mat4, Vec3};
use std::borrow::Cow;

/// A vertex as stored in the scene's vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Model-space position.
    pub position: [f32; 3],
    /// Model-space normal.
    pub normal: [f32; 3],
}

const VERTEX_ATTRIBUTES: [VertexAttributeDescriptor; 2] = [
    VertexAttributeDescriptor {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttributeDescriptor {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
];

impl Vertex {
    /// Creates a vertex.
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Vertex buffer layout matching the scene shaders' inputs.
    pub fn layout() -> VertexBufferLayoutDescriptor<'static> {
        VertexBufferLayoutDescriptor {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Borrowed(&VERTEX_ATTRIBUTES),
        }
    }
}

/// A material as stored in the scene's material buffer.
///
/// A material with `base_color[3] == 1.0` is opaque; anything else is drawn
/// in the transparent pass.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuMaterial {
    /// Diffuse color with alpha.
    pub base_color: [f32; 4],
}

impl GpuMaterial {
    /// Returns `true` if the material is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.base_color[3] >= 1.0
    }
}

/// A contiguous range of indices drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// First index in the index buffer.
    pub index_start: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Value added to every index.
    pub base_vertex: i32,
    /// Index into the material buffer.
    pub material: u32,
}

/// GPU buffers of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBuffers {
    /// Vertex buffer of [`Vertex`] elements.
    pub vertex_buffer: BufferId,
    /// Index buffer.
    pub index_buffer: BufferId,
    /// Format of the index buffer.
    pub index_format: IndexFormat,
    /// Storage buffer of [`GpuMaterial`] elements.
    pub material_buffer: BufferId,
}

/// Supplies the geometry the render lanes draw.
///
/// The material index of a submesh is passed to the shaders as the instance
/// index of its draw call.
pub trait SceneSource: Send + Sync {
    /// The scene's GPU buffers.
    fn buffers(&self) -> SceneBuffers;

    /// Every submesh, in draw order.
    fn submeshes(&self) -> &[SubMesh];

    /// Whether the submesh's material is opaque.
    fn is_opaque(&self, submesh: &SubMesh) -> bool;

    /// World-space bounds of the scene.
    fn bounds(&self) -> Aabb;

    /// Model-to-world transform of the scene.
    fn model_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    /// Releases the scene's GPU buffers. Called once, after the device is idle.
    fn release(&self, _device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// A scene built from in-memory geometry and uploaded once.
#[derive(Debug)]
pub struct MeshScene {
    buffers: SceneBuffers,
    submeshes: Vec<SubMesh>,
    materials: Vec<GpuMaterial>,
    bounds: Aabb,
}

impl MeshScene {
    /// Uploads geometry and materials to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::OutOfBounds`] if a submesh references a
    /// missing material or index range, or any buffer creation error.
    pub fn upload(
        device: &dyn GraphicsDevice,
        vertices: &[Vertex],
        indices: &[u32],
        submeshes: Vec<SubMesh>,
        materials: Vec<GpuMaterial>,
    ) -> Result<Self, ResourceError> {
        for sm in &submeshes {
            if sm.material as usize >= materials.len()
                || (sm.index_start + sm.index_count) as usize > indices.len()
            {
                return Err(ResourceError::OutOfBounds);
            }
        }
        let positions: Vec<Vec3> = vertices
            .iter()
            .map(|v| Vec3::new(v.position[0], v.position[1], v.position[2]))
            .collect();
        let bounds = Aabb::from_points(&positions).ok_or(ResourceError::OutOfBounds)?;

        let vertex_buffer = device.create_buffer_with_data(
            &BufferDescriptor::new(
                "scene_vertices",
                std::mem::size_of_val(vertices) as u64,
                BufferUsage::VERTEX | BufferUsage::COPY_DST,
            ),
            bytemuck::cast_slice(vertices),
        )?;
        let index_buffer = device.create_buffer_with_data(
            &BufferDescriptor::new(
                "scene_indices",
                std::mem::size_of_val(indices) as u64,
                BufferUsage::INDEX | BufferUsage::COPY_DST,
            ),
            bytemuck::cast_slice(indices),
        )?;
        let material_buffer = device.create_buffer_with_data(
            &BufferDescriptor::new(
                "scene_materials",
                std::mem::size_of_val(materials.as_slice()) as u64,
                BufferUsage::STORAGE | BufferUsage::COPY_DST,
            ),
            bytemuck::cast_slice(&materials),
        )?;

        log::info!(
            "MeshScene: uploaded {} vertices, {} indices, {} submeshes",
            vertices.len(),
            indices.len(),
            submeshes.len()
        );

        Ok(Self {
            buffers: SceneBuffers {
                vertex_buffer,
                index_buffer,
                index_format: IndexFormat::Uint32,
                material_buffer,
            },
            submeshes,
            materials,
            bounds,
        })
    }
}

impl SceneSource for MeshScene {
    fn buffers(&self) -> SceneBuffers {
        self.buffers
    }

    fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    fn is_opaque(&self, submesh: &SubMesh) -> bool {
        self.materials
            .get(submesh.material as usize)
            .is_some_and(GpuMaterial::is_opaque)
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn release(&self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        device.destroy_buffer(self.buffers.vertex_buffer)?;
        device.destroy_buffer(self.buffers.index_buffer)?;
        device.destroy_buffer(self.buffers.material_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn test_material_opacity() {
        assert!(GpuMaterial {
            base_color: [1.0, 0.0, 0.0, 1.0]
        }
        .is_opaque());
        assert!(!GpuMaterial {
            base_color: [1.0, 0.0, 0.0, 0.5]
        }
        .is_opaque());
    }
}
