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

//! Rendering lanes: the GPU passes of a clustered frame.
//!
//! Each lane owns its pipelines and one bind group per frame slot. Passes are
//! opened by the frame scheduler, which hands the open [`RenderPass`] to
//! [`DepthPrepassLane`], [`ClusteringLane`], [`ForwardShadingLane`] and
//! [`LightParticleLane`]. [`LightCullingLane`] records its three compute
//! passes itself because it places barriers between them.
//!
//! Bind group 0 is the same for every lane (frame uniforms, lights,
//! materials); bind group 1 holds the cluster buffers with the access the
//! lane needs.

mod clustering_lane;
mod depth_prepass_lane;
mod forward_shading_lane;
mod light_culling_lane;
mod light_particle_lane;
mod resources;
pub mod shaders;

pub use clustering_lane::*;
pub use depth_prepass_lane::*;
pub use forward_shading_lane::*;
pub use light_culling_lane::*;
pub use light_particle_lane::*;
pub use resources::LaneResources;

use lucerna_core::lane::{LaneError, LaneSetup};
use lucerna_core::renderer::{
    BindGroupEntry, BindGroupId, BindGroupLayoutId, GraphicsDevice, RenderPass, ResourceError,
    SceneSource, SubMesh,
};

pub(crate) fn init_error(e: ResourceError) -> LaneError {
    LaneError::InitializationFailed(Box::new(e))
}

pub(crate) fn slot_group(groups: &[BindGroupId], slot: usize) -> Result<BindGroupId, LaneError> {
    groups
        .get(slot)
        .copied()
        .ok_or(LaneError::UnknownFrameSlot(slot))
}

/// Creates the frame layout (group 0) and one frame bind group per slot.
pub(crate) fn create_frame_groups(
    resources: &mut LaneResources,
    device: &dyn GraphicsDevice,
    label: &str,
    setup: &LaneSetup<'_>,
) -> Result<(BindGroupLayoutId, Vec<BindGroupId>), ResourceError> {
    let layout = resources.bind_group_layout(
        device,
        &format!("{label} frame layout"),
        &resources::frame_layout_entries(),
    )?;
    let materials = setup.scene.material_buffer;
    let groups = resources.slot_bind_groups(
        device,
        &format!("{label} frame"),
        layout,
        setup.frames,
        |frame| {
            vec![
                BindGroupEntry::buffer(0, frame.uniforms),
                BindGroupEntry::buffer(1, frame.lights),
                BindGroupEntry::buffer(2, materials),
            ]
        },
    )?;
    Ok((layout, groups))
}

/// Binds the scene's vertex and index buffers to an open pass.
pub(crate) fn bind_scene(pass: &mut dyn RenderPass, scene: &dyn SceneSource) {
    let buffers = scene.buffers();
    pass.set_vertex_buffer(0, buffers.vertex_buffer, 0);
    pass.set_index_buffer(buffers.index_buffer, 0, buffers.index_format);
}

/// Issues one indexed draw per submesh. The material index travels as the
/// instance index.
pub(crate) fn draw_submeshes<'a>(
    pass: &mut dyn RenderPass,
    submeshes: impl Iterator<Item = &'a SubMesh>,
) -> u32 {
    let mut draws = 0;
    for submesh in submeshes {
        pass.draw_indexed(
            submesh.index_start..submesh.index_start + submesh.index_count,
            submesh.base_vertex,
            submesh.material..submesh.material + 1,
        );
        draws += 1;
    }
    draws
}
