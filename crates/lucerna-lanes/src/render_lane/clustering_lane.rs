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

//! Marks the clusters that contain visible fragments.

use super::{bind_scene, create_frame_groups, draw_submeshes, init_error, slot_group, LaneResources};
use crate::render_lane::shaders::CLUSTERING_WGSL;
use lucerna_core::lane::{FrameContext, Lane, LaneError, LaneKind, LaneSetup};
use lucerna_core::renderer::{
    BindGroupEntry, BindGroupId, BindGroupLayoutEntry, CompareFunction, CullMode,
    DepthStencilStateDescriptor, GraphicsDevice, PrimitiveStateDescriptor, RenderPass,
    RenderPipelineDescriptor, RenderPipelineId, ShaderStageFlags, Vertex,
};
use std::borrow::Cow;

/// Re-draws the scene against the pre-pass depth buffer and sets
/// [`ClusterFlags::VISIBLE`](lucerna_core::renderer::ClusterFlags::VISIBLE)
/// for the cluster of every fragment that survives the depth test.
///
/// Depth is read-only here. Opaque fragments pass where they match the stored
/// depth and transparent ones where they lie in front of it, so the light
/// culling stages only count clusters something is actually drawn in.
#[derive(Debug, Default)]
pub struct ClusteringLane {
    resources: LaneResources,
    pipeline: Option<RenderPipelineId>,
    frame_groups: Vec<BindGroupId>,
    cluster_groups: Vec<BindGroupId>,
}

impl ClusteringLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws opaque then transparent submeshes. Returns the number of draw calls.
    pub fn record(&self, pass: &mut dyn RenderPass, ctx: &FrameContext<'_>) -> Result<u32, LaneError> {
        let pipeline = self.pipeline.ok_or(LaneError::NotInitialized)?;
        let frame = slot_group(&self.frame_groups, ctx.slot)?;
        let cluster = slot_group(&self.cluster_groups, ctx.slot)?;
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame);
        pass.set_bind_group(1, cluster);
        bind_scene(pass, ctx.scene);

        let scene = ctx.scene;
        let submeshes = scene.submeshes();
        let mut draws = draw_submeshes(pass, submeshes.iter().filter(|s| scene.is_opaque(s)));
        draws += draw_submeshes(pass, submeshes.iter().filter(|s| !scene.is_opaque(s)));
        Ok(draws)
    }
}

impl Lane for ClusteringLane {
    fn strategy_name(&self) -> &'static str {
        "Clustering"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Clustering
    }

    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError> {
        self.on_shutdown(device);
        let shader = self
            .resources
            .shader(device, "clustering", CLUSTERING_WGSL)
            .map_err(init_error)?;
        let (frame_layout, frame_groups) =
            create_frame_groups(&mut self.resources, device, "clustering", setup)
                .map_err(init_error)?;
        let cluster_layout = self
            .resources
            .bind_group_layout(
                device,
                "clustering cluster layout",
                &[BindGroupLayoutEntry::storage(0, ShaderStageFlags::FRAGMENT, false)],
            )
            .map_err(init_error)?;
        let cluster_groups = self
            .resources
            .slot_bind_groups(device, "clustering flags", cluster_layout, setup.frames, |f| {
                vec![BindGroupEntry::buffer(0, f.cluster.flags)]
            })
            .map_err(init_error)?;
        let layout = self
            .resources
            .pipeline_layout(device, "clustering layout", &[frame_layout, cluster_layout])
            .map_err(init_error)?;
        let pipeline = self
            .resources
            .render_pipeline(
                device,
                &RenderPipelineDescriptor {
                    label: Some(Cow::Borrowed("clustering")),
                    vertex_shader_module: shader,
                    vertex_entry_point: Cow::Borrowed("vs_geometry"),
                    fragment_shader_module: Some(shader),
                    fragment_entry_point: Some(Cow::Borrowed("fs_clustering")),
                    vertex_buffers_layout: Cow::Owned(vec![Vertex::layout()]),
                    layout: Some(layout),
                    primitive_state: PrimitiveStateDescriptor {
                        cull_mode: Some(CullMode::Back),
                        ..Default::default()
                    },
                    depth_stencil_state: Some(DepthStencilStateDescriptor {
                        format: setup.depth_format,
                        depth_write_enabled: false,
                        depth_compare: CompareFunction::LessEqual,
                    }),
                    color_target_states: Cow::Borrowed(&[]),
                },
            )
            .map_err(init_error)?;
        self.pipeline = Some(pipeline);
        self.frame_groups = frame_groups;
        self.cluster_groups = cluster_groups;
        log::debug!("ClusteringLane: initialized for {} frame slots", setup.frames.len());
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        self.pipeline = None;
        self.frame_groups.clear();
        self.cluster_groups.clear();
        self.resources.release(device);
    }
}
