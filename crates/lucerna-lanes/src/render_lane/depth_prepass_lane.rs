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

//! Depth-only pre-pass over opaque geometry.

use super::{bind_scene, create_frame_groups, draw_submeshes, init_error, slot_group, LaneResources};
use crate::render_lane::shaders::DEPTH_PREPASS_WGSL;
use lucerna_core::lane::{FrameContext, Lane, LaneError, LaneKind, LaneSetup};
use lucerna_core::renderer::{
    BindGroupId, CompareFunction, CullMode, DepthStencilStateDescriptor, GraphicsDevice,
    PrimitiveStateDescriptor, RenderPass, RenderPipelineDescriptor, RenderPipelineId, Vertex,
};
use std::borrow::Cow;

/// Writes the depth of opaque submeshes so that later passes only shade the
/// front-most surface.
#[derive(Debug, Default)]
pub struct DepthPrepassLane {
    resources: LaneResources,
    pipeline: Option<RenderPipelineId>,
    frame_groups: Vec<BindGroupId>,
}

impl DepthPrepassLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws every opaque submesh. Returns the number of draw calls.
    pub fn record(&self, pass: &mut dyn RenderPass, ctx: &FrameContext<'_>) -> Result<u32, LaneError> {
        let pipeline = self.pipeline.ok_or(LaneError::NotInitialized)?;
        let frame = slot_group(&self.frame_groups, ctx.slot)?;
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame);
        bind_scene(pass, ctx.scene);
        let opaque = ctx
            .scene
            .submeshes()
            .iter()
            .filter(|s| ctx.scene.is_opaque(s));
        Ok(draw_submeshes(pass, opaque))
    }
}

impl Lane for DepthPrepassLane {
    fn strategy_name(&self) -> &'static str {
        "DepthPrepass"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::DepthPrepass
    }

    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError> {
        self.on_shutdown(device);
        let shader = self
            .resources
            .shader(device, "depth_prepass", DEPTH_PREPASS_WGSL)
            .map_err(init_error)?;
        let (frame_layout, frame_groups) =
            create_frame_groups(&mut self.resources, device, "depth_prepass", setup)
                .map_err(init_error)?;
        let layout = self
            .resources
            .pipeline_layout(device, "depth_prepass layout", &[frame_layout])
            .map_err(init_error)?;
        let pipeline = self
            .resources
            .render_pipeline(
                device,
                &RenderPipelineDescriptor {
                    label: Some(Cow::Borrowed("depth_prepass")),
                    vertex_shader_module: shader,
                    vertex_entry_point: Cow::Borrowed("vs_geometry"),
                    fragment_shader_module: None,
                    fragment_entry_point: None,
                    vertex_buffers_layout: Cow::Owned(vec![Vertex::layout()]),
                    layout: Some(layout),
                    primitive_state: PrimitiveStateDescriptor {
                        cull_mode: Some(CullMode::Back),
                        ..Default::default()
                    },
                    depth_stencil_state: Some(DepthStencilStateDescriptor {
                        format: setup.depth_format,
                        depth_write_enabled: true,
                        depth_compare: CompareFunction::Less,
                    }),
                    color_target_states: Cow::Borrowed(&[]),
                },
            )
            .map_err(init_error)?;
        self.pipeline = Some(pipeline);
        self.frame_groups = frame_groups;
        log::debug!("DepthPrepassLane: initialized for {} frame slots", setup.frames.len());
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        self.pipeline = None;
        self.frame_groups.clear();
        self.resources.release(device);
    }
}
