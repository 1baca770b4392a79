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

//! Debug billboards at every light position.

use super::{create_frame_groups, init_error, slot_group, LaneResources};
use crate::render_lane::shaders::LIGHT_PARTICLES_WGSL;
use lucerna_core::lane::{FrameContext, Lane, LaneError, LaneKind, LaneSetup};
use lucerna_core::renderer::{
    BindGroupId, BlendState, ColorTargetStateDescriptor, CompareFunction,
    DepthStencilStateDescriptor, GraphicsDevice, PrimitiveStateDescriptor, RenderPass,
    RenderPipelineDescriptor, RenderPipelineId,
};
use std::borrow::Cow;

/// Vertices per particle quad.
pub const PARTICLE_VERTICES: u32 = 6;

/// Draws one additive, camera-facing quad per light, tinted with the light's
/// color. Recorded after transparent geometry.
#[derive(Debug, Default)]
pub struct LightParticleLane {
    resources: LaneResources,
    pipeline: Option<RenderPipelineId>,
    frame_groups: Vec<BindGroupId>,
}

impl LightParticleLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `ctx.num_lights` quads. Nothing is drawn without lights.
    pub fn record(&self, pass: &mut dyn RenderPass, ctx: &FrameContext<'_>) -> Result<(), LaneError> {
        let pipeline = self.pipeline.ok_or(LaneError::NotInitialized)?;
        let frame = slot_group(&self.frame_groups, ctx.slot)?;
        if ctx.num_lights == 0 {
            return Ok(());
        }
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame);
        pass.draw(0..PARTICLE_VERTICES, 0..ctx.num_lights);
        Ok(())
    }
}

impl Lane for LightParticleLane {
    fn strategy_name(&self) -> &'static str {
        "LightParticles"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Debug
    }

    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError> {
        self.on_shutdown(device);
        let shader = self
            .resources
            .shader(device, "light_particles", LIGHT_PARTICLES_WGSL)
            .map_err(init_error)?;
        let (frame_layout, frame_groups) =
            create_frame_groups(&mut self.resources, device, "light_particles", setup)
                .map_err(init_error)?;
        let layout = self
            .resources
            .pipeline_layout(device, "light_particles layout", &[frame_layout])
            .map_err(init_error)?;
        let color_targets = [ColorTargetStateDescriptor {
            format: setup.surface_format,
            blend: Some(BlendState::ADDITIVE),
            write_enabled: true,
        }];
        let pipeline = self
            .resources
            .render_pipeline(
                device,
                &RenderPipelineDescriptor {
                    label: Some(Cow::Borrowed("light_particles")),
                    vertex_shader_module: shader,
                    vertex_entry_point: Cow::Borrowed("vs_particle"),
                    fragment_shader_module: Some(shader),
                    fragment_entry_point: Some(Cow::Borrowed("fs_particle")),
                    vertex_buffers_layout: Cow::Borrowed(&[]),
                    layout: Some(layout),
                    primitive_state: PrimitiveStateDescriptor::default(),
                    depth_stencil_state: Some(DepthStencilStateDescriptor {
                        format: setup.depth_format,
                        depth_write_enabled: false,
                        depth_compare: CompareFunction::LessEqual,
                    }),
                    color_target_states: Cow::Borrowed(&color_targets),
                },
            )
            .map_err(init_error)?;
        self.pipeline = Some(pipeline);
        self.frame_groups = frame_groups;
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        self.pipeline = None;
        self.frame_groups.clear();
        self.resources.release(device);
    }
}
