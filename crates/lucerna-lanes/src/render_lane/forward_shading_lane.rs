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

//! Forward shading with per-cluster light lists.

use super::{bind_scene, create_frame_groups, draw_submeshes, init_error, slot_group, LaneResources};
use crate::render_lane::shaders::FORWARD_SHADING_WGSL;
use lucerna_core::lane::{FrameContext, Lane, LaneError, LaneKind, LaneSetup};
use lucerna_core::renderer::{
    BindGroupEntry, BindGroupId, BindGroupLayoutEntry, BlendState, ColorTargetStateDescriptor,
    CompareFunction, CullMode, DepthStencilStateDescriptor, GraphicsDevice, PipelineLayoutId,
    PrimitiveStateDescriptor, RenderPass, RenderPipelineDescriptor, RenderPipelineId,
    ShaderModuleId, ShaderStageFlags, Vertex,
};
use std::borrow::Cow;

/// Number of draws issued by one [`ForwardShadingLane::record`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadingDraws {
    /// Opaque submeshes drawn.
    pub opaque: u32,
    /// Transparent submeshes drawn.
    pub transparent: u32,
}

#[derive(Debug, Clone, Copy)]
struct ShadingPipelines {
    opaque: RenderPipelineId,
    transparent: RenderPipelineId,
}

/// Shades geometry with the lights of each fragment's cluster.
///
/// Opaque submeshes are drawn first with an `Equal` depth test against the
/// pre-pass depth, so each pixel is shaded once. Transparent submeshes follow
/// with alpha blending and no depth writes.
#[derive(Debug, Default)]
pub struct ForwardShadingLane {
    resources: LaneResources,
    pipelines: Option<ShadingPipelines>,
    frame_groups: Vec<BindGroupId>,
    cluster_groups: Vec<BindGroupId>,
}

impl ForwardShadingLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws opaque then transparent submeshes into an open pass.
    pub fn record(
        &self,
        pass: &mut dyn RenderPass,
        ctx: &FrameContext<'_>,
    ) -> Result<ShadingDraws, LaneError> {
        let pipelines = self.pipelines.ok_or(LaneError::NotInitialized)?;
        let frame = slot_group(&self.frame_groups, ctx.slot)?;
        let cluster = slot_group(&self.cluster_groups, ctx.slot)?;
        let scene = ctx.scene;
        let submeshes = scene.submeshes();

        pass.set_bind_group(0, frame);
        pass.set_bind_group(1, cluster);
        bind_scene(pass, scene);

        pass.set_pipeline(pipelines.opaque);
        let opaque = draw_submeshes(pass, submeshes.iter().filter(|s| scene.is_opaque(s)));
        pass.set_pipeline(pipelines.transparent);
        let transparent = draw_submeshes(pass, submeshes.iter().filter(|s| !scene.is_opaque(s)));
        Ok(ShadingDraws { opaque, transparent })
    }

    fn create_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        shader: ShaderModuleId,
        layout: PipelineLayoutId,
        setup: &LaneSetup<'_>,
        transparent: bool,
    ) -> Result<RenderPipelineId, LaneError> {
        let (label, blend, depth_compare) = if transparent {
            (
                "forward_shading transparent",
                Some(BlendState::ALPHA_BLENDING),
                CompareFunction::LessEqual,
            )
        } else {
            ("forward_shading opaque", None, CompareFunction::Equal)
        };
        let color_targets = [ColorTargetStateDescriptor {
            format: setup.surface_format,
            blend,
            write_enabled: true,
        }];
        self.resources
            .render_pipeline(
                device,
                &RenderPipelineDescriptor {
                    label: Some(Cow::Borrowed(label)),
                    vertex_shader_module: shader,
                    vertex_entry_point: Cow::Borrowed("vs_geometry"),
                    fragment_shader_module: Some(shader),
                    fragment_entry_point: Some(Cow::Borrowed("fs_forward")),
                    vertex_buffers_layout: Cow::Owned(vec![Vertex::layout()]),
                    layout: Some(layout),
                    primitive_state: PrimitiveStateDescriptor {
                        cull_mode: Some(CullMode::Back),
                        ..Default::default()
                    },
                    depth_stencil_state: Some(DepthStencilStateDescriptor {
                        format: setup.depth_format,
                        depth_write_enabled: false,
                        depth_compare,
                    }),
                    color_target_states: Cow::Borrowed(&color_targets),
                },
            )
            .map_err(init_error)
    }
}

impl Lane for ForwardShadingLane {
    fn strategy_name(&self) -> &'static str {
        "ClusteredForward"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Shading
    }

    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError> {
        self.on_shutdown(device);
        if setup.surface_format.is_depth() {
            return Err(LaneError::InitializationFailed(
                format!("cannot shade into depth format {:?}", setup.surface_format).into(),
            ));
        }
        let shader = self
            .resources
            .shader(device, "forward_shading", FORWARD_SHADING_WGSL)
            .map_err(init_error)?;
        let (frame_layout, frame_groups) =
            create_frame_groups(&mut self.resources, device, "forward_shading", setup)
                .map_err(init_error)?;
        let cluster_layout = self
            .resources
            .bind_group_layout(
                device,
                "forward_shading cluster layout",
                &[
                    BindGroupLayoutEntry::storage(0, ShaderStageFlags::FRAGMENT, true),
                    BindGroupLayoutEntry::storage(1, ShaderStageFlags::FRAGMENT, true),
                    BindGroupLayoutEntry::storage(2, ShaderStageFlags::FRAGMENT, true),
                ],
            )
            .map_err(init_error)?;
        let cluster_groups = self
            .resources
            .slot_bind_groups(
                device,
                "forward_shading cluster",
                cluster_layout,
                setup.frames,
                |f| {
                    vec![
                        BindGroupEntry::buffer(0, f.cluster.counts),
                        BindGroupEntry::buffer(1, f.cluster.offsets),
                        BindGroupEntry::buffer(2, f.cluster.light_list),
                    ]
                },
            )
            .map_err(init_error)?;
        let layout = self
            .resources
            .pipeline_layout(device, "forward_shading layout", &[frame_layout, cluster_layout])
            .map_err(init_error)?;
        let opaque = self.create_pipeline(device, shader, layout, setup, false)?;
        let transparent = self.create_pipeline(device, shader, layout, setup, true)?;
        self.pipelines = Some(ShadingPipelines {
            opaque,
            transparent,
        });
        self.frame_groups = frame_groups;
        self.cluster_groups = cluster_groups;
        log::debug!(
            "ForwardShadingLane: initialized for {:?} with {} frame slots",
            setup.surface_format,
            setup.frames.len()
        );
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        self.pipelines = None;
        self.frame_groups.clear();
        self.cluster_groups.clear();
        self.resources.release(device);
    }
}
