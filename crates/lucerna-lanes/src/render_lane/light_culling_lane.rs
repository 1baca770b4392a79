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

//! GPU light culling: the three light-list stages as compute dispatches.
//!
//! The stages share one frame bind group and one cluster bind group and run
//! in separate compute passes:
//!
//! | Stage | Entry point       | Dispatch                                   |
//! |-------|-------------------|--------------------------------------------|
//! | A     | `compute_flags`   | `ceil(lights / 32)` x 1 x 1                |
//! | B     | `compute_offsets` | `ceil(tiles_x / 16)` x `ceil(tiles_y / 16)` x slices |
//! | C     | `compute_list`    | `ceil(lights / 32)` x 1 x 1                |
//!
//! A full storage barrier separates A from B and B from C. The cluster
//! buffers must be zero when stage A starts, apart from the visibility bits
//! written by the clustering pass; the scheduler clears them after shading.

use super::{create_frame_groups, init_error, slot_group, LaneResources};
use crate::render_lane::shaders::LIGHT_CULLING_WGSL;
use lucerna_core::lane::{FrameContext, Lane, LaneError, LaneKind, LaneSetup};
use lucerna_core::renderer::{
    BindGroupEntry, BindGroupId, BindGroupLayoutEntry, ClusterGrid, CommandEncoder,
    ComputePassDescriptor, ComputePipelineDescriptor, ComputePipelineId, GpuStage,
    GraphicsDevice, MemoryBarrier, ShaderStageFlags,
};
use std::borrow::Cow;

/// Invocations per workgroup of the per-light stages.
pub const LIGHT_WORKGROUP_SIZE: u32 = 32;

/// Tiles per workgroup side of the per-cluster stage.
pub const CLUSTER_WORKGROUP_SIZE: u32 = 16;

/// Workgroups needed for one invocation per light.
pub fn light_workgroups(num_lights: u32) -> u32 {
    if num_lights == 0 {
        0
    } else {
        (num_lights - 1) / LIGHT_WORKGROUP_SIZE + 1
    }
}

/// Workgroups needed for one invocation per cluster.
pub fn cluster_workgroups(grid: &ClusterGrid) -> (u32, u32, u32) {
    (
        (grid.tile_count_x() - 1) / CLUSTER_WORKGROUP_SIZE + 1,
        (grid.tile_count_y() - 1) / CLUSTER_WORKGROUP_SIZE + 1,
        grid.depth_slices(),
    )
}

#[derive(Debug, Clone, Copy)]
struct CullingPipelines {
    flags: ComputePipelineId,
    offsets: ComputePipelineId,
    list: ComputePipelineId,
}

/// Builds the per-cluster light lists on the GPU.
#[derive(Debug, Default)]
pub struct LightCullingLane {
    resources: LaneResources,
    pipelines: Option<CullingPipelines>,
    frame_groups: Vec<BindGroupId>,
    cluster_groups: Vec<BindGroupId>,
}

impl LightCullingLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records stages A, B and C with barriers in between.
    ///
    /// With no lights the passes are still opened so their timestamps stay
    /// valid, but stages A and C dispatch nothing and the index list is left
    /// untouched.
    pub fn record(
        &self,
        encoder: &mut dyn CommandEncoder,
        ctx: &FrameContext<'_>,
    ) -> Result<(), LaneError> {
        let pipelines = self.pipelines.ok_or(LaneError::NotInitialized)?;
        let frame = slot_group(&self.frame_groups, ctx.slot)?;
        let cluster = slot_group(&self.cluster_groups, ctx.slot)?;
        let light_groups = light_workgroups(ctx.num_lights);
        let (cx, cy, cz) = cluster_workgroups(ctx.grid);

        let stages = [
            (GpuStage::ComputeFlags, pipelines.flags, (light_groups, 1, 1)),
            (GpuStage::ComputeOffsets, pipelines.offsets, (cx, cy, cz)),
            (GpuStage::ComputeList, pipelines.list, (light_groups, 1, 1)),
        ];
        for (i, (stage, pipeline, (x, y, z))) in stages.into_iter().enumerate() {
            if i > 0 {
                encoder.memory_barrier(MemoryBarrier::SHADER_TO_SHADER);
            }
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some(stage.label()),
                timestamp_writes: ctx.timestamps.map(|t| t.writes(stage)),
            });
            if x == 0 {
                continue;
            }
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, frame);
            pass.set_bind_group(1, cluster);
            pass.dispatch_workgroups(x, y, z);
        }
        Ok(())
    }
}

impl Lane for LightCullingLane {
    fn strategy_name(&self) -> &'static str {
        "LightCulling"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::LightCulling
    }

    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError> {
        self.on_shutdown(device);
        let shader = self
            .resources
            .shader(device, "light_culling", LIGHT_CULLING_WGSL)
            .map_err(init_error)?;
        let (frame_layout, frame_groups) =
            create_frame_groups(&mut self.resources, device, "light_culling", setup)
                .map_err(init_error)?;

        let entries: Vec<BindGroupLayoutEntry> = (0..7)
            .map(|binding| BindGroupLayoutEntry::storage(binding, ShaderStageFlags::COMPUTE, false))
            .collect();
        let cluster_layout = self
            .resources
            .bind_group_layout(device, "light_culling cluster layout", &entries)
            .map_err(init_error)?;
        let cluster_groups = self
            .resources
            .slot_bind_groups(device, "light_culling cluster", cluster_layout, setup.frames, |f| {
                f.cluster
                    .all()
                    .iter()
                    .enumerate()
                    .map(|(binding, buffer)| BindGroupEntry::buffer(binding as u32, *buffer))
                    .collect()
            })
            .map_err(init_error)?;

        let layout = self
            .resources
            .pipeline_layout(device, "light_culling layout", &[frame_layout, cluster_layout])
            .map_err(init_error)?;
        let mut create = |entry_point: &'static str| {
            self.resources
                .compute_pipeline(
                    device,
                    &ComputePipelineDescriptor {
                        label: Some(Cow::Borrowed(entry_point)),
                        layout: Some(layout),
                        shader_module: shader,
                        entry_point: Cow::Borrowed(entry_point),
                    },
                )
                .map_err(init_error)
        };
        let pipelines = CullingPipelines {
            flags: create("compute_flags")?,
            offsets: create("compute_offsets")?,
            list: create("compute_list")?,
        };
        self.pipelines = Some(pipelines);
        self.frame_groups = frame_groups;
        self.cluster_groups = cluster_groups;
        log::debug!(
            "LightCullingLane: initialized for {} frame slots, {} lights max",
            setup.frames.len(),
            setup.config.max_lights
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
