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

//! Bookkeeping for the GPU objects a lane creates.

use lucerna_core::lane::FrameBindings;
use lucerna_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindGroupLayoutId, ComputePipelineDescriptor, ComputePipelineId,
    GraphicsDevice, PipelineLayoutDescriptor, PipelineLayoutId,
    RenderPipelineDescriptor, RenderPipelineId, ResourceError, ShaderModuleDescriptor,
    ShaderModuleId, ShaderStageFlags,
};

/// Every object a lane created, released together on shutdown.
#[derive(Debug, Default)]
pub struct LaneResources {
    shaders: Vec<ShaderModuleId>,
    bind_group_layouts: Vec<BindGroupLayoutId>,
    bind_groups: Vec<BindGroupId>,
    pipeline_layouts: Vec<PipelineLayoutId>,
    render_pipelines: Vec<RenderPipelineId>,
    compute_pipelines: Vec<ComputePipelineId>,
}

impl LaneResources {
    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
            && self.bind_group_layouts.is_empty()
            && self.bind_groups.is_empty()
            && self.pipeline_layouts.is_empty()
            && self.render_pipelines.is_empty()
            && self.compute_pipelines.is_empty()
    }

    pub(crate) fn shader(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        source: &str,
    ) -> Result<ShaderModuleId, ResourceError> {
        let id = device.create_shader_module(&ShaderModuleDescriptor::wgsl(label, source))?;
        self.shaders.push(id);
        Ok(id)
    }

    pub(crate) fn bind_group_layout(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let id = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(label),
            entries,
        })?;
        self.bind_group_layouts.push(id);
        Ok(id)
    }

    pub(crate) fn bind_group(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        layout: BindGroupLayoutId,
        entries: &[BindGroupEntry],
    ) -> Result<BindGroupId, ResourceError> {
        let id = device.create_bind_group(&BindGroupDescriptor {
            label: Some(label),
            layout,
            entries,
        })?;
        self.bind_groups.push(id);
        Ok(id)
    }

    pub(crate) fn pipeline_layout(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        bind_group_layouts: &[BindGroupLayoutId],
    ) -> Result<PipelineLayoutId, ResourceError> {
        let id = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
        })?;
        self.pipeline_layouts.push(id);
        Ok(id)
    }

    pub(crate) fn render_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        descriptor: &RenderPipelineDescriptor<'_>,
    ) -> Result<RenderPipelineId, ResourceError> {
        let id = device.create_render_pipeline(descriptor)?;
        self.render_pipelines.push(id);
        Ok(id)
    }

    pub(crate) fn compute_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Result<ComputePipelineId, ResourceError> {
        let id = device.create_compute_pipeline(descriptor)?;
        self.compute_pipelines.push(id);
        Ok(id)
    }

    /// Creates one bind group per frame slot with the same layout.
    pub(crate) fn slot_bind_groups(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        layout: BindGroupLayoutId,
        frames: &[FrameBindings],
        entries_for: impl Fn(&FrameBindings) -> Vec<BindGroupEntry>,
    ) -> Result<Vec<BindGroupId>, ResourceError> {
        frames
            .iter()
            .enumerate()
            .map(|(slot, frame)| {
                let entries = entries_for(frame);
                self.bind_group(device, &format!("{label} slot {slot}"), layout, &entries)
            })
            .collect()
    }

    /// Destroys everything in reverse creation order. Failures are logged and
    /// do not stop the teardown.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        let mut failures = 0usize;
        let mut check = |result: Result<(), ResourceError>| {
            if let Err(e) = result {
                log::warn!("LaneResources: failed to release a GPU object: {}", e);
                failures += 1;
            }
        };
        for id in self.compute_pipelines.drain(..).rev() {
            check(device.destroy_compute_pipeline(id));
        }
        for id in self.render_pipelines.drain(..).rev() {
            check(device.destroy_render_pipeline(id));
        }
        for id in self.pipeline_layouts.drain(..).rev() {
            check(device.destroy_pipeline_layout(id));
        }
        for id in self.bind_groups.drain(..).rev() {
            check(device.destroy_bind_group(id));
        }
        for id in self.bind_group_layouts.drain(..).rev() {
            check(device.destroy_bind_group_layout(id));
        }
        for id in self.shaders.drain(..).rev() {
            check(device.destroy_shader_module(id));
        }
        if failures > 0 {
            log::warn!("LaneResources: {} objects could not be released", failures);
        }
    }
}

/// Layout of bind group 0: frame uniforms, lights and materials.
pub(crate) fn frame_layout_entries() -> [BindGroupLayoutEntry; 3] {
    let all = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT | ShaderStageFlags::COMPUTE;
    [
        BindGroupLayoutEntry::uniform(0, all),
        BindGroupLayoutEntry::storage(1, all, true),
        // Compute stages already use their full storage binding budget.
        BindGroupLayoutEntry::storage(2, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT, true),
    ]
}
