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

use lucerna_core::renderer::traits::{CommandEncoder, ComputePass, RenderPass};
use lucerna_core::renderer::{
    AccessFlags, BindGroupId, BufferId, CommandBufferId, ComputePassDescriptor,
    ComputePipelineId, IndexFormat, MemoryBarrier, PassTimestampWrites, QuerySetId,
    RenderPassDescriptor, RenderPipelineId,
};
use std::ops::Range;
use std::sync::Arc;

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

pub struct WgpuRenderPass<'a> {
    pub(crate) pass: wgpu::RenderPass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl RenderPass for WgpuRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline_id: RenderPipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_render_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!("WgpuRenderPass: RenderPipelineId {pipeline_id:?} not found.");
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuRenderPass: BindGroupId {bind_group_id:?} not found.");
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer_id: BufferId, offset: u64) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer_id) {
            self.pass.set_vertex_buffer(slot, buffer.slice(offset..));
        } else {
            log::warn!("WgpuRenderPass: Vertex BufferId {buffer_id:?} not found.");
        }
    }

    fn set_index_buffer(&mut self, buffer_id: BufferId, offset: u64, index_format: IndexFormat) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer_id) {
            self.pass
                .set_index_buffer(buffer.slice(offset..), index_format.into_wgpu());
        } else {
            log::warn!("WgpuRenderPass: Index BufferId {buffer_id:?} not found.");
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}

pub struct WgpuComputePass<'a> {
    pub(crate) pass: wgpu::ComputePass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl ComputePass for WgpuComputePass<'_> {
    fn set_pipeline(&mut self, pipeline_id: ComputePipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_compute_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!("WgpuComputePass: ComputePipelineId {pipeline_id:?} not found.");
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuComputePass: BindGroupId {bind_group_id:?} not found.");
        }
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.pass.dispatch_workgroups(x, y, z);
    }
}

/// Records commands into a `wgpu::CommandEncoder`, resolving abstract IDs
/// through the device registries.
pub struct WgpuCommandEncoder {
    encoder: wgpu::CommandEncoder,
    device: WgpuDevice,
}

impl WgpuCommandEncoder {
    pub(crate) fn new(encoder: wgpu::CommandEncoder, device: WgpuDevice) -> Self {
        Self { encoder, device }
    }

    fn query_set_for(&self, writes: &Option<PassTimestampWrites>) -> Option<Arc<wgpu::QuerySet>> {
        let writes = writes.as_ref()?;
        let query_set = self.device.get_wgpu_query_set(writes.query_set);
        if query_set.is_none() {
            log::warn!(
                "WgpuCommandEncoder: QuerySetId {:?} not found, timestamps skipped.",
                writes.query_set
            );
        }
        query_set
    }
}

/// Human-readable marker for a barrier, shown in GPU captures.
fn barrier_marker(barrier: &MemoryBarrier) -> &'static str {
    if barrier.dst_access.contains(AccessFlags::TRANSFER_WRITE) {
        "barrier: shader -> transfer"
    } else if barrier.src_access.contains(AccessFlags::HOST_WRITE) {
        "barrier: host -> shader"
    } else if barrier.src_access.contains(AccessFlags::TRANSFER_WRITE) {
        "barrier: transfer -> shader"
    } else {
        "barrier: shader -> shader"
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        let color_views: Vec<Option<Arc<wgpu::TextureView>>> = descriptor
            .color_attachments
            .iter()
            .map(|att| {
                let view = self.device.get_wgpu_texture_view(att.view);
                if view.is_none() {
                    log::warn!("WgpuCommandEncoder: Color view {:?} not found.", att.view);
                }
                view
            })
            .collect();

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = descriptor
            .color_attachments
            .iter()
            .zip(color_views.iter())
            .map(|(att, view)| {
                view.as_ref().map(|view| wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: att.ops.load.into_wgpu(),
                        store: att.ops.store.into_wgpu(),
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_view = descriptor
            .depth_stencil_attachment
            .as_ref()
            .and_then(|ds| self.device.get_wgpu_texture_view(ds.view));
        let depth_stencil_attachment =
            match (&descriptor.depth_stencil_attachment, &depth_view) {
                (Some(ds), Some(view)) => Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: ds.depth_ops.map(|ops| wgpu::Operations {
                        load: ops.load.into_wgpu(),
                        store: ops.store.into_wgpu(),
                    }),
                    stencil_ops: None,
                }),
                _ => None,
            };

        let query_set = self.query_set_for(&descriptor.timestamp_writes);
        let timestamp_writes = match (&query_set, &descriptor.timestamp_writes) {
            (Some(query_set), Some(writes)) => Some(wgpu::RenderPassTimestampWrites {
                query_set,
                beginning_of_pass_write_index: writes.beginning_of_pass_write_index,
                end_of_pass_write_index: writes.end_of_pass_write_index,
            }),
            _ => None,
        };

        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: descriptor.label,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder> {
        let query_set = self.query_set_for(&descriptor.timestamp_writes);
        let timestamp_writes = match (&query_set, &descriptor.timestamp_writes) {
            (Some(query_set), Some(writes)) => Some(wgpu::ComputePassTimestampWrites {
                query_set,
                beginning_of_pass_write_index: writes.beginning_of_pass_write_index,
                end_of_pass_write_index: writes.end_of_pass_write_index,
            }),
            _ => None,
        };

        let pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: descriptor.label,
            timestamp_writes,
        });

        Box::new(WgpuComputePass {
            pass,
            device: &self.device,
        })
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        // wgpu tracks resource usage between passes and inserts the
        // matching pipeline barriers itself.
        self.encoder.insert_debug_marker(barrier_marker(&barrier));
    }

    fn clear_buffer(&mut self, buffer: BufferId, offset: u64, size: Option<u64>) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer) {
            self.encoder.clear_buffer(&buffer, offset, size);
        } else {
            log::warn!("WgpuCommandEncoder: BufferId {buffer:?} not found for clear.");
        }
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        if let (Some(source_buffer), Some(destination_buffer)) = (
            self.device.get_wgpu_buffer(source),
            self.device.get_wgpu_buffer(destination),
        ) {
            self.encoder.copy_buffer_to_buffer(
                &source_buffer,
                source_offset,
                &destination_buffer,
                destination_offset,
                size,
            );
        } else {
            log::warn!("WgpuCommandEncoder: Copy {source:?} -> {destination:?} skipped, buffer not found.");
        }
    }

    fn resolve_query_set(
        &mut self,
        query_set: QuerySetId,
        queries: Range<u32>,
        destination: BufferId,
        destination_offset: u64,
    ) {
        match (
            self.device.get_wgpu_query_set(query_set),
            self.device.get_wgpu_buffer(destination),
        ) {
            (Some(query_set), Some(buffer)) => {
                self.encoder
                    .resolve_query_set(&query_set, queries, &buffer, destination_offset);
            }
            _ => log::warn!(
                "WgpuCommandEncoder: Resolve of {query_set:?} into {destination:?} skipped."
            ),
        }
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let WgpuCommandEncoder { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }
}
