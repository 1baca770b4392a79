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

use crate::renderer::api::{
    BindGroupId, BufferId, CommandBufferId, ComputePassDescriptor, ComputePipelineId,
    IndexFormat, MemoryBarrier, QuerySetId, RenderPassDescriptor, RenderPipelineId,
};
use std::ops::Range;

/// An active render pass, used for recording drawing commands.
///
/// The pass is obtained from a [`CommandEncoder`] and ends when dropped.
pub trait RenderPass {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a bind group at `index`.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId);

    /// Binds a vertex buffer to a specific slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64);

    /// Binds an index buffer for indexed drawing.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat);

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

/// An active compute pass, used for recording dispatch commands.
pub trait ComputePass {
    /// Sets the active compute pipeline.
    fn set_pipeline(&mut self, pipeline: ComputePipelineId);

    /// Binds a bind group at `index`.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId);

    /// Dispatches a grid of workgroups.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
}

/// Records a sequence of GPU commands into a command buffer.
///
/// Only one pass can be active at a time: the returned pass borrows the
/// encoder mutably until it is dropped.
pub trait CommandEncoder {
    /// Begins a new render pass.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder>;

    /// Begins a new compute pass.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder>;

    /// Records a full memory barrier. Every command recorded after it
    /// observes the accesses named by `barrier.src_access`.
    fn memory_barrier(&mut self, barrier: MemoryBarrier);

    /// Fills a buffer range with zeros. `size: None` clears to the end.
    fn clear_buffer(&mut self, buffer: BufferId, offset: u64, size: Option<u64>);

    /// Copies data from one buffer to another.
    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Resolves timestamp queries into a buffer.
    fn resolve_query_set(
        &mut self,
        query_set: QuerySetId,
        queries: Range<u32>,
        destination: BufferId,
        destination_offset: u64,
    );

    /// Finalizes recording and returns a handle to the command buffer.
    fn finish(self: Box<Self>) -> CommandBufferId;
}
