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

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError, SyncError};
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;
use std::time::Duration;

/// The interface through which everything above the backend creates GPU
/// resources, records and submits work, and synchronizes with the GPU.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a shader module from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - The shader source and label.
    /// ## Returns
    /// The ID of the created shader module.
    /// ## Errors
    /// * `ResourceError` - If the shader fails to compile.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a bind group layout.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    /// Creates a bind group binding concrete buffers to a layout.
    /// ## Errors
    /// * `ResourceError::NotFound` - If the layout or one of the buffers is unknown.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Destroys a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a pipeline layout from the provided descriptor.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError>;

    /// Creates a render pipeline from the provided descriptor.
    /// ## Errors
    /// * `ResourceError::Pipeline` - If a shader module or the layout is invalid.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates a compute pipeline from the provided descriptor.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError>;

    /// Destroys a compute pipeline.
    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes host data into a buffer.
    ///
    /// The write becomes visible to commands submitted afterwards once a
    /// [`MemoryBarrier::HOST_TO_SHADER`] barrier has been recorded before
    /// their first use of the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Starts mapping `size` bytes of a `MAP_READ` buffer for reading once
    /// the submissions already queued have finished with it. Never blocks.
    ///
    /// The buffer must not be used by new commands until
    /// [`Self::try_read_mapped`] has returned its bytes.
    fn map_buffer_read(&self, id: BufferId, offset: u64, size: u64) -> Result<(), ResourceError>;

    /// Returns the bytes of a map started with [`Self::map_buffer_read`] and
    /// unmaps the buffer. `None` while the map is still in flight or when no
    /// map was started. Polls the device without waiting on it.
    fn try_read_mapped(&self, id: BufferId) -> Result<Option<Vec<u8>>, ResourceError>;

    /// Creates a new GPU texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a GPU texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a default view covering a whole texture.
    fn create_texture_view(&self, texture_id: TextureId) -> Result<TextureViewId, ResourceError>;

    /// Destroys a texture view.
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    /// Creates a timestamp query set.
    /// ## Errors
    /// * `ResourceError::BackendError` - If timestamp queries are unsupported.
    fn create_query_set(&self, descriptor: &QuerySetDescriptor)
        -> Result<QuerySetId, ResourceError>;

    /// Destroys a query set.
    fn destroy_query_set(&self, id: QuerySetId) -> Result<(), ResourceError>;

    /// Nanoseconds per timestamp tick, or `None` when the adapter cannot
    /// write timestamps inside passes.
    fn timestamp_period(&self) -> Option<f32>;

    /// Creates a new command encoder to record GPU commands.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits command buffers to a queue.
    /// ## Arguments
    /// * `queue` - The queue the work is meant for.
    /// * `info` - Command buffers, semaphores to wait on and signal, and the fence to signal.
    /// ## Errors
    /// * `RenderError::Sync` - If a wait semaphore has no pending signal.
    /// * `RenderError::SubmissionFailed` - If the device rejects the submission.
    fn submit(&self, queue: QueueKind, info: &SubmitInfo<'_>) -> Result<(), RenderError>;

    /// Creates a fence, optionally already signaled.
    fn create_fence(&self, signaled: bool) -> Result<FenceId, SyncError>;

    /// Destroys a fence.
    fn destroy_fence(&self, id: FenceId) -> Result<(), SyncError>;

    /// Blocks until the fence is signaled or `timeout` expires.
    /// ## Errors
    /// * `SyncError::FenceTimeout` - If the fence is still unsignaled after `timeout`.
    fn wait_for_fence(&self, id: FenceId, timeout: Duration) -> Result<(), SyncError>;

    /// Returns the fence to the unsignaled state.
    fn reset_fence(&self, id: FenceId) -> Result<(), SyncError>;

    /// Polls a fence without blocking.
    fn is_fence_signaled(&self, id: FenceId) -> Result<bool, SyncError>;

    /// Creates a binary semaphore.
    fn create_semaphore(&self) -> Result<SemaphoreId, SyncError>;

    /// Destroys a semaphore.
    fn destroy_semaphore(&self, id: SemaphoreId) -> Result<(), SyncError>;

    /// Blocks until all submitted work has completed.
    fn wait_idle(&self) -> Result<(), RenderError>;

    /// Get the adapter information of the device.
    fn get_adapter_info(&self) -> RendererAdapterInfo;
}
