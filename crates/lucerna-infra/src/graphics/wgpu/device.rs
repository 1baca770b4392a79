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

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use wgpu::util::DeviceExt;

use lucerna_core::renderer::traits::CommandEncoder;
use lucerna_core::renderer::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutId,
    BufferDescriptor, BufferId, CommandBufferId, ComputePipelineDescriptor, ComputePipelineId,
    FenceId, GraphicsDevice, PipelineError, PipelineLayoutDescriptor, PipelineLayoutId,
    QuerySetDescriptor, QuerySetId, QueueKind, RenderError, RenderPipelineDescriptor,
    RenderPipelineId, RendererAdapterInfo, ResourceError, SemaphoreId, ShaderError,
    ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData, SubmitInfo, SyncError,
    TextureDescriptor, TextureId, TextureViewId,
};

use super::command::WgpuCommandEncoder;
use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_backend, from_wgpu_device_type, IntoWgpu};

#[derive(Debug)]
struct WgpuBufferEntry {
    wgpu_buffer: Arc<wgpu::Buffer>,
    pending_map: Option<PendingMap>,
}

/// A read map requested with `map_async`, completed by a later poll.
#[derive(Debug)]
struct PendingMap {
    range: std::ops::Range<u64>,
    done: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
}

#[derive(Debug)]
struct WgpuTextureEntry {
    wgpu_texture: Arc<wgpu::Texture>,
}

/// A CPU-visible completion flag for one submission.
///
/// wgpu has no fence object, so a fence remembers the index of the last
/// submission that signals it and flips its flag from the queue's
/// work-done callback.
#[derive(Debug)]
struct FenceEntry {
    submission: Option<wgpu::SubmissionIndex>,
    signaled: Arc<AtomicBool>,
}

/// A binary semaphore. wgpu executes a queue in submission order, so the
/// device only has to check that every wait pairs with an earlier signal.
#[derive(Debug, Default)]
struct SemaphoreEntry {
    pending_signal: bool,
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    pipeline_layouts: Mutex<HashMap<PipelineLayoutId, Arc<wgpu::PipelineLayout>>>,
    render_pipelines: Mutex<HashMap<RenderPipelineId, Arc<wgpu::RenderPipeline>>>,
    compute_pipelines: Mutex<HashMap<ComputePipelineId, Arc<wgpu::ComputePipeline>>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    texture_views: Mutex<HashMap<TextureViewId, Arc<wgpu::TextureView>>>,
    query_sets: Mutex<HashMap<QuerySetId, Arc<wgpu::QuerySet>>>,
    fences: Mutex<HashMap<FenceId, FenceEntry>>,
    semaphores: Mutex<HashMap<SemaphoreId, SemaphoreEntry>>,

    next_resource_id: AtomicUsize,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
///
/// It wraps the actual device state (`WgpuDeviceInternal`) in an Arc so it
/// can be shared with command encoders and the render system.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

/// Bookkeeping maps for fences and semaphores hold plain flags, so a
/// poisoned lock still guards consistent data.
fn lock_sync<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WgpuDevice {
    /// Wraps an initialized graphics context.
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipeline_layouts: Mutex::new(HashMap::new()),
                render_pipelines: Mutex::new(HashMap::new()),
                compute_pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                query_sets: Mutex::new(HashMap::new()),
                fences: Mutex::new(HashMap::new()),
                semaphores: Mutex::new(HashMap::new()),
                next_resource_id: AtomicUsize::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    fn next_id(&self) -> usize {
        self.internal.next_resource_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Helper function to execute an operation with the wgpu::Device locked.
    fn with_wgpu_device<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&wgpu::Device) -> Result<R, ResourceError>,
    {
        let context_guard = lock(&self.internal.context, "context")?;
        operation(&context_guard.device)
    }

    fn get<K, V>(map: &Mutex<HashMap<K, V>>, id: &K) -> Option<V>
    where
        K: std::hash::Hash + Eq,
        V: Clone,
    {
        map.lock().ok().and_then(|guard| guard.get(id).cloned())
    }

    fn remove<K, V>(map: &Mutex<HashMap<K, V>>, id: &K, what: &str) -> Result<(), ResourceError>
    where
        K: std::hash::Hash + Eq + std::fmt::Debug,
    {
        if lock(map, what)?.remove(id).is_some() {
            log::debug!("WgpuDevice: Destroyed {what} with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    pub(crate) fn get_wgpu_render_pipeline(
        &self,
        id: RenderPipelineId,
    ) -> Option<Arc<wgpu::RenderPipeline>> {
        Self::get(&self.internal.render_pipelines, &id)
    }

    pub(crate) fn get_wgpu_compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        Self::get(&self.internal.compute_pipelines, &id)
    }

    pub(crate) fn get_wgpu_bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        Self::get(&self.internal.bind_groups, &id)
    }

    pub(crate) fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        self.internal
            .buffers
            .lock()
            .ok()
            .and_then(|buffers| buffers.get(&id).map(|e| Arc::clone(&e.wgpu_buffer)))
    }

    pub(crate) fn get_wgpu_texture_view(&self, id: TextureViewId) -> Option<Arc<wgpu::TextureView>> {
        Self::get(&self.internal.texture_views, &id)
    }

    pub(crate) fn get_wgpu_query_set(&self, id: QuerySetId) -> Option<Arc<wgpu::QuerySet>> {
        Self::get(&self.internal.query_sets, &id)
    }

    /// Blocks until the GPU has drained every submission and all pending
    /// callbacks have run. Used before tearing resources down.
    pub fn poll_device_blocking(&self) {
        if let Err(e) = self.poll_wait(None, None) {
            log::warn!("Failed to poll device during shutdown: {e}");
        }
    }

    /// Creates a texture view for a raw wgpu::Texture (e.g. a swapchain image)
    /// and registers it with the device, returning an abstract ID.
    pub fn create_texture_view_for_surface(
        &self,
        texture: &wgpu::Texture,
        label: Option<&str>,
    ) -> Result<TextureViewId, ResourceError> {
        let wgpu_view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            ..Default::default()
        }));
        let id = TextureViewId(self.next_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(id, wgpu_view);
        Ok(id)
    }

    /// Registers a finished wgpu::CommandBuffer and returns an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        lock_sync(&self.internal.pending_command_buffers).insert(id, buffer);
        id
    }

    /// Gives `id` a pending signal outside of a queue submission, as the
    /// surface does when it hands out an image.
    pub fn signal_semaphore(&self, id: SemaphoreId) -> Result<(), SyncError> {
        let mut semaphores = lock_sync(&self.internal.semaphores);
        let entry = semaphores
            .get_mut(&id)
            .ok_or(SyncError::UnknownSemaphore(id))?;
        entry.pending_signal = true;
        Ok(())
    }

    /// Consumes the pending signal of every semaphore in `ids`. Nothing is
    /// consumed unless all of them are signaled.
    pub fn consume_semaphores(&self, ids: &[SemaphoreId]) -> Result<(), SyncError> {
        let mut semaphores = lock_sync(&self.internal.semaphores);
        Self::consume_locked(&mut semaphores, ids)
    }

    fn consume_locked(
        semaphores: &mut HashMap<SemaphoreId, SemaphoreEntry>,
        ids: &[SemaphoreId],
    ) -> Result<(), SyncError> {
        for id in ids {
            let entry = semaphores.get(id).ok_or(SyncError::UnknownSemaphore(*id))?;
            if !entry.pending_signal {
                return Err(SyncError::SemaphoreNotSignaled(*id));
            }
        }
        for id in ids {
            if let Some(entry) = semaphores.get_mut(id) {
                entry.pending_signal = false;
            }
        }
        Ok(())
    }

    /// Blocks until `submission_index` (or all work) has finished.
    /// `Ok(false)` means the wait timed out.
    fn poll_wait(
        &self,
        submission_index: Option<wgpu::SubmissionIndex>,
        timeout: Option<Duration>,
    ) -> Result<bool, SyncError> {
        let context = lock_context(&self.internal.context)?;
        wait_outcome(context.device.poll(wgpu::PollType::Wait {
            submission_index,
            timeout,
        }))
    }

    /// Runs completed callbacks without waiting for any work.
    fn poll_ready(&self) -> Result<(), SyncError> {
        let context = lock_context(&self.internal.context)?;
        context
            .device
            .poll(wgpu::PollType::Poll)
            .map(|_| ())
            .map_err(|e| SyncError::DeviceFault(format!("device poll failed: {e:?}")))
    }
}

/// The context guards the device itself; a poisoned lock is a device fault,
/// never a completed wait.
fn lock_context<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SyncError> {
    mutex
        .lock()
        .map_err(|e| SyncError::DeviceFault(format!("context poisoned: {e}")))
}

fn wait_outcome(
    result: Result<wgpu::PollStatus, wgpu::PollError>,
) -> Result<bool, SyncError> {
    match result {
        Ok(_) => Ok(true),
        Err(wgpu::PollError::Timeout) => Ok(false),
        Err(e) => Err(SyncError::DeviceFault(format!("device poll failed: {e:?}"))),
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(cow_str) => wgpu::ShaderSource::Wgsl(cow_str.clone()),
        };
        let label = descriptor.label;

        let module = self.with_wgpu_device(|device| {
            log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
            Ok(Arc::new(device.create_shader_module(
                wgpu::ShaderModuleDescriptor {
                    label,
                    source: wgpu_source,
                },
            )))
        })?;

        let id = ShaderModuleId(self.next_id());
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, module);
        log::info!(
            "WgpuDevice: Created shader module '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        if lock(&self.internal.shader_modules, "shader_modules")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Binding Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: wgpu::BindingType::Buffer {
                    ty: entry.ty.into_wgpu(),
                    has_dynamic_offset: false,
                    min_binding_size: entry.min_binding_size,
                },
                count: None,
            })
            .collect();

        let layout = self.with_wgpu_device(|device| {
            Ok(Arc::new(device.create_bind_group_layout(
                &wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                },
            )))
        })?;

        let id = BindGroupLayoutId(self.next_id());
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?.insert(id, layout);
        log::debug!(
            "WgpuDevice: Created bind group layout '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.bind_group_layouts, &id, "bind group layout")
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = Self::get(&self.internal.bind_group_layouts, &descriptor.layout)
            .ok_or(ResourceError::NotFound)?;
        let buffers = descriptor
            .entries
            .iter()
            .map(|entry| self.get_wgpu_buffer(entry.buffer).ok_or(ResourceError::NotFound))
            .collect::<Result<Vec<_>, _>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = descriptor
            .entries
            .iter()
            .zip(buffers.iter())
            .map(|(entry, buffer)| wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: entry.offset,
                    size: entry.size,
                }),
            })
            .collect();

        let bind_group = self.with_wgpu_device(|device| {
            Ok(Arc::new(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: descriptor.label,
                layout: &layout,
                entries: &entries,
            })))
        })?;

        let id = BindGroupId(self.next_id());
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, bind_group);
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.bind_groups, &id, "bind group")
    }

    // --- Pipeline Operations ---

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        log::debug!(
            "WgpuDevice: Creating pipeline layout with label: {:?}",
            descriptor.label
        );
        let layouts = descriptor
            .bind_group_layouts
            .iter()
            .map(|id| {
                Self::get(&self.internal.bind_group_layouts, id).ok_or_else(|| {
                    ResourceError::Pipeline(PipelineError::LayoutCreationFailed(format!(
                        "unknown bind group layout {id:?}"
                    )))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().map(|l| l.as_ref()).collect();

        let layout = self.with_wgpu_device(|device| {
            Ok(Arc::new(device.create_pipeline_layout(
                &wgpu::PipelineLayoutDescriptor {
                    label: descriptor.label,
                    bind_group_layouts: &layout_refs,
                    immediate_size: 0,
                },
            )))
        })?;

        let id = PipelineLayoutId(self.next_id());
        lock(&self.internal.pipeline_layouts, "pipeline_layouts")?.insert(id, layout);
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.pipeline_layouts, &id, "pipeline layout")
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        log::debug!(
            "WgpuDevice: Creating render pipeline with label: {:?}",
            descriptor.label
        );
        let pipeline_label = || descriptor.label.as_deref().map(String::from);

        // 1. Resolve the shader modules and the layout.
        let vs_module = Self::get(&self.internal.shader_modules, &descriptor.vertex_shader_module)
            .ok_or_else(|| {
                ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                    id: descriptor.vertex_shader_module,
                    pipeline_label: pipeline_label(),
                })
            })?;
        let fs_module = match descriptor.fragment_shader_module {
            Some(fs_id) => Some(Self::get(&self.internal.shader_modules, &fs_id).ok_or_else(
                || {
                    ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                        id: fs_id,
                        pipeline_label: pipeline_label(),
                    })
                },
            )?),
            None => None,
        };
        let layout = match descriptor.layout {
            Some(layout_id) => Some(
                Self::get(&self.internal.pipeline_layouts, &layout_id).ok_or_else(|| {
                    ResourceError::Pipeline(PipelineError::LayoutCreationFailed(format!(
                        "unknown pipeline layout {layout_id:?}"
                    )))
                })?,
            ),
            None => None,
        };

        // 2. Convert vertex buffer layouts.
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = descriptor
            .vertex_buffers_layout
            .iter()
            .map(|vb| {
                vb.attributes
                    .iter()
                    .map(|attr| wgpu::VertexAttribute {
                        format: attr.format.into_wgpu(),
                        offset: attr.offset,
                        shader_location: attr.shader_location,
                    })
                    .collect()
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers_layout
            .iter()
            .zip(attributes.iter())
            .map(|(vb, attrs)| wgpu::VertexBufferLayout {
                array_stride: vb.array_stride,
                step_mode: vb.step_mode.into_wgpu(),
                attributes: attrs,
            })
            .collect();

        // 3. Fixed-function state.
        let primitive = wgpu::PrimitiveState {
            topology: descriptor.primitive_state.topology.into_wgpu(),
            strip_index_format: None,
            front_face: descriptor.primitive_state.front_face.into_wgpu(),
            cull_mode: descriptor.primitive_state.cull_mode.map(|m| m.into_wgpu()),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        };
        let depth_stencil = descriptor
            .depth_stencil_state
            .map(|ds| wgpu::DepthStencilState {
                format: ds.format.into_wgpu(),
                depth_write_enabled: ds.depth_write_enabled,
                depth_compare: ds.depth_compare.into_wgpu(),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            });
        let targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_target_states
            .iter()
            .map(|cts| {
                Some(wgpu::ColorTargetState {
                    format: cts.format.into_wgpu(),
                    blend: cts.blend.map(|b| b.into_wgpu()),
                    write_mask: if cts.write_enabled {
                        wgpu::ColorWrites::ALL
                    } else {
                        wgpu::ColorWrites::empty()
                    },
                })
            })
            .collect();

        // 4. Create the pipeline.
        let pipeline = self.with_wgpu_device(|device| {
            let fragment = match (&fs_module, &descriptor.fragment_entry_point) {
                (Some(module), Some(entry_point)) => Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(entry_point.as_ref()),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                (Some(_), None) => {
                    return Err(ResourceError::Pipeline(PipelineError::CompilationFailed {
                        label: pipeline_label(),
                        details: "fragment module without an entry point".to_string(),
                    }))
                }
                (None, _) => None,
            };

            Ok(Arc::new(device.create_render_pipeline(
                &wgpu::RenderPipelineDescriptor {
                    label: descriptor.label.as_deref(),
                    layout: layout.as_deref(),
                    vertex: wgpu::VertexState {
                        module: &vs_module,
                        entry_point: Some(descriptor.vertex_entry_point.as_ref()),
                        buffers: &vertex_buffers,
                        compilation_options: Default::default(),
                    },
                    fragment,
                    primitive,
                    depth_stencil,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                },
            )))
        })?;

        let id = RenderPipelineId(self.next_id());
        lock(&self.internal.render_pipelines, "render_pipelines")?.insert(id, pipeline);
        log::info!(
            "WgpuDevice: Created render pipeline '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        if lock(&self.internal.render_pipelines, "render_pipelines")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed render pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(PipelineError::InvalidRenderPipeline { id }.into())
        }
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let module = Self::get(&self.internal.shader_modules, &descriptor.shader_module)
            .ok_or_else(|| {
                ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                    id: descriptor.shader_module,
                    pipeline_label: descriptor.label.as_deref().map(String::from),
                })
            })?;
        let layout = match descriptor.layout {
            Some(layout_id) => Some(
                Self::get(&self.internal.pipeline_layouts, &layout_id)
                    .ok_or(ResourceError::NotFound)?,
            ),
            None => None,
        };

        let pipeline = self.with_wgpu_device(|device| {
            Ok(Arc::new(device.create_compute_pipeline(
                &wgpu::ComputePipelineDescriptor {
                    label: descriptor.label.as_deref(),
                    layout: layout.as_deref(),
                    module: &module,
                    entry_point: Some(descriptor.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    cache: None,
                },
            )))
        })?;

        let id = ComputePipelineId(self.next_id());
        lock(&self.internal.compute_pipelines, "compute_pipelines")?.insert(id, pipeline);
        log::info!(
            "WgpuDevice: Created compute pipeline '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.compute_pipelines, &id, "compute pipeline")
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: descriptor.mapped_at_creation,
            }))
        })?;

        let id = BufferId(self.next_id());
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                pending_map: None,
            },
        );
        log::debug!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            }))
        })?;

        let id = BufferId(self.next_id());
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                pending_map: None,
            },
        );
        log::debug!(
            "WgpuDevice: Created buffer '{}' with initial data. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            data.len()
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        match lock(&self.internal.buffers, "buffers")?.remove(&id) {
            Some(entry) => {
                entry.wgpu_buffer.destroy();
                log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        let context = lock(&self.internal.context, "context")?;
        context.queue.write_buffer(&buffer, offset, data);
        log::trace!(
            "WgpuDevice: Wrote {} bytes to buffer ID: {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }

    fn map_buffer_read(&self, id: BufferId, offset: u64, size: u64) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.buffers, "buffers")?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if offset + size > entry.wgpu_buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        if entry.pending_map.is_some() {
            return Err(ResourceError::BackendError(format!(
                "Buffer {id:?} already has a map in flight"
            )));
        }

        let range = offset..offset + size;
        let (tx, done) = mpsc::channel();
        entry
            .wgpu_buffer
            .slice(range.clone())
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        entry.pending_map = Some(PendingMap { range, done });
        log::trace!("WgpuDevice: Mapping {size} bytes of buffer {id:?} for reading");
        Ok(())
    }

    fn try_read_mapped(&self, id: BufferId) -> Result<Option<Vec<u8>>, ResourceError> {
        self.poll_ready()
            .map_err(|e| ResourceError::BackendError(e.to_string()))?;

        let mut buffers = lock(&self.internal.buffers, "buffers")?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let Some(pending) = &entry.pending_map else {
            return Ok(None);
        };
        let outcome = match pending.done.try_recv() {
            Ok(outcome) => outcome,
            Err(mpsc::TryRecvError::Empty) => return Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                entry.pending_map = None;
                return Err(ResourceError::BackendError(format!(
                    "Map callback for buffer {id:?} was dropped"
                )));
            }
        };
        let range = pending.range.clone();
        entry.pending_map = None;
        match outcome {
            Ok(()) => {
                let bytes = entry.wgpu_buffer.slice(range).get_mapped_range().to_vec();
                entry.wgpu_buffer.unmap();
                Ok(Some(bytes))
            }
            Err(e) => Err(ResourceError::BackendError(format!(
                "Failed to map buffer {id:?}: {e:?}"
            ))),
        }
    }

    // --- Texture Operations ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let wgpu_texture = self.with_wgpu_device(|device| {
            Ok(device.create_texture(&wgpu::TextureDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size.into_wgpu(),
                mip_level_count: descriptor.mip_level_count,
                sample_count: descriptor.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.into_wgpu(),
                usage: descriptor.usage.into_wgpu(),
                view_formats: &[],
            }))
        })?;

        let id = TextureId(self.next_id());
        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
            },
        );
        log::info!(
            "WgpuDevice: Created texture '{}' with ID: {:?} ({}x{})",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size.width,
            descriptor.size.height
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        match lock(&self.internal.textures, "textures")?.remove(&id) {
            Some(entry) => {
                entry.wgpu_texture.destroy();
                log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_texture_view(&self, texture_id: TextureId) -> Result<TextureViewId, ResourceError> {
        let texture = lock(&self.internal.textures, "textures")?
            .get(&texture_id)
            .map(|entry| Arc::clone(&entry.wgpu_texture))
            .ok_or(ResourceError::NotFound)?;
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let id = TextureViewId(self.next_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(id, view);
        log::debug!("WgpuDevice: Created texture view {id:?} for texture {texture_id:?}");
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.texture_views, &id, "texture view")
    }

    // --- Queries ---

    fn create_query_set(
        &self,
        descriptor: &QuerySetDescriptor,
    ) -> Result<QuerySetId, ResourceError> {
        let query_set = self.with_wgpu_device(|device| {
            if !device.features().contains(wgpu::Features::TIMESTAMP_QUERY) {
                return Err(ResourceError::BackendError(
                    "Timestamp queries are not supported by this device".to_string(),
                ));
            }
            Ok(Arc::new(device.create_query_set(&wgpu::QuerySetDescriptor {
                label: descriptor.label,
                ty: wgpu::QueryType::Timestamp,
                count: descriptor.count,
            })))
        })?;

        let id = QuerySetId(self.next_id());
        lock(&self.internal.query_sets, "query_sets")?.insert(id, query_set);
        Ok(id)
    }

    fn destroy_query_set(&self, id: QuerySetId) -> Result<(), ResourceError> {
        Self::remove(&self.internal.query_sets, &id, "query set")
    }

    fn timestamp_period(&self) -> Option<f32> {
        let context = self.internal.context.lock().ok()?;
        context
            .active_device_features
            .contains(wgpu::Features::TIMESTAMP_QUERY)
            .then(|| context.queue.get_timestamp_period())
    }

    // --- Commands and Submission ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = match self.internal.context.lock() {
            Ok(context) => context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }),
            Err(poisoned) => poisoned
                .into_inner()
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }),
        };
        Box::new(WgpuCommandEncoder::new(encoder, self.clone()))
    }

    fn submit(&self, queue: QueueKind, info: &SubmitInfo<'_>) -> Result<(), RenderError> {
        // Validate and consume the waits before anything reaches the queue.
        {
            let mut semaphores = lock_sync(&self.internal.semaphores);
            Self::consume_locked(&mut semaphores, info.wait_semaphores)?;
            for id in info.signal_semaphores {
                if !semaphores.contains_key(id) {
                    return Err(SyncError::UnknownSemaphore(*id).into());
                }
            }
        }
        let fence_flag = match info.fence {
            Some(fence) => Some(
                lock_sync(&self.internal.fences)
                    .get(&fence)
                    .map(|entry| Arc::clone(&entry.signaled))
                    .ok_or(SyncError::UnknownFence(fence))?,
            ),
            None => None,
        };

        let buffers = {
            let mut pending = lock_sync(&self.internal.pending_command_buffers);
            info.command_buffers
                .iter()
                .map(|id| {
                    pending.remove(id).ok_or_else(|| {
                        RenderError::SubmissionFailed(format!(
                            "command buffer {id:?} is unknown or already submitted"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let index = {
            let context = self
                .internal
                .context
                .lock()
                .map_err(|e| RenderError::SubmissionFailed(format!("context poisoned: {e}")))?;
            let index = context.queue.submit(buffers);
            if let Some(flag) = &fence_flag {
                flag.store(false, Ordering::Release);
                let flag = Arc::clone(flag);
                context
                    .queue
                    .on_submitted_work_done(move || flag.store(true, Ordering::Release));
            }
            index
        };

        if let Some(fence) = info.fence {
            if let Some(entry) = lock_sync(&self.internal.fences).get_mut(&fence) {
                entry.submission = Some(index);
            }
        }
        {
            let mut semaphores = lock_sync(&self.internal.semaphores);
            for id in info.signal_semaphores {
                if let Some(entry) = semaphores.get_mut(id) {
                    entry.pending_signal = true;
                }
            }
        }

        log::trace!(
            "WgpuDevice: Submitted '{}' to the {queue} queue ({} command buffers)",
            info.label.unwrap_or_default(),
            info.command_buffers.len()
        );
        Ok(())
    }

    // --- Synchronization ---

    fn create_fence(&self, signaled: bool) -> Result<FenceId, SyncError> {
        let id = FenceId(self.next_id());
        lock_sync(&self.internal.fences).insert(
            id,
            FenceEntry {
                submission: None,
                signaled: Arc::new(AtomicBool::new(signaled)),
            },
        );
        Ok(id)
    }

    fn destroy_fence(&self, id: FenceId) -> Result<(), SyncError> {
        lock_sync(&self.internal.fences)
            .remove(&id)
            .map(|_| ())
            .ok_or(SyncError::UnknownFence(id))
    }

    fn wait_for_fence(&self, id: FenceId, timeout: Duration) -> Result<(), SyncError> {
        let (submission, flag) = {
            let fences = lock_sync(&self.internal.fences);
            let entry = fences.get(&id).ok_or(SyncError::UnknownFence(id))?;
            (entry.submission.clone(), Arc::clone(&entry.signaled))
        };
        if flag.load(Ordering::Acquire) {
            return Ok(());
        }
        let Some(submission) = submission else {
            return Err(SyncError::FenceTimeout { fence: id, timeout });
        };

        match self.poll_wait(Some(submission), Some(timeout)) {
            Ok(true) => {
                flag.store(true, Ordering::Release);
                Ok(())
            }
            Ok(false) => Err(SyncError::FenceTimeout { fence: id, timeout }),
            Err(e) => {
                log::error!("WgpuDevice: Waiting on fence {id:?} failed: {e}");
                Err(e)
            }
        }
    }

    fn reset_fence(&self, id: FenceId) -> Result<(), SyncError> {
        let mut fences = lock_sync(&self.internal.fences);
        let entry = fences.get_mut(&id).ok_or(SyncError::UnknownFence(id))?;
        entry.signaled.store(false, Ordering::Release);
        entry.submission = None;
        Ok(())
    }

    fn is_fence_signaled(&self, id: FenceId) -> Result<bool, SyncError> {
        self.poll_ready()?;
        lock_sync(&self.internal.fences)
            .get(&id)
            .map(|entry| entry.signaled.load(Ordering::Acquire))
            .ok_or(SyncError::UnknownFence(id))
    }

    fn create_semaphore(&self) -> Result<SemaphoreId, SyncError> {
        let id = SemaphoreId(self.next_id());
        lock_sync(&self.internal.semaphores).insert(id, SemaphoreEntry::default());
        Ok(id)
    }

    fn destroy_semaphore(&self, id: SemaphoreId) -> Result<(), SyncError> {
        lock_sync(&self.internal.semaphores)
            .remove(&id)
            .map(|_| ())
            .ok_or(SyncError::UnknownSemaphore(id))
    }

    fn wait_idle(&self) -> Result<(), RenderError> {
        if self.poll_wait(None, None)? {
            Ok(())
        } else {
            Err(RenderError::Internal("Device did not become idle".to_string()))
        }
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        match self.internal.context.lock() {
            Ok(context) => RendererAdapterInfo {
                name: context.adapter_name.clone(),
                backend_type: from_wgpu_backend(context.adapter_backend),
                device_type: from_wgpu_device_type(context.adapter_device_type),
            },
            Err(_) => {
                log::error!("WgpuDevice: Mutex poisoned (context) on get_adapter_info");
                RendererAdapterInfo::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisoned_context_is_a_device_fault() {
        let context = Arc::new(Mutex::new(0u32));
        let poisoner = Arc::clone(&context);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the context");
        })
        .join();

        assert!(context.is_poisoned());
        assert!(matches!(
            lock_context(&context),
            Err(SyncError::DeviceFault(_))
        ));
    }

    #[test]
    fn test_healthy_context_locks() {
        let context = Mutex::new(7u32);
        assert_eq!(*lock_context(&context).unwrap(), 7);
    }

    #[test]
    fn test_wait_outcome_separates_timeouts_from_completion() {
        assert_eq!(wait_outcome(Ok(wgpu::PollStatus::QueueEmpty)), Ok(true));
        assert_eq!(wait_outcome(Err(wgpu::PollError::Timeout)), Ok(false));
    }
}
