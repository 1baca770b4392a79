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

use approx::assert_relative_eq;
use lucerna_agents::render_agent::{
    FrameInputs, FrameOutcome, FrameReport, FrameScheduler, RenderAgent, RenderTargets,
};
use lucerna_core::math::{Extent2D, Vec3};
use lucerna_core::platform::window::LucernaWindow;
use lucerna_core::renderer::*;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SURFACE_VIEW: TextureViewId = TextureViewId(4242);

#[derive(Debug, Clone, PartialEq)]
enum Command {
    BeginRender {
        label: String,
        color: Option<TextureViewId>,
        /// `Some(true)` writes depth, `Some(false)` only tests it.
        depth_write: Option<bool>,
        timestamps: Option<PassTimestampWrites>,
    },
    BeginCompute {
        label: String,
        timestamps: Option<PassTimestampWrites>,
    },
    Barrier(MemoryBarrier),
    Clear(BufferId),
    Copy(BufferId, BufferId),
    Resolve(QuerySetId, Range<u32>),
    Dispatch(u32, u32, u32),
    DrawIndexed(Range<u32>, Range<u32>),
    Draw(Range<u32>, Range<u32>),
}

#[derive(Debug, Clone)]
struct Submission {
    queue: QueueKind,
    label: String,
    waits: Vec<SemaphoreId>,
    signals: Vec<SemaphoreId>,
    fence: Option<FenceId>,
    commands: Vec<Command>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_id: usize,
    live: HashMap<&'static str, isize>,
    destroyed: Vec<&'static str>,
    fences: HashMap<FenceId, bool>,
    semaphores: HashMap<SemaphoreId, bool>,
    recorded: HashMap<u64, Vec<Command>>,
    submissions: Vec<Submission>,
    unretired: Vec<FenceId>,
    auto_retire: bool,
    textures_created: usize,
    wait_idle_calls: usize,
    /// Buffers with a read map in flight, by mapped size.
    mapping: HashMap<BufferId, u64>,
    maps_ready: bool,
    maps_collected: usize,
}

impl DeviceState {
    fn create(&mut self, kind: &'static str) -> usize {
        *self.live.entry(kind).or_default() += 1;
        self.next_id += 1;
        self.next_id
    }

    fn destroy(&mut self, kind: &'static str) {
        *self.live.entry(kind).or_default() -= 1;
        self.destroyed.push(kind);
    }

    fn signal(&mut self, semaphore: SemaphoreId) -> Result<(), RenderError> {
        match self.semaphores.get_mut(&semaphore) {
            Some(signaled) if !*signaled => {
                *signaled = true;
                Ok(())
            }
            Some(_) => Err(RenderError::SubmissionFailed(format!(
                "{semaphore:?} signaled twice"
            ))),
            None => Err(SyncError::UnknownSemaphore(semaphore).into()),
        }
    }

    fn consume(&mut self, waits: &[SemaphoreId]) -> Result<(), RenderError> {
        for semaphore in waits {
            if self.semaphores.get(semaphore) != Some(&true) {
                return Err(SyncError::SemaphoreNotSignaled(*semaphore).into());
            }
        }
        for semaphore in waits {
            self.semaphores.insert(*semaphore, false);
        }
        Ok(())
    }

    fn retire_all(&mut self) {
        for fence in self.unretired.drain(..) {
            self.fences.insert(fence, true);
        }
    }
}

/// A device that records submissions and enforces semaphore and fence rules:
/// waiting on an unsignaled semaphore fails, and fences retire only when
/// `auto_retire` is on or [`MockDevice::retire_all`] is called.
#[derive(Debug)]
struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
    timestamp_period: Option<f32>,
}

impl MockDevice {
    fn new(timestamp_period: Option<f32>) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(DeviceState {
                auto_retire: true,
                maps_ready: true,
                ..Default::default()
            })),
            timestamp_period,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    fn live(&self, kind: &'static str) -> isize {
        self.lock().live.get(kind).copied().unwrap_or(0)
    }

    fn live_total(&self) -> isize {
        self.lock().live.values().sum()
    }

    fn signaled_semaphores(&self) -> usize {
        self.lock().semaphores.values().filter(|s| **s).count()
    }

    fn set_auto_retire(&self, enabled: bool) {
        self.lock().auto_retire = enabled;
    }

    fn retire_all(&self) {
        self.lock().retire_all();
    }

    fn set_maps_ready(&self, ready: bool) {
        self.lock().maps_ready = ready;
    }
}

impl GraphicsDevice for MockDevice {
    fn create_shader_module(
        &self,
        _descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        Ok(ShaderModuleId(self.lock().create("shader")))
    }

    fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
        self.lock().destroy("shader");
        Ok(())
    }

    fn create_bind_group_layout(
        &self,
        _descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(self.lock().create("bind_group_layout")))
    }

    fn destroy_bind_group_layout(&self, _id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.lock().destroy("bind_group_layout");
        Ok(())
    }

    fn create_bind_group(
        &self,
        _descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        Ok(BindGroupId(self.lock().create("bind_group")))
    }

    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        self.lock().destroy("bind_group");
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        _descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        Ok(PipelineLayoutId(self.lock().create("pipeline_layout")))
    }

    fn destroy_pipeline_layout(&self, _id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.lock().destroy("pipeline_layout");
        Ok(())
    }

    fn create_render_pipeline(
        &self,
        _descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        Ok(RenderPipelineId(self.lock().create("render_pipeline")))
    }

    fn destroy_render_pipeline(&self, _id: RenderPipelineId) -> Result<(), ResourceError> {
        self.lock().destroy("render_pipeline");
        Ok(())
    }

    fn create_compute_pipeline(
        &self,
        _descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        Ok(ComputePipelineId(self.lock().create("compute_pipeline")))
    }

    fn destroy_compute_pipeline(&self, _id: ComputePipelineId) -> Result<(), ResourceError> {
        self.lock().destroy("compute_pipeline");
        Ok(())
    }

    fn create_buffer(&self, _descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        Ok(BufferId(self.lock().create("buffer")))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        _data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.create_buffer(descriptor)
    }

    fn destroy_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
        self.lock().destroy("buffer");
        Ok(())
    }

    fn write_buffer(&self, _id: BufferId, _offset: u64, _data: &[u8]) -> Result<(), ResourceError> {
        Ok(())
    }

    fn map_buffer_read(&self, id: BufferId, _offset: u64, size: u64) -> Result<(), ResourceError> {
        let mut state = self.lock();
        if state.mapping.insert(id, size).is_some() {
            return Err(ResourceError::BackendError(format!("{id:?} mapped twice")));
        }
        Ok(())
    }

    /// Resolved timestamps read back as 1 ms per stage at a 1 ns period.
    fn try_read_mapped(&self, id: BufferId) -> Result<Option<Vec<u8>>, ResourceError> {
        let mut state = self.lock();
        if !state.maps_ready {
            return Ok(None);
        }
        let Some(size) = state.mapping.remove(&id) else {
            return Ok(None);
        };
        state.maps_collected += 1;
        let raw: Vec<u64> = (0..size / 8)
            .map(|i| (i / 2) * 10_000_000 + (i % 2) * 1_000_000)
            .collect();
        Ok(Some(bytemuck::cast_slice(&raw).to_vec()))
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.lock();
        state.textures_created += 1;
        Ok(TextureId(state.create("texture")))
    }

    fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
        self.lock().destroy("texture");
        Ok(())
    }

    fn create_texture_view(&self, _texture_id: TextureId) -> Result<TextureViewId, ResourceError> {
        Ok(TextureViewId(self.lock().create("texture_view")))
    }

    fn destroy_texture_view(&self, _id: TextureViewId) -> Result<(), ResourceError> {
        self.lock().destroy("texture_view");
        Ok(())
    }

    fn create_query_set(
        &self,
        _descriptor: &QuerySetDescriptor,
    ) -> Result<QuerySetId, ResourceError> {
        Ok(QuerySetId(self.lock().create("query_set")))
    }

    fn destroy_query_set(&self, _id: QuerySetId) -> Result<(), ResourceError> {
        self.lock().destroy("query_set");
        Ok(())
    }

    fn timestamp_period(&self) -> Option<f32> {
        self.timestamp_period
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockEncoder {
            state: Arc::clone(&self.state),
            log: Log::default(),
        })
    }

    fn submit(&self, queue: QueueKind, info: &SubmitInfo<'_>) -> Result<(), RenderError> {
        let mut state = self.lock();
        for cb in info.command_buffers {
            let commands = state.recorded.get(&cb.0).into_iter().flatten();
            for command in commands {
                if let Command::Copy(_, dst) = command {
                    if state.mapping.contains_key(dst) {
                        return Err(RenderError::SubmissionFailed(format!(
                            "copy into {dst:?} while it is mapped"
                        )));
                    }
                }
            }
        }
        state.consume(info.wait_semaphores)?;
        for semaphore in info.signal_semaphores {
            state.signal(*semaphore)?;
        }
        if let Some(fence) = info.fence {
            if state.auto_retire {
                state.fences.insert(fence, true);
            } else {
                state.unretired.push(fence);
            }
        }
        let commands = info
            .command_buffers
            .iter()
            .flat_map(|cb| state.recorded.remove(&cb.0).unwrap_or_default())
            .collect();
        state.submissions.push(Submission {
            queue,
            label: info.label.unwrap_or_default().to_string(),
            waits: info.wait_semaphores.to_vec(),
            signals: info.signal_semaphores.to_vec(),
            fence: info.fence,
            commands,
        });
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceId, SyncError> {
        let mut state = self.lock();
        let id = FenceId(state.create("fence"));
        state.fences.insert(id, signaled);
        Ok(id)
    }

    fn destroy_fence(&self, id: FenceId) -> Result<(), SyncError> {
        let mut state = self.lock();
        state.fences.remove(&id).ok_or(SyncError::UnknownFence(id))?;
        state.destroy("fence");
        Ok(())
    }

    fn wait_for_fence(&self, id: FenceId, timeout: Duration) -> Result<(), SyncError> {
        match self.lock().fences.get(&id) {
            Some(true) => Ok(()),
            Some(false) => Err(SyncError::FenceTimeout { fence: id, timeout }),
            None => Err(SyncError::UnknownFence(id)),
        }
    }

    fn reset_fence(&self, id: FenceId) -> Result<(), SyncError> {
        let mut state = self.lock();
        let fence = state.fences.get_mut(&id).ok_or(SyncError::UnknownFence(id))?;
        *fence = false;
        Ok(())
    }

    fn is_fence_signaled(&self, id: FenceId) -> Result<bool, SyncError> {
        self.lock()
            .fences
            .get(&id)
            .copied()
            .ok_or(SyncError::UnknownFence(id))
    }

    fn create_semaphore(&self) -> Result<SemaphoreId, SyncError> {
        let mut state = self.lock();
        let id = SemaphoreId(state.create("semaphore"));
        state.semaphores.insert(id, false);
        Ok(id)
    }

    fn destroy_semaphore(&self, id: SemaphoreId) -> Result<(), SyncError> {
        let mut state = self.lock();
        state
            .semaphores
            .remove(&id)
            .ok_or(SyncError::UnknownSemaphore(id))?;
        state.destroy("semaphore");
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), RenderError> {
        let mut state = self.lock();
        state.wait_idle_calls += 1;
        state.retire_all();
        Ok(())
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo {
            name: "Mock Adapter".to_string(),
            ..Default::default()
        }
    }
}

type Log = Arc<Mutex<Vec<Command>>>;

struct MockEncoder {
    state: Arc<Mutex<DeviceState>>,
    log: Log,
}

struct MockPass {
    log: Log,
}

impl MockPass {
    fn push(&self, command: Command) {
        self.log.lock().unwrap().push(command);
    }
}

impl RenderPass for MockPass {
    fn set_pipeline(&mut self, _pipeline: RenderPipelineId) {}

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupId) {}

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferId, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferId, _offset: u64, _index_format: IndexFormat) {}

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.push(Command::Draw(vertices, instances));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.push(Command::DrawIndexed(indices, instances));
    }
}

impl ComputePass for MockPass {
    fn set_pipeline(&mut self, _pipeline: ComputePipelineId) {}

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupId) {}

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.push(Command::Dispatch(x, y, z));
    }
}

impl MockEncoder {
    fn push(&self, command: Command) {
        self.log.lock().unwrap().push(command);
    }
}

impl CommandEncoder for MockEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        self.push(Command::BeginRender {
            label: descriptor.label.unwrap_or_default().to_string(),
            color: descriptor.color_attachments.first().map(|c| c.view),
            depth_write: descriptor
                .depth_stencil_attachment
                .map(|d| d.depth_ops.is_some()),
            timestamps: descriptor.timestamp_writes,
        });
        Box::new(MockPass {
            log: Arc::clone(&self.log),
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder> {
        self.push(Command::BeginCompute {
            label: descriptor.label.unwrap_or_default().to_string(),
            timestamps: descriptor.timestamp_writes,
        });
        Box::new(MockPass {
            log: Arc::clone(&self.log),
        })
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        self.push(Command::Barrier(barrier));
    }

    fn clear_buffer(&mut self, buffer: BufferId, _offset: u64, _size: Option<u64>) {
        self.push(Command::Clear(buffer));
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        _source_offset: u64,
        destination: BufferId,
        _destination_offset: u64,
        _size: u64,
    ) {
        self.push(Command::Copy(source, destination));
    }

    fn resolve_query_set(
        &mut self,
        query_set: QuerySetId,
        queries: Range<u32>,
        _destination: BufferId,
        _destination_offset: u64,
    ) {
        self.push(Command::Resolve(query_set, queries));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let commands = std::mem::take(&mut *self.log.lock().unwrap());
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id as u64;
        state.recorded.insert(id, commands);
        CommandBufferId(id)
    }
}

#[derive(Debug)]
struct SurfaceState {
    extent: Extent2D,
    stale_next: usize,
    resizes: Vec<Extent2D>,
    acquired: Vec<SemaphoreId>,
    presented: Vec<Vec<SemaphoreId>>,
    shut_down: bool,
}

#[derive(Debug)]
struct MockRenderSystem {
    device: Arc<MockDevice>,
    surface: Arc<Mutex<SurfaceState>>,
}

impl MockRenderSystem {
    fn new(device: &Arc<MockDevice>, extent: Extent2D) -> Self {
        Self {
            device: Arc::clone(device),
            surface: Arc::new(Mutex::new(SurfaceState {
                extent,
                stale_next: 0,
                resizes: Vec::new(),
                acquired: Vec::new(),
                presented: Vec::new(),
                shut_down: false,
            })),
        }
    }
}

impl RenderSystem for MockRenderSystem {
    fn init(&mut self, _window: &dyn LucernaWindow) -> Result<(), RenderError> {
        Ok(())
    }

    fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        let mut surface = self.surface.lock().unwrap();
        surface.extent = Extent2D::new(new_width, new_height);
        let extent = surface.extent;
        surface.resizes.push(extent);
    }

    fn surface_extent(&self) -> Extent2D {
        self.surface.lock().unwrap().extent
    }

    fn surface_format(&self) -> Option<TextureFormat> {
        Some(TextureFormat::Bgra8UnormSrgb)
    }

    fn acquire_image(&mut self, signal: SemaphoreId) -> Result<AcquireOutcome, RenderError> {
        let mut surface = self.surface.lock().unwrap();
        if surface.stale_next > 0 {
            surface.stale_next -= 1;
            return Ok(AcquireOutcome::Stale);
        }
        self.device.lock().signal(signal)?;
        surface.acquired.push(signal);
        Ok(AcquireOutcome::Acquired(SurfaceImage {
            view: SURFACE_VIEW,
            extent: surface.extent,
        }))
    }

    fn present(&mut self, image: SurfaceImage, wait: &[SemaphoreId]) -> Result<(), RenderError> {
        assert_eq!(image.view, SURFACE_VIEW);
        self.device.lock().consume(wait)?;
        self.surface.lock().unwrap().presented.push(wait.to_vec());
        Ok(())
    }

    fn graphics_device(&self) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        Ok(Arc::clone(&self.device) as Arc<dyn GraphicsDevice>)
    }

    fn shutdown(&mut self) {
        self.surface.lock().unwrap().shut_down = true;
    }
}

/// Two opaque quads around a half-transparent one.
fn upload_scene(device: &dyn GraphicsDevice) -> MeshScene {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for i in 0..3 {
        let z = i as f32;
        let base = vertices.len() as u32;
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(Vertex::new(Vec3::new(x, y, z), Vec3::Z));
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    let submeshes = (0..3)
        .map(|i| SubMesh {
            index_start: 6 * i,
            index_count: 6,
            base_vertex: 0,
            material: i,
        })
        .collect();
    let materials = vec![
        GpuMaterial {
            base_color: [1.0, 0.0, 0.0, 1.0],
        },
        GpuMaterial {
            base_color: [0.0, 1.0, 0.0, 0.5],
        },
        GpuMaterial {
            base_color: [0.0, 0.0, 1.0, 1.0],
        },
    ];
    MeshScene::upload(device, &vertices, &indices, submeshes, materials).unwrap()
}

struct Harness {
    device: Arc<MockDevice>,
    render_system: MockRenderSystem,
    scene: MeshScene,
    camera: Camera,
    lights: LightField,
    overlay: NullOverlay,
    scheduler: FrameScheduler,
}

impl Harness {
    fn new(config: RendererConfig) -> Self {
        Self::with_device(config, MockDevice::new(None))
    }

    fn with_device(config: RendererConfig, device: Arc<MockDevice>) -> Self {
        let mut render_system = MockRenderSystem::new(&device, Extent2D::new(800, 600));
        let scene = upload_scene(device.as_ref());
        let lights = LightField::generate(config.initial_lights, scene.bounds(), 7);
        let scheduler = FrameScheduler::new(&mut render_system, config, &scene).unwrap();
        Self {
            device,
            render_system,
            scene,
            camera: Camera::new(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO),
            lights,
            overlay: NullOverlay::default(),
            scheduler,
        }
    }

    fn render(&mut self) -> Result<FrameOutcome, RenderError> {
        self.scheduler.render_frame(
            &mut self.render_system,
            FrameInputs {
                camera: &self.camera,
                lights: &self.lights,
                scene: &self.scene,
                overlay: &mut self.overlay,
            },
        )
    }

    fn presented(&mut self) -> FrameReport {
        match self.render().unwrap() {
            FrameOutcome::Presented(report) => report,
            FrameOutcome::Skipped => panic!("frame was skipped"),
        }
    }
}

fn small_config() -> RendererConfig {
    RendererConfig {
        max_lights: 64,
        initial_lights: 16,
        light_list_capacity: 4096,
        ..Default::default()
    }
}

#[test]
fn test_frame_is_four_submissions_on_graphics_and_compute() {
    let mut harness = Harness::new(small_config());
    let report = harness.presented();
    assert_eq!(report.slot, 0);
    assert_eq!(report.frame, 0);
    assert_eq!(report.lights, 16);

    let submissions = harness.device.submissions();
    let labels: Vec<_> = submissions.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["geometry", "culling", "shading", "transfer"]);
    let queues: Vec<_> = submissions.iter().map(|s| s.queue).collect();
    assert_eq!(
        queues,
        [
            QueueKind::Graphics,
            QueueKind::Compute,
            QueueKind::Graphics,
            QueueKind::Graphics
        ]
    );
    assert!(submissions.iter().all(|s| s.fence.is_some()));
    assert_eq!(harness.render_system.surface.lock().unwrap().presented.len(), 1);
}

#[test]
fn test_semaphores_chain_the_stages() {
    let mut harness = Harness::new(small_config());
    harness.presented();

    let submissions = harness.device.submissions();
    let [geometry, culling, shading, transfer] = &submissions[..] else {
        panic!("expected four submissions, got {}", submissions.len());
    };
    let surface = harness.render_system.surface.lock().unwrap();

    assert!(geometry.waits.is_empty());
    assert_eq!(geometry.signals.len(), 1);
    assert_eq!(culling.waits, geometry.signals);
    assert_eq!(culling.signals.len(), 1);
    assert_eq!(shading.waits, vec![culling.signals[0], surface.acquired[0]]);
    assert_eq!(shading.signals.len(), 2);
    assert_eq!(surface.presented[0], vec![shading.signals[0]]);
    assert_eq!(transfer.waits, vec![shading.signals[1]]);
    assert!(transfer.signals.is_empty());
}

#[test]
fn test_steady_state_leaves_no_semaphore_signaled() {
    let mut harness = Harness::new(small_config());
    let slots: Vec<_> = (0..7).map(|_| harness.presented().slot).collect();
    assert_eq!(slots, [0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(harness.device.signaled_semaphores(), 0);
    assert_eq!(harness.scheduler.frames(), 7);
}

#[test]
fn test_shared_transient_buffers_serialize_geometry_behind_transfer() {
    let mut harness = Harness::new(RendererConfig {
        transient_policy: TransientPolicy::Shared,
        ..small_config()
    });
    let pool = harness.scheduler.pool();
    let shared = pool.slot(0).unwrap().bindings().cluster;
    assert!((1..pool.len()).all(|i| pool.slot(i).unwrap().bindings().cluster == shared));

    harness.presented();
    harness.presented();
    let submissions = harness.device.submissions();
    let first_transfer = &submissions[3];
    let second_geometry = &submissions[4];
    assert_eq!(first_transfer.signals.len(), 1);
    assert_eq!(second_geometry.waits, first_transfer.signals);
    assert_eq!(harness.device.signaled_semaphores(), 1);
}

#[test]
fn test_per_slot_transient_buffers_are_distinct() {
    let harness = Harness::new(small_config());
    let pool = harness.scheduler.pool();
    let a = pool.slot(0).unwrap().bindings();
    let b = pool.slot(1).unwrap().bindings();
    assert_ne!(a.uniforms, b.uniforms);
    assert_ne!(a.lights, b.lights);
    assert!(a.cluster.all().iter().all(|buffer| !b.cluster.all().contains(buffer)));
}

#[test]
fn test_backpressure_bounds_frames_in_flight() {
    let mut harness = Harness::new(RendererConfig {
        frames_in_flight: 2,
        ..small_config()
    });
    harness.device.set_auto_retire(false);

    harness.presented();
    harness.presented();
    assert_eq!(harness.scheduler.outstanding_frames().unwrap(), 2);

    let err = harness.render().unwrap_err();
    assert!(matches!(
        err,
        RenderError::Sync(SyncError::FenceTimeout { .. })
    ));
    assert!(err.is_fatal());
    assert_eq!(harness.device.submissions().len(), 8);
    assert_eq!(harness.scheduler.outstanding_frames().unwrap(), 2);

    harness.device.retire_all();
    assert_eq!(harness.scheduler.outstanding_frames().unwrap(), 0);
    assert_eq!(harness.presented().slot, 0);
    assert_eq!(harness.scheduler.outstanding_frames().unwrap(), 1);
}

#[test]
fn test_stale_surface_is_resized_and_retried() {
    let mut harness = Harness::new(small_config());
    harness.render_system.surface.lock().unwrap().stale_next = 1;

    let report = harness.presented();
    assert_eq!(report.slot, 0);
    let surface = harness.render_system.surface.lock().unwrap();
    assert_eq!(surface.resizes, vec![Extent2D::new(800, 600)]);
    let state = harness.device.lock();
    assert_eq!(state.wait_idle_calls, 1);
    assert_eq!(state.textures_created, 2);
    assert_eq!(state.live.get("texture").copied(), Some(1));
}

#[test]
fn test_persistently_stale_surface_skips_the_frame() {
    let mut harness = Harness::new(small_config());
    harness.render_system.surface.lock().unwrap().stale_next = 3;

    assert_eq!(harness.render().unwrap(), FrameOutcome::Skipped);
    let submissions = harness.device.submissions();
    assert_eq!(submissions.len(), 4);
    assert!(submissions
        .iter()
        .all(|s| s.commands.is_empty() && s.fence.is_some() && s.waits.is_empty()));

    // The abandoned slot comes around again without waiting forever.
    let slots: Vec<_> = (0..3).map(|_| harness.presented().slot).collect();
    assert_eq!(slots, [1, 2, 0]);
    assert_eq!(harness.device.signaled_semaphores(), 0);
}

#[test]
fn test_transient_buffers_are_cleared_between_barriers() {
    let mut harness = Harness::new(small_config());
    let cluster = harness.scheduler.pool().slot(0).unwrap().bindings().cluster;
    harness.presented();

    let submissions = harness.device.submissions();

    let transfer = &submissions[3];
    let mut expected = vec![Command::Barrier(MemoryBarrier::SHADER_TO_TRANSFER)];
    expected.extend(cluster.all().into_iter().map(Command::Clear));
    expected.push(Command::Barrier(MemoryBarrier::TRANSFER_TO_SHADER));
    assert_eq!(transfer.commands, expected);
}

#[test]
fn test_passes_use_the_depth_buffer_as_expected() {
    let mut harness = Harness::new(small_config());
    harness.presented();
    let submissions = harness.device.submissions();

    let passes = |index: usize| -> Vec<(String, Option<TextureViewId>, Option<bool>)> {
        submissions[index]
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginRender {
                    label,
                    color,
                    depth_write,
                    ..
                } => Some((label.clone(), *color, *depth_write)),
                _ => None,
            })
            .collect()
    };
    assert_eq!(
        submissions[0].commands[0],
        Command::Barrier(MemoryBarrier::HOST_TO_SHADER)
    );
    assert_eq!(
        passes(0),
        vec![
            ("depth pre-pass".to_string(), None, Some(true)),
            ("clustering".to_string(), None, Some(false)),
        ]
    );
    assert_eq!(
        passes(2),
        vec![("on-screen".to_string(), Some(SURFACE_VIEW), Some(false))]
    );
}

#[test]
fn test_draws_follow_material_opacity() {
    let mut harness = Harness::new(small_config());
    let report = harness.presented();
    assert_eq!(report.depth_draws, 2);
    assert_eq!(report.cluster_draws, 3);
    assert_eq!(report.shading.opaque, 2);
    assert_eq!(report.shading.transparent, 1);

    // One particle quad per light after the shaded geometry.
    let submissions = harness.device.submissions();
    let shading = &submissions[2];
    let particles: Vec<_> = shading
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::Draw(vertices, instances) => Some((vertices.clone(), instances.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(particles.len(), 1);
    assert_eq!(particles[0].1, 0..16);
}

#[test]
fn test_zero_lights_still_shades_geometry() {
    let mut harness = Harness::new(RendererConfig {
        initial_lights: 0,
        ..small_config()
    });
    let report = harness.presented();
    assert_eq!(report.lights, 0);
    assert_eq!(report.shading.opaque + report.shading.transparent, 3);

    let submissions = harness.device.submissions();

    let culling = &submissions[1];
    let computes = culling
        .commands
        .iter()
        .filter(|c| matches!(c, Command::BeginCompute { .. }))
        .count();
    let dispatches = culling
        .commands
        .iter()
        .filter(|c| matches!(c, Command::Dispatch(..)))
        .count();
    assert_eq!(computes, 3);
    assert_eq!(dispatches, 1, "only the offsets stage runs without lights");
}

#[test]
fn test_light_count_over_capacity_is_rejected_before_scheduling() {
    let mut harness = Harness::new(small_config());
    harness.lights = LightField::generate(65, harness.scene.bounds(), 1);

    let err = harness.render().unwrap_err();
    assert!(matches!(
        err,
        RenderError::Config(ConfigError::LightCapacityExceeded {
            requested: 65,
            max: 64
        })
    ));
    assert!(!err.is_fatal());
    assert!(harness.device.submissions().is_empty());
    assert!(harness.render_system.surface.lock().unwrap().acquired.is_empty());
}

#[test]
fn test_invalid_configuration_creates_nothing() {
    let device = MockDevice::new(None);
    let mut render_system = MockRenderSystem::new(&device, Extent2D::new(800, 600));
    let scene = upload_scene(device.as_ref());
    let before = device.live_total();

    let config = RendererConfig {
        frames_in_flight: 0,
        ..small_config()
    };
    let err = FrameScheduler::new(&mut render_system, config, &scene).unwrap_err();
    assert!(matches!(
        err,
        RenderError::Config(ConfigError::InvalidFramesInFlight(0))
    ));
    assert_eq!(device.live_total(), before);
}

#[test]
fn test_resize_rebuilds_grid_and_targets() {
    let mut harness = Harness::new(small_config());
    assert_eq!(harness.scheduler.grid().tile_count_x(), 13);

    let rebuilt = harness
        .scheduler
        .handle_resize(&mut harness.render_system, 1920, 1080)
        .unwrap();
    assert!(rebuilt);
    assert_eq!(harness.scheduler.grid().tile_count_x(), 30);
    assert_eq!(harness.scheduler.grid().tile_count_y(), 17);
    assert_eq!(
        harness.scheduler.targets().extent(),
        Extent2D::new(1920, 1080)
    );
    assert_eq!(harness.render_system.surface_extent(), Extent2D::new(1920, 1080));

    // Larger windows are clamped to the configured maximum.
    let rebuilt = harness
        .scheduler
        .handle_resize(&mut harness.render_system, 2560, 1440)
        .unwrap();
    assert!(!rebuilt);
    assert_eq!(harness.device.live("texture"), 1);
    assert_eq!(harness.presented().slot, 0);
}

#[test]
fn test_minimized_window_skips_frames() {
    let mut harness = Harness::new(small_config());
    assert!(!harness
        .scheduler
        .handle_resize(&mut harness.render_system, 0, 0)
        .unwrap());
    assert_eq!(harness.render().unwrap(), FrameOutcome::Skipped);
    assert!(harness.device.submissions().is_empty());

    assert!(harness
        .scheduler
        .handle_resize(&mut harness.render_system, 640, 480)
        .unwrap());
    assert_eq!(harness.presented().slot, 0);
}

#[test]
fn test_timestamps_are_recorded_and_read_back() {
    let mut harness = Harness::with_device(
        RendererConfig {
            frames_in_flight: 1,
            ..small_config()
        },
        MockDevice::new(Some(1.0)),
    );
    assert!(harness.scheduler.pool().has_timestamps());
    harness.presented();
    assert!(harness.scheduler.telemetry().latest_timings().is_none());
    assert_eq!(harness.overlay.lines()[0], "Mock Adapter");

    let submissions = harness.device.submissions();

    let geometry = &submissions[0];
    let depth_timestamps = geometry.commands.iter().find_map(|c| match c {
        Command::BeginRender { timestamps, .. } => *timestamps,
        _ => None,
    });
    assert_eq!(
        depth_timestamps.map(|t| t.beginning_of_pass_write_index),
        Some(Some(0))
    );
    let submissions = harness.device.submissions();
    let transfer = &submissions[3];
    assert!(transfer
        .commands
        .iter()
        .any(|c| matches!(c, Command::Resolve(_, queries) if *queries == (0..14))));

    harness.presented();
    let timings = harness.scheduler.telemetry().latest_timings().unwrap();
    assert_relative_eq!(timings.get(GpuStage::Depth), 1.0);
    assert_relative_eq!(timings.total(), 7.0);
}

#[test]
fn test_timestamp_readback_never_waits_for_the_device() {
    let mut harness = Harness::with_device(small_config(), MockDevice::new(Some(1.0)));
    for _ in 0..6 {
        harness.presented();
    }

    let state = harness.device.lock();
    assert_eq!(state.wait_idle_calls, 0);
    // Slots 0..3 collect the maps their first frames started.
    assert_eq!(state.maps_collected, 3);
    assert_eq!(state.mapping.len(), 3);
    drop(state);
    assert!(harness.scheduler.telemetry().latest_timings().is_some());
}

#[test]
fn test_unfinished_readback_skips_the_slots_timestamps() {
    let mut harness = Harness::with_device(
        RendererConfig {
            frames_in_flight: 1,
            ..small_config()
        },
        MockDevice::new(Some(1.0)),
    );
    harness.device.set_maps_ready(false);
    harness.presented();
    harness.presented();

    assert!(harness.scheduler.pool().slot(0).unwrap().readback_in_flight());
    assert!(harness.scheduler.telemetry().latest_timings().is_none());
    let submissions = harness.device.submissions();
    let second_frame = &submissions[4..8];
    for submission in second_frame {
        assert!(submission.commands.iter().all(|c| match c {
            Command::BeginRender { timestamps, .. } | Command::BeginCompute { timestamps, .. } =>
                timestamps.is_none(),
            Command::Resolve(..) | Command::Copy(..) => false,
            _ => true,
        }));
    }

    harness.device.set_maps_ready(true);
    harness.presented();
    assert!(harness.scheduler.telemetry().latest_timings().is_some());
    let submissions = harness.device.submissions();
    assert!(submissions[11]
        .commands
        .iter()
        .any(|c| matches!(c, Command::Resolve(..))));
}

#[test]
fn test_scheduler_shutdown_releases_in_dependency_order() {
    let mut harness = Harness::new(small_config());
    harness.presented();
    harness.presented();
    harness.scheduler.shutdown().unwrap();
    harness.scheduler.shutdown().unwrap();

    let state = harness.device.lock();
    let last = |kind| state.destroyed.iter().rposition(|k| *k == kind).unwrap();
    let first = |kind| state.destroyed.iter().position(|k| *k == kind).unwrap();
    assert!(last("shader") < first("fence"));
    assert!(last("fence") < first("texture"));
    drop(state);

    // Only the scene's buffers remain.
    assert_eq!(harness.device.live_total(), 3);
    assert!(matches!(
        harness.render(),
        Err(RenderError::NotInitialized)
    ));
}

fn agent(config: RendererConfig) -> (Arc<MockDevice>, Arc<Mutex<SurfaceState>>, RenderAgent) {
    let device = MockDevice::new(None);
    let render_system = MockRenderSystem::new(&device, Extent2D::new(800, 600));
    let surface = Arc::clone(&render_system.surface);
    let scene = upload_scene(device.as_ref());
    let agent = RenderAgent::new(
        config,
        Box::new(render_system),
        Box::new(scene),
        Box::new(NullOverlay::default()),
    )
    .unwrap();
    (device, surface, agent)
}

#[test]
fn test_agent_light_count_changes() {
    let (_device, _surface, mut agent) = agent(small_config());
    assert_eq!(agent.light_count(), 16);

    let err = agent.set_light_count(65).unwrap_err();
    assert_eq!(
        err,
        ConfigError::LightCapacityExceeded {
            requested: 65,
            max: 64
        }
    );
    assert_eq!(agent.light_count(), 16);

    agent.set_light_count(64).unwrap();
    match agent.render_frame().unwrap() {
        FrameOutcome::Presented(report) => assert_eq!(report.lights, 64),
        FrameOutcome::Skipped => panic!("frame was skipped"),
    }
}

#[test]
fn test_agent_moves_lights_every_frame() {
    let (_device, _surface, mut agent) = agent(small_config());
    let before = agent.lights().lights()[0].position;
    agent.render_frame().unwrap();
    assert_ne!(agent.lights().lights()[0].position, before);

    agent.set_light_animation(false);
    let paused = agent.lights().lights()[0].position;
    agent.render_frame().unwrap();
    assert_eq!(agent.lights().lights()[0].position, paused);
}

#[test]
fn test_agent_resize_updates_camera_aspect() {
    let (_device, _surface, mut agent) = agent(small_config());
    assert_relative_eq!(agent.camera().aspect, 800.0 / 600.0);
    assert!(agent.handle_resize(1280, 640).unwrap());
    assert_relative_eq!(agent.camera().aspect, 2.0);
}

#[test]
fn test_agent_shutdown_releases_everything() {
    let (device, surface, mut agent) = agent(small_config());
    for _ in 0..4 {
        agent.render_frame().unwrap();
    }
    agent.shutdown().unwrap();
    assert_eq!(device.live_total(), 0);
    assert!(surface.lock().unwrap().shut_down);
    assert!(matches!(
        agent.render_frame(),
        Err(RenderError::NotInitialized)
    ));
    agent.shutdown().unwrap();
}

#[test]
fn test_agent_drop_shuts_down() {
    let (device, surface, mut agent) = agent(small_config());
    agent.render_frame().unwrap();
    drop(agent);
    assert_eq!(device.live_total(), 0);
    assert!(surface.lock().unwrap().shut_down);
}

#[test]
fn test_depth_format_is_a_depth_format() {
    assert!(RenderTargets::DEPTH_FORMAT.is_depth());
}
