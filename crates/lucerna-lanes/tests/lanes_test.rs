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

use lucerna_core::lane::{
    ClusterBuffers, FrameBindings, FrameContext, Lane, LaneError, LaneKind, LaneSetup,
};
use lucerna_core::math::{Aabb, Extent2D, Vec3};
use lucerna_core::renderer::*;
use lucerna_lanes::render_lane::{
    ClusteringLane, DepthPrepassLane, ForwardShadingLane, LightCullingLane, LightParticleLane,
    ShadingDraws,
};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockGraphicsDevice {
    next_id: AtomicUsize,
    live: AtomicUsize,
    compute_entry_points: Mutex<Vec<String>>,
}

impl MockGraphicsDevice {
    fn create(&self) -> usize {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn destroy(&self) -> Result<(), ResourceError> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader_module(
        &self,
        _descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        Ok(ShaderModuleId(self.create()))
    }

    fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_bind_group_layout(
        &self,
        _descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(self.create()))
    }

    fn destroy_bind_group_layout(&self, _id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_bind_group(
        &self,
        _descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        Ok(BindGroupId(self.create()))
    }

    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_pipeline_layout(
        &self,
        _descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        Ok(PipelineLayoutId(self.create()))
    }

    fn destroy_pipeline_layout(&self, _id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_render_pipeline(
        &self,
        _descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        Ok(RenderPipelineId(self.create()))
    }

    fn destroy_render_pipeline(&self, _id: RenderPipelineId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        self.compute_entry_points
            .lock()
            .unwrap()
            .push(descriptor.entry_point.to_string());
        Ok(ComputePipelineId(self.create()))
    }

    fn destroy_compute_pipeline(&self, _id: ComputePipelineId) -> Result<(), ResourceError> {
        self.destroy()
    }

    fn create_buffer(&self, _descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        Ok(BufferId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        _data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.create_buffer(descriptor)
    }

    fn destroy_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn write_buffer(&self, _id: BufferId, _offset: u64, _data: &[u8]) -> Result<(), ResourceError> {
        Ok(())
    }

    fn map_buffer_read(&self, _id: BufferId, _offset: u64, _size: u64) -> Result<(), ResourceError> {
        Ok(())
    }

    fn try_read_mapped(&self, _id: BufferId) -> Result<Option<Vec<u8>>, ResourceError> {
        Ok(None)
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        Ok(TextureId(0))
    }

    fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_texture_view(&self, _texture_id: TextureId) -> Result<TextureViewId, ResourceError> {
        Ok(TextureViewId(0))
    }

    fn destroy_texture_view(&self, _id: TextureViewId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_query_set(
        &self,
        _descriptor: &QuerySetDescriptor,
    ) -> Result<QuerySetId, ResourceError> {
        Ok(QuerySetId(0))
    }

    fn destroy_query_set(&self, _id: QuerySetId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn timestamp_period(&self) -> Option<f32> {
        None
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(RecordingEncoder::default())
    }

    fn submit(&self, _queue: QueueKind, _info: &SubmitInfo<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn create_fence(&self, _signaled: bool) -> Result<FenceId, SyncError> {
        Ok(FenceId(0))
    }

    fn destroy_fence(&self, _id: FenceId) -> Result<(), SyncError> {
        Ok(())
    }

    fn wait_for_fence(&self, _id: FenceId, _timeout: Duration) -> Result<(), SyncError> {
        Ok(())
    }

    fn reset_fence(&self, _id: FenceId) -> Result<(), SyncError> {
        Ok(())
    }

    fn is_fence_signaled(&self, _id: FenceId) -> Result<bool, SyncError> {
        Ok(true)
    }

    fn create_semaphore(&self) -> Result<SemaphoreId, SyncError> {
        Ok(SemaphoreId(0))
    }

    fn destroy_semaphore(&self, _id: SemaphoreId) -> Result<(), SyncError> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    BeginCompute(String, Option<PassTimestampWrites>),
    EndCompute,
    Barrier,
    ComputePipeline(ComputePipelineId),
    RenderPipeline(RenderPipelineId),
    BindGroup(u32, BindGroupId),
    VertexBuffer(BufferId),
    IndexBuffer(BufferId),
    Dispatch(u32, u32, u32),
    Draw(Range<u32>, Range<u32>),
    DrawIndexed(Range<u32>, Range<u32>),
}

type Log = Arc<Mutex<Vec<Command>>>;

#[derive(Default)]
struct RecordingEncoder {
    log: Log,
}

struct RecordingPass {
    log: Log,
}

impl RecordingPass {
    fn push(&self, command: Command) {
        self.log.lock().unwrap().push(command);
    }
}

impl RenderPass for RecordingPass {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.push(Command::RenderPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId) {
        self.push(Command::BindGroup(index, bind_group));
    }

    fn set_vertex_buffer(&mut self, _slot: u32, buffer: BufferId, _offset: u64) {
        self.push(Command::VertexBuffer(buffer));
    }

    fn set_index_buffer(&mut self, buffer: BufferId, _offset: u64, _index_format: IndexFormat) {
        self.push(Command::IndexBuffer(buffer));
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.push(Command::Draw(vertices, instances));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.push(Command::DrawIndexed(indices, instances));
    }
}

impl ComputePass for RecordingPass {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId) {
        self.push(Command::ComputePipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId) {
        self.push(Command::BindGroup(index, bind_group));
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.push(Command::Dispatch(x, y, z));
    }
}

struct ComputeScope(RecordingPass);

impl Drop for ComputeScope {
    fn drop(&mut self) {
        self.0.push(Command::EndCompute);
    }
}

impl ComputePass for ComputeScope {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId) {
        ComputePass::set_pipeline(&mut self.0, pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId) {
        ComputePass::set_bind_group(&mut self.0, index, bind_group);
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.0.dispatch_workgroups(x, y, z);
    }
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        _descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        Box::new(RecordingPass {
            log: self.log.clone(),
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder> {
        self.log.lock().unwrap().push(Command::BeginCompute(
            descriptor.label.unwrap_or_default().to_string(),
            descriptor.timestamp_writes,
        ));
        Box::new(ComputeScope(RecordingPass {
            log: self.log.clone(),
        }))
    }

    fn memory_barrier(&mut self, _barrier: MemoryBarrier) {
        self.log.lock().unwrap().push(Command::Barrier);
    }

    fn clear_buffer(&mut self, _buffer: BufferId, _offset: u64, _size: Option<u64>) {}

    fn copy_buffer_to_buffer(
        &mut self,
        _source: BufferId,
        _source_offset: u64,
        _destination: BufferId,
        _destination_offset: u64,
        _size: u64,
    ) {
    }

    fn resolve_query_set(
        &mut self,
        _query_set: QuerySetId,
        _queries: Range<u32>,
        _destination: BufferId,
        _destination_offset: u64,
    ) {
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }
}

struct TestScene {
    submeshes: Vec<SubMesh>,
    opaque: Vec<bool>,
}

impl TestScene {
    /// Two opaque submeshes around one transparent one.
    fn new() -> Self {
        let submesh = |index_start, material| SubMesh {
            index_start,
            index_count: 6,
            base_vertex: 0,
            material,
        };
        Self {
            submeshes: vec![submesh(0, 0), submesh(6, 1), submesh(12, 2)],
            opaque: vec![true, false, true],
        }
    }
}

impl SceneSource for TestScene {
    fn buffers(&self) -> SceneBuffers {
        SceneBuffers {
            vertex_buffer: BufferId(900),
            index_buffer: BufferId(901),
            index_format: IndexFormat::Uint32,
            material_buffer: BufferId(902),
        }
    }

    fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    fn is_opaque(&self, submesh: &SubMesh) -> bool {
        self.opaque[submesh.material as usize]
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE)
    }
}

fn frame_bindings(slots: usize) -> Vec<FrameBindings> {
    (0..slots)
        .map(|slot| {
            let base = 100 * (slot + 1);
            FrameBindings {
                uniforms: BufferId(base),
                lights: BufferId(base + 1),
                cluster: ClusterBuffers {
                    flags: BufferId(base + 2),
                    light_bounds: BufferId(base + 3),
                    counts: BufferId(base + 4),
                    offsets: BufferId(base + 5),
                    claimed: BufferId(base + 6),
                    total: BufferId(base + 7),
                    light_list: BufferId(base + 8),
                },
            }
        })
        .collect()
}

struct Fixture {
    device: MockGraphicsDevice,
    config: RendererConfig,
    frames: Vec<FrameBindings>,
    scene: TestScene,
    grid: ClusterGrid,
}

impl Fixture {
    fn new() -> Self {
        let config = RendererConfig::default();
        let grid = ClusterGrid::from_viewport(&config, Extent2D::new(800, 600)).unwrap();
        Self {
            device: MockGraphicsDevice::default(),
            config,
            frames: frame_bindings(3),
            scene: TestScene::new(),
            grid,
        }
    }

    fn setup(&self) -> LaneSetup<'_> {
        LaneSetup {
            config: &self.config,
            surface_format: TextureFormat::Bgra8UnormSrgb,
            depth_format: TextureFormat::Depth32Float,
            scene: self.scene.buffers(),
            frames: &self.frames,
        }
    }

    fn ctx(&self, slot: usize, num_lights: u32) -> FrameContext<'_> {
        FrameContext {
            slot,
            grid: &self.grid,
            num_lights,
            scene: &self.scene,
            timestamps: None,
        }
    }
}

fn draws(log: &Log) -> Vec<Range<u32>> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            Command::DrawIndexed(_, instances) => Some(instances.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_record_before_initialize_fails() {
    let fixture = Fixture::new();
    let log = Log::default();
    let mut pass = RecordingPass { log: log.clone() };
    let err = DepthPrepassLane::new()
        .record(&mut pass, &fixture.ctx(0, 1))
        .unwrap_err();
    assert!(matches!(err, LaneError::NotInitialized));

    let mut encoder = RecordingEncoder::default();
    let err = LightCullingLane::new()
        .record(&mut encoder, &fixture.ctx(0, 1))
        .unwrap_err();
    assert!(matches!(err, LaneError::NotInitialized));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_lane_identity() {
    assert_eq!(DepthPrepassLane::new().lane_kind(), LaneKind::DepthPrepass);
    assert_eq!(ClusteringLane::new().lane_kind(), LaneKind::Clustering);
    assert_eq!(LightCullingLane::new().lane_kind(), LaneKind::LightCulling);
    assert_eq!(ForwardShadingLane::new().lane_kind(), LaneKind::Shading);
    assert_eq!(LightParticleLane::new().lane_kind(), LaneKind::Debug);
    assert_eq!(ForwardShadingLane::new().strategy_name(), "ClusteredForward");
}

#[test]
fn test_depth_prepass_draws_only_opaque() {
    let fixture = Fixture::new();
    let mut lane = DepthPrepassLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();

    let log = Log::default();
    let mut pass = RecordingPass { log: log.clone() };
    let count = lane.record(&mut pass, &fixture.ctx(1, 10)).unwrap();
    assert_eq!(count, 2);
    assert_eq!(draws(&log), vec![0..1, 2..3]);
}

#[test]
fn test_clustering_draws_opaque_then_transparent() {
    let fixture = Fixture::new();
    let mut lane = ClusteringLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();

    let log = Log::default();
    let mut pass = RecordingPass { log: log.clone() };
    assert_eq!(lane.record(&mut pass, &fixture.ctx(0, 10)).unwrap(), 3);
    assert_eq!(draws(&log), vec![0..1, 2..3, 1..2]);
    let bind_groups = log
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, Command::BindGroup(..)))
        .count();
    assert_eq!(bind_groups, 2);
}

#[test]
fn test_forward_shading_switches_pipeline_for_transparent() {
    let fixture = Fixture::new();
    let mut lane = ForwardShadingLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();

    let log = Log::default();
    let mut pass = RecordingPass { log: log.clone() };
    let result = lane.record(&mut pass, &fixture.ctx(2, 10)).unwrap();
    assert_eq!(
        result,
        ShadingDraws {
            opaque: 2,
            transparent: 1
        }
    );

    let log = log.lock().unwrap();
    let pipelines: Vec<_> = log
        .iter()
        .filter_map(|c| match c {
            Command::RenderPipeline(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(pipelines.len(), 2);
    assert_ne!(pipelines[0], pipelines[1]);
    let last_pipeline = log
        .iter()
        .rposition(|c| matches!(c, Command::RenderPipeline(_)))
        .unwrap();
    assert_eq!(log[last_pipeline + 1], Command::DrawIndexed(6..12, 1..2));
}

#[test]
fn test_forward_shading_rejects_depth_target() {
    let fixture = Fixture::new();
    let mut setup = fixture.setup();
    setup.surface_format = TextureFormat::Depth32Float;
    let err = ForwardShadingLane::new()
        .on_initialize(&fixture.device, &setup)
        .unwrap_err();
    assert!(matches!(err, LaneError::InitializationFailed(_)));
}

#[test]
fn test_particles_draw_one_quad_per_light() {
    let fixture = Fixture::new();
    let mut lane = LightParticleLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();

    let log = Log::default();
    let mut pass = RecordingPass { log: log.clone() };
    lane.record(&mut pass, &fixture.ctx(0, 2048)).unwrap();
    assert_eq!(log.lock().unwrap().last(), Some(&Command::Draw(0..6, 0..2048)));

    let empty = Log::default();
    let mut pass = RecordingPass { log: empty.clone() };
    lane.record(&mut pass, &fixture.ctx(0, 0)).unwrap();
    assert!(empty.lock().unwrap().is_empty());
}

#[test]
fn test_light_culling_records_three_stages_with_barriers() {
    let fixture = Fixture::new();
    let mut lane = LightCullingLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();
    assert_eq!(
        *fixture.device.compute_entry_points.lock().unwrap(),
        vec!["compute_flags", "compute_offsets", "compute_list"]
    );

    let mut encoder = RecordingEncoder::default();
    let log = encoder.log.clone();
    let mut ctx = fixture.ctx(1, 100);
    ctx.timestamps = Some(FrameTimestamps {
        query_set: QuerySetId(7),
    });
    lane.record(&mut encoder, &ctx).unwrap();

    let log = log.lock().unwrap();
    let structure: Vec<&Command> = log
        .iter()
        .filter(|c| {
            matches!(
                c,
                Command::BeginCompute(..)
                    | Command::EndCompute
                    | Command::Barrier
                    | Command::Dispatch(..)
            )
        })
        .collect();
    let slices = fixture.config.depth_slices;
    assert_eq!(
        structure,
        vec![
            &Command::BeginCompute(
                "compute grid_flags".into(),
                Some(PassTimestampWrites::span(QuerySetId(7), 4))
            ),
            &Command::Dispatch(4, 1, 1),
            &Command::EndCompute,
            &Command::Barrier,
            &Command::BeginCompute(
                "compute light_offsets".into(),
                Some(PassTimestampWrites::span(QuerySetId(7), 6))
            ),
            &Command::Dispatch(1, 1, slices),
            &Command::EndCompute,
            &Command::Barrier,
            &Command::BeginCompute(
                "compute light_list".into(),
                Some(PassTimestampWrites::span(QuerySetId(7), 8))
            ),
            &Command::Dispatch(4, 1, 1),
            &Command::EndCompute,
        ]
    );
}

#[test]
fn test_light_culling_with_zero_lights_skips_light_stages() {
    let fixture = Fixture::new();
    let mut lane = LightCullingLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();

    let mut encoder = RecordingEncoder::default();
    let log = encoder.log.clone();
    lane.record(&mut encoder, &fixture.ctx(0, 0)).unwrap();

    let log = log.lock().unwrap();
    let dispatches: Vec<_> = log
        .iter()
        .filter(|c| matches!(c, Command::Dispatch(..)))
        .collect();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(
        log.iter().filter(|c| matches!(c, Command::BeginCompute(..))).count(),
        3
    );
}

#[test]
fn test_unknown_slot_is_reported() {
    let fixture = Fixture::new();
    let mut lane = ForwardShadingLane::new();
    lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();
    let mut pass = RecordingPass {
        log: Log::default(),
    };
    let err = lane.record(&mut pass, &fixture.ctx(5, 1)).unwrap_err();
    assert!(matches!(err, LaneError::UnknownFrameSlot(5)));
}

#[test]
fn test_shutdown_releases_everything() {
    let fixture = Fixture::new();
    let mut lanes: Vec<Box<dyn Lane>> = vec![
        Box::new(DepthPrepassLane::new()),
        Box::new(ClusteringLane::new()),
        Box::new(LightCullingLane::new()),
        Box::new(ForwardShadingLane::new()),
        Box::new(LightParticleLane::new()),
    ];
    for lane in lanes.iter_mut() {
        lane.on_initialize(&fixture.device, &fixture.setup()).unwrap();
    }
    assert!(fixture.device.live() > 0);

    // Initializing twice must not leak the first set of objects.
    let before = fixture.device.live();
    lanes[2]
        .on_initialize(&fixture.device, &fixture.setup())
        .unwrap();
    assert_eq!(fixture.device.live(), before);

    for lane in lanes.iter_mut() {
        lane.on_shutdown(&fixture.device);
    }
    assert_eq!(fixture.device.live(), 0);
}
