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

//! The frame orchestrator.
//!
//! A frame is recorded as four submissions chained by semaphores:
//!
//! | Submission | Queue    | Waits on                         | Signals                    |
//! |------------|----------|----------------------------------|----------------------------|
//! | geometry   | graphics | previous transfer (shared only)  | `geometry_done`            |
//! | culling    | compute  | `geometry_done`                  | `culling_done`             |
//! | shading    | graphics | `culling_done`, `image_acquired` | `render_done`, `shading_done` |
//! | transfer   | graphics | `shading_done`                   | `transfer_done` (shared only) |
//!
//! Presentation waits on `render_done`. Every submission retires one fence
//! of the frame slot; [`FramePool::acquire_next`] waits on all four before
//! the slot is reused, so at most `frames_in_flight` frames are in flight.

use super::frame_pool::{FramePool, FrameSubmission, SlotQueries};
use super::targets::RenderTargets;
use lucerna_core::lane::{FrameBindings, FrameContext, Lane, LaneError, LaneSetup};
use lucerna_core::math::{Extent2D, LinearRgba};
use lucerna_core::renderer::{
    AcquireOutcome, Camera, ClusterGrid, CommandEncoder, ComputePassDescriptor, ConfigError,
    FenceId, GpuPointLight, GpuStage, GraphicsDevice, LightField, LoadOp, MemoryBarrier, Operations,
    PassTimestampWrites, RenderError, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RenderSystem, RendererConfig, SceneSource, SemaphoreId, StoreOp,
    SubmitInfo, SurfaceImage, TextOverlay, TextureViewId, TransientPolicy,
};
use lucerna_lanes::{
    ClusteringLane, DepthPrepassLane, ForwardShadingLane, LightCullingLane, LightParticleLane,
    ShadingDraws,
};
use lucerna_telemetry::TelemetryService;
use std::sync::Arc;

/// Attempts to acquire a swapchain image before a frame is dropped.
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// Background color of the on-screen pass.
pub const CLEAR_COLOR: LinearRgba = LinearRgba::new(0.0, 0.0, 0.0, 1.0);

/// Per-frame state supplied by the caller.
pub struct FrameInputs<'a> {
    /// The view.
    pub camera: &'a Camera,
    /// The lights to upload for this frame.
    pub lights: &'a LightField,
    /// The geometry to draw.
    pub scene: &'a dyn SceneSource,
    /// Text drawn on top of the frame.
    pub overlay: &'a mut dyn TextOverlay,
}

/// What was recorded for a presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// The frame slot used.
    pub slot: usize,
    /// Sequence number of the frame, starting at 0.
    pub frame: u64,
    /// Submeshes drawn by the depth pre-pass.
    pub depth_draws: u32,
    /// Submeshes drawn by the clustering pass.
    pub cluster_draws: u32,
    /// Submeshes shaded.
    pub shading: ShadingDraws,
    /// Lights uploaded.
    pub lights: u32,
}

/// Result of [`FrameScheduler::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and queued for presentation.
    Presented(FrameReport),
    /// Nothing was drawn: the window is minimized, or the surface stayed
    /// stale after resizing.
    Skipped,
}

/// The fixed set of lanes of a clustered frame.
#[derive(Debug, Default)]
struct RenderLanes {
    depth: DepthPrepassLane,
    clustering: ClusteringLane,
    culling: LightCullingLane,
    shading: ForwardShadingLane,
    particles: LightParticleLane,
}

impl RenderLanes {
    fn each_mut(&mut self) -> [&mut dyn Lane; 5] {
        [
            &mut self.depth,
            &mut self.clustering,
            &mut self.culling,
            &mut self.shading,
            &mut self.particles,
        ]
    }

    fn initialize(device: &dyn GraphicsDevice, setup: &LaneSetup<'_>) -> Result<Self, LaneError> {
        let mut lanes = Self::default();
        let mut result = Ok(());
        for lane in lanes.each_mut() {
            log::info!(
                "FrameScheduler: Initializing lane '{}' ({})",
                lane.strategy_name(),
                lane.lane_kind()
            );
            result = lane.on_initialize(device, setup);
            if result.is_err() {
                break;
            }
        }
        match result {
            Ok(()) => Ok(lanes),
            Err(e) => {
                lanes.shutdown(device);
                Err(e)
            }
        }
    }

    fn shutdown(&mut self, device: &dyn GraphicsDevice) {
        for lane in self.each_mut() {
            lane.on_shutdown(device);
        }
    }
}

/// Records and submits clustered frames.
pub struct FrameScheduler {
    device: Arc<dyn GraphicsDevice>,
    config: RendererConfig,
    grid: ClusterGrid,
    pool: FramePool,
    targets: RenderTargets,
    lanes: RenderLanes,
    telemetry: TelemetryService,
    adapter_name: String,
    requested_extent: Extent2D,
    pending_transfer: Option<SemaphoreId>,
    light_staging: Vec<GpuPointLight>,
    light_list_capacity: u32,
    frames: u64,
    shut_down: bool,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("grid", &self.grid)
            .field("pool", &self.pool)
            .field("targets", &self.targets)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    /// Validates the configuration, then creates the frame pool, the render
    /// targets and every lane for the current surface.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned as [`RenderError::Config`] before
    /// any GPU resource is created.
    pub fn new(
        render_system: &mut dyn RenderSystem,
        config: RendererConfig,
        scene: &dyn SceneSource,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        let light_list_capacity = u32::try_from(config.light_list_capacity).map_err(|_| {
            ConfigError::LightListCapacityExceeded {
                requested: config.light_list_capacity,
                max: u32::MAX as usize,
            }
        })?;
        let device = render_system.graphics_device()?;
        let surface_format = render_system.surface_format().ok_or_else(|| {
            RenderError::InitializationFailed("surface format is unknown".to_string())
        })?;

        let surface = render_system.surface_extent();
        let requested = if surface.is_empty() {
            config.initial_extent()
        } else {
            surface
        };
        let extent = requested.clamp_to(config.max_extent());
        if extent != surface && !extent.is_empty() {
            render_system.resize(extent.width, extent.height);
        }
        let grid = ClusterGrid::from_viewport(&config, extent)?;

        let mut pool = FramePool::new(device.as_ref(), &config)?;
        let mut targets = match RenderTargets::new(device.as_ref(), extent) {
            Ok(targets) => targets,
            Err(e) => {
                pool.destroy(device.as_ref());
                return Err(e.into());
            }
        };
        let frames: Vec<FrameBindings> = pool.bindings();
        let setup = LaneSetup {
            config: &config,
            surface_format,
            depth_format: RenderTargets::DEPTH_FORMAT,
            scene: scene.buffers(),
            frames: &frames,
        };
        let lanes = match RenderLanes::initialize(device.as_ref(), &setup) {
            Ok(lanes) => lanes,
            Err(e) => {
                pool.destroy(device.as_ref());
                targets.destroy(device.as_ref());
                return Err(e.into());
            }
        };

        let adapter_name = device.get_adapter_info().name;
        log::info!(
            "FrameScheduler: Ready on '{}', grid {}x{}x{} for {}x{}",
            adapter_name,
            grid.tile_count_x(),
            grid.tile_count_y(),
            grid.depth_slices(),
            extent.width,
            extent.height
        );
        Ok(Self {
            device,
            telemetry: TelemetryService::new(config.text_refresh_interval()),
            light_staging: Vec::with_capacity(config.max_lights),
            light_list_capacity,
            config,
            grid,
            pool,
            targets,
            lanes,
            adapter_name,
            requested_extent: requested,
            pending_transfer: None,
            frames: 0,
            shut_down: false,
        })
    }

    /// The current cluster grid.
    pub fn grid(&self) -> &ClusterGrid {
        &self.grid
    }

    /// The frame slots.
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// The size-dependent targets.
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// The configuration the scheduler was built with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frame statistics and GPU timings.
    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Slots whose submissions have not all retired.
    pub fn outstanding_frames(&self) -> Result<usize, RenderError> {
        Ok(self.pool.outstanding(self.device.as_ref())?)
    }

    /// Records a new window size. The surface, the grid and the depth
    /// buffer are rebuilt for the size clamped to the configured maximum.
    ///
    /// Returns `true` if anything was rebuilt. An empty size only pauses
    /// rendering until the next non-empty one.
    pub fn handle_resize(
        &mut self,
        render_system: &mut dyn RenderSystem,
        width: u32,
        height: u32,
    ) -> Result<bool, RenderError> {
        self.requested_extent = Extent2D::new(width, height);
        if self.requested_extent.is_empty() {
            log::debug!("FrameScheduler: Window minimized, pausing");
            return Ok(false);
        }
        let extent = self.requested_extent.clamp_to(self.config.max_extent());
        if extent == self.targets.extent() && extent == render_system.surface_extent() {
            return Ok(false);
        }
        self.rebuild_size_dependent(render_system, extent)?;
        Ok(true)
    }

    fn rebuild_size_dependent(
        &mut self,
        render_system: &mut dyn RenderSystem,
        extent: Extent2D,
    ) -> Result<(), RenderError> {
        self.device.wait_idle()?;
        render_system.resize(extent.width, extent.height);
        let tiles_changed = self.grid.resize(extent);
        self.targets.rebuild(self.device.as_ref(), extent)?;
        log::info!(
            "FrameScheduler: Resized to {}x{}, grid {}x{}x{}{}",
            extent.width,
            extent.height,
            self.grid.tile_count_x(),
            self.grid.tile_count_y(),
            self.grid.depth_slices(),
            if tiles_changed { "" } else { " (unchanged)" }
        );
        Ok(())
    }

    /// Acquires a swapchain image, resizing and retrying while the surface
    /// reports itself stale. `None` means the frame must be dropped.
    fn acquire_surface_image(
        &mut self,
        render_system: &mut dyn RenderSystem,
        signal: SemaphoreId,
    ) -> Result<Option<SurfaceImage>, RenderError> {
        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            match render_system.acquire_image(signal)? {
                AcquireOutcome::Acquired(image) => return Ok(Some(image)),
                AcquireOutcome::Stale => {
                    log::debug!("FrameScheduler: Surface stale (attempt {attempt}), resizing");
                    let extent = self.requested_extent.clamp_to(self.config.max_extent());
                    if extent.is_empty() {
                        return Ok(None);
                    }
                    self.rebuild_size_dependent(render_system, extent)?;
                }
            }
        }
        log::warn!("FrameScheduler: Surface still stale after {MAX_ACQUIRE_ATTEMPTS} attempts");
        Ok(None)
    }

    /// Records, submits and presents one frame.
    ///
    /// # Errors
    ///
    /// A light count above the configured capacity is rejected with
    /// [`RenderError::Config`] before anything is acquired. Fence timeouts,
    /// submission failures and lane errors are fatal.
    pub fn render_frame(
        &mut self,
        render_system: &mut dyn RenderSystem,
        mut inputs: FrameInputs<'_>,
    ) -> Result<FrameOutcome, RenderError> {
        if self.shut_down {
            return Err(RenderError::NotInitialized);
        }
        self.config.check_light_count(inputs.lights.len())?;
        if self.requested_extent.is_empty() || render_system.surface_extent().is_empty() {
            return Ok(FrameOutcome::Skipped);
        }
        self.telemetry.begin_frame();

        let device = Arc::clone(&self.device);
        let slot_index = self.pool.acquire_next(device.as_ref())?;
        match self.pool.read_timings(device.as_ref(), slot_index) {
            Ok(Some(timings)) => self.telemetry.record_timings(timings),
            Ok(None) => {}
            Err(e) => log::warn!("FrameScheduler: Failed to read GPU timings: {e}"),
        }
        let slot = self
            .pool
            .slot(slot_index)
            .ok_or(RenderError::NotInitialized)?;
        let bindings = slot.bindings();
        let semaphores = slot.semaphores();
        let fences = slot.fences();
        let queries = slot.queries();

        let Some(image) = self.acquire_surface_image(render_system, semaphores.image_acquired)?
        else {
            self.pool.abandon(device.as_ref(), slot_index)?;
            return Ok(FrameOutcome::Skipped);
        };
        let depth_view = self
            .targets
            .depth_view()
            .ok_or(RenderError::NotInitialized)?;

        let num_lights = inputs.lights.len() as u32;
        inputs.lights.write_gpu(&mut self.light_staging);
        if !self.light_staging.is_empty() {
            device.write_buffer(bindings.lights, 0, bytemuck::cast_slice(&self.light_staging))?;
        }
        let uniforms = self.grid.uniforms(
            inputs.camera,
            &inputs.scene.model_matrix(),
            num_lights,
            self.light_list_capacity,
        );
        device.write_buffer(bindings.uniforms, 0, bytemuck::bytes_of(&uniforms))?;

        if self.telemetry.tick() {
            let text = self.telemetry.overlay_text(
                &self.adapter_name,
                self.grid.viewport(),
                inputs.lights.len(),
            );
            inputs.overlay.set_text(&text);
        }

        let ctx = FrameContext {
            slot: slot_index,
            grid: &self.grid,
            num_lights,
            scene: inputs.scene,
            timestamps: queries.map(|q| q.timestamps),
        };
        let submit = Submitter {
            device: device.as_ref(),
            fences,
        };

        // Geometry: depth pre-pass, then cluster flags from the visible fragments.
        let mut encoder = device.create_command_encoder(Some("geometry"));
        encoder.memory_barrier(MemoryBarrier::HOST_TO_SHADER);
        let depth_draws = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("depth pre-pass"),
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                }),
                timestamp_writes: ctx.timestamps.map(|t| t.writes(GpuStage::Depth)),
                ..Default::default()
            });
            self.lanes.depth.record(pass.as_mut(), &ctx)?
        };
        let cluster_draws = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("clustering"),
                depth_stencil_attachment: Some(read_only_depth(depth_view)),
                timestamp_writes: ctx.timestamps.map(|t| t.writes(GpuStage::Clustering)),
                ..Default::default()
            });
            self.lanes.clustering.record(pass.as_mut(), &ctx)?
        };
        let shared_wait: Vec<SemaphoreId> = match self.config.transient_policy {
            TransientPolicy::Shared => self.pending_transfer.take().into_iter().collect(),
            TransientPolicy::PerSlot => Vec::new(),
        };
        submit.run(
            FrameSubmission::Geometry,
            encoder,
            &shared_wait,
            &[semaphores.geometry_done],
        )?;

        // Culling: stages A, B and C on the compute queue.
        let mut encoder = device.create_command_encoder(Some("culling"));
        encoder.memory_barrier(MemoryBarrier::HOST_TO_SHADER);
        self.lanes.culling.record(encoder.as_mut(), &ctx)?;
        submit.run(
            FrameSubmission::Culling,
            encoder,
            &[semaphores.geometry_done],
            &[semaphores.culling_done],
        )?;

        // Shading: lit geometry, light particles and overlay into the swapchain image.
        let mut encoder = device.create_command_encoder(Some("shading"));
        let color = [RenderPassColorAttachment {
            view: image.view,
            ops: Operations {
                load: LoadOp::Clear(CLEAR_COLOR),
                store: StoreOp::Store,
            },
        }];
        let shading = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("on-screen"),
                color_attachments: &color,
                depth_stencil_attachment: Some(read_only_depth(depth_view)),
                timestamp_writes: ctx.timestamps.map(|t| t.writes(GpuStage::Onscreen)),
            });
            let shading = self.lanes.shading.record(pass.as_mut(), &ctx)?;
            self.lanes.particles.record(pass.as_mut(), &ctx)?;
            inputs.overlay.record(pass.as_mut())?;
            shading
        };
        submit.run(
            FrameSubmission::Shading,
            encoder,
            &[semaphores.culling_done, semaphores.image_acquired],
            &[semaphores.render_done, semaphores.shading_done],
        )?;

        // Transfer: zero the transient cluster state once shading stopped reading it.
        let mut encoder = device.create_command_encoder(Some("transfer"));
        record_transient_clears(encoder.as_mut(), &bindings, queries);
        let transfer_signal: &[SemaphoreId] = match self.config.transient_policy {
            TransientPolicy::Shared => std::slice::from_ref(&semaphores.transfer_done),
            TransientPolicy::PerSlot => &[],
        };
        submit.run(
            FrameSubmission::Transfer,
            encoder,
            &[semaphores.shading_done],
            transfer_signal,
        )?;
        if self.config.transient_policy == TransientPolicy::Shared {
            self.pending_transfer = Some(semaphores.transfer_done);
        }
        self.pool.schedule_readback(device.as_ref(), slot_index);

        render_system.present(image, &[semaphores.render_done])?;

        let report = FrameReport {
            slot: slot_index,
            frame: self.frames,
            depth_draws,
            cluster_draws,
            shading,
            lights: num_lights,
        };
        self.frames += 1;
        log::trace!("FrameScheduler: {report:?}");
        Ok(FrameOutcome::Presented(report))
    }

    /// Waits for every in-flight frame, then releases lanes, frame slots and
    /// render targets in that order. Calling it twice is a no-op.
    ///
    /// Resources are released even if the wait fails; the wait's error is
    /// returned.
    pub fn shutdown(&mut self) -> Result<(), RenderError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        let device = Arc::clone(&self.device);
        let waited = self
            .pool
            .wait_all(device.as_ref())
            .map_err(RenderError::from)
            .and_then(|()| device.wait_idle());
        if let Err(e) = &waited {
            log::error!("FrameScheduler: Wait before shutdown failed: {e}");
        }
        self.lanes.shutdown(device.as_ref());
        self.pool.destroy(device.as_ref());
        self.targets.destroy(device.as_ref());
        log::info!("FrameScheduler: Shut down after {} frames", self.frames);
        waited
    }
}

/// Submits one finished encoder with the slot's fence for that submission.
struct Submitter<'a> {
    device: &'a dyn GraphicsDevice,
    fences: [FenceId; 4],
}

impl Submitter<'_> {
    fn run(
        &self,
        submission: FrameSubmission,
        encoder: Box<dyn CommandEncoder>,
        wait: &[SemaphoreId],
        signal: &[SemaphoreId],
    ) -> Result<(), RenderError> {
        let command_buffer = encoder.finish();
        self.device.submit(
            submission.queue(),
            &SubmitInfo {
                label: Some(submission.label()),
                command_buffers: &[command_buffer],
                wait_semaphores: wait,
                signal_semaphores: signal,
                fence: Some(self.fences[submission as usize]),
            },
        )
    }
}

fn read_only_depth(view: TextureViewId) -> RenderPassDepthStencilAttachment {
    RenderPassDepthStencilAttachment {
        view,
        depth_ops: None,
    }
}

/// Clears every transient cluster buffer between barriers, with the transfer
/// timestamps around the clears, then resolves the slot's queries.
fn record_transient_clears(
    encoder: &mut dyn CommandEncoder,
    bindings: &FrameBindings,
    queries: Option<SlotQueries>,
) {
    let transfer = queries.map(|q| q.timestamps.writes(GpuStage::Transfer));
    encoder.memory_barrier(MemoryBarrier::SHADER_TO_TRANSFER);
    if let Some(writes) = transfer {
        encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("transfer begin"),
            timestamp_writes: Some(PassTimestampWrites {
                end_of_pass_write_index: None,
                ..writes
            }),
        });
    }
    for buffer in bindings.cluster.all() {
        encoder.clear_buffer(buffer, 0, None);
    }
    if let Some(writes) = transfer {
        encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("transfer end"),
            timestamp_writes: Some(PassTimestampWrites {
                beginning_of_pass_write_index: None,
                ..writes
            }),
        });
    }
    encoder.memory_barrier(MemoryBarrier::TRANSFER_TO_SHADER);
    if let Some(queries) = queries {
        encoder.resolve_query_set(
            queries.timestamps.query_set,
            0..GpuStage::QUERY_COUNT,
            queries.resolve,
            0,
        );
        encoder.copy_buffer_to_buffer(
            queries.resolve,
            0,
            queries.readback,
            0,
            SlotQueries::RESOLVE_SIZE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_depth_has_no_ops() {
        assert!(read_only_depth(TextureViewId(3)).depth_ops.is_none());
    }

    #[test]
    fn test_submissions_use_distinct_fences() {
        let fences = [FenceId(10), FenceId(11), FenceId(12), FenceId(13)];
        let picked: Vec<_> = FrameSubmission::ALL
            .iter()
            .map(|s| fences[*s as usize])
            .collect();
        assert_eq!(picked, fences.to_vec());
    }
}
