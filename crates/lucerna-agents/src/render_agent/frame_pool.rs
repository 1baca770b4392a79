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

//! The rotating set of per-frame GPU resources.
//!
//! Every frame slot owns its uniform and light buffers, one completion fence
//! per queue submission, the semaphores that chain those submissions, and
//! optionally a timestamp query set. The transient cluster buffers are owned
//! per slot or shared, following [`TransientPolicy`].
//!
//! Buffers are sized once from [`RendererConfig`] for the maximum light count
//! and the cluster grid of the largest viewport. They are never resized.

use lucerna_core::lane::{ClusterBuffers, FrameBindings};
use lucerna_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, ClusterBox, ClusterUniforms, FenceId,
    FrameTimestamps, GpuPointLight, GpuStage, GraphicsDevice, QuerySetDescriptor, QuerySetId,
    QueueKind, RenderError, RendererConfig, ResourceError, SemaphoreId, StageTimings, SubmitInfo,
    SyncError, TransientPolicy, TIMESTAMP_SIZE,
};
use std::mem::size_of;
use std::time::Duration;

/// The queue submissions of one frame. Each retires its own fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSubmission {
    /// Depth pre-pass and clustering pass.
    Geometry,
    /// The three light-culling stages.
    Culling,
    /// Forward shading, particles and overlay.
    Shading,
    /// The transient-buffer clears and query resolve.
    Transfer,
}

impl FrameSubmission {
    /// Every submission, in recording order.
    pub const ALL: [FrameSubmission; 4] = [
        FrameSubmission::Geometry,
        FrameSubmission::Culling,
        FrameSubmission::Shading,
        FrameSubmission::Transfer,
    ];

    /// The queue the submission goes to.
    pub fn queue(&self) -> QueueKind {
        match self {
            FrameSubmission::Culling => QueueKind::Compute,
            _ => QueueKind::Graphics,
        }
    }

    /// Label used for submissions and logs.
    pub fn label(&self) -> &'static str {
        match self {
            FrameSubmission::Geometry => "geometry",
            FrameSubmission::Culling => "culling",
            FrameSubmission::Shading => "shading",
            FrameSubmission::Transfer => "transfer",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Semaphores chaining the submissions of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSemaphores {
    /// Signaled by the presentation engine when the swapchain image is ready.
    pub image_acquired: SemaphoreId,
    /// Geometry → culling.
    pub geometry_done: SemaphoreId,
    /// Culling → shading.
    pub culling_done: SemaphoreId,
    /// Shading → present.
    pub render_done: SemaphoreId,
    /// Shading → transfer.
    pub shading_done: SemaphoreId,
    /// Transfer → next frame's geometry, only with shared transient buffers.
    pub transfer_done: SemaphoreId,
}

impl FrameSemaphores {
    fn create(device: &dyn GraphicsDevice) -> Result<Self, SyncError> {
        Ok(Self {
            image_acquired: device.create_semaphore()?,
            geometry_done: device.create_semaphore()?,
            culling_done: device.create_semaphore()?,
            render_done: device.create_semaphore()?,
            shading_done: device.create_semaphore()?,
            transfer_done: device.create_semaphore()?,
        })
    }

    fn all(&self) -> [SemaphoreId; 6] {
        [
            self.image_acquired,
            self.geometry_done,
            self.culling_done,
            self.render_done,
            self.shading_done,
            self.transfer_done,
        ]
    }
}

/// Timestamp queries of one slot and the buffers they are read back through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQueries {
    /// The query set written by the passes.
    pub timestamps: FrameTimestamps,
    /// Target of the query resolve.
    pub resolve: BufferId,
    /// Host-readable copy of `resolve`.
    pub readback: BufferId,
}

impl SlotQueries {
    /// Size in bytes of one slot's resolved timestamps.
    pub const RESOLVE_SIZE: u64 = GpuStage::QUERY_COUNT as u64 * TIMESTAMP_SIZE;

    fn create(device: &dyn GraphicsDevice, index: usize) -> Result<Self, ResourceError> {
        let query_set = device.create_query_set(&QuerySetDescriptor {
            label: Some("frame timestamps"),
            count: GpuStage::QUERY_COUNT,
        })?;
        let resolve = device.create_buffer(&BufferDescriptor::new(
            "timestamp resolve",
            Self::RESOLVE_SIZE,
            BufferUsage::QUERY_RESOLVE | BufferUsage::COPY_SRC,
        ))?;
        let readback = device.create_buffer(&BufferDescriptor::new(
            "timestamp readback",
            Self::RESOLVE_SIZE,
            BufferUsage::MAP_READ | BufferUsage::COPY_DST,
        ))?;
        log::debug!("FramePool: Created timestamp queries for slot {index}");
        Ok(Self {
            timestamps: FrameTimestamps { query_set },
            resolve,
            readback,
        })
    }
}

/// One rotating set of per-frame resources.
#[derive(Debug)]
pub struct FrameSlot {
    index: usize,
    bindings: FrameBindings,
    semaphores: FrameSemaphores,
    fences: [FenceId; 4],
    queries: Option<SlotQueries>,
    readback_in_flight: bool,
}

impl FrameSlot {
    /// Position of the slot in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The buffers the lanes bind for this slot.
    pub fn bindings(&self) -> FrameBindings {
        self.bindings
    }

    /// The slot's semaphores.
    pub fn semaphores(&self) -> FrameSemaphores {
        self.semaphores
    }

    /// The completion fence of one submission.
    pub fn fence(&self, submission: FrameSubmission) -> FenceId {
        self.fences[submission.index()]
    }

    /// Every completion fence.
    pub fn fences(&self) -> [FenceId; 4] {
        self.fences
    }

    /// Timestamp queries to record this frame. `None` when the adapter
    /// lacks timestamps or the previous readback is still being mapped.
    pub fn queries(&self) -> Option<SlotQueries> {
        self.queries.filter(|_| !self.readback_in_flight)
    }

    /// Whether the readback buffer has a map in flight.
    pub fn readback_in_flight(&self) -> bool {
        self.readback_in_flight
    }
}

/// N frame slots handed out in round-robin order.
#[derive(Debug)]
pub struct FramePool {
    slots: Vec<FrameSlot>,
    shared_cluster: Option<ClusterBuffers>,
    next: usize,
    fence_timeout: Duration,
    timestamp_period: Option<f32>,
    destroyed: bool,
}

fn storage_buffer(
    device: &dyn GraphicsDevice,
    label: &str,
    size: u64,
) -> Result<BufferId, ResourceError> {
    device.create_buffer(&BufferDescriptor::new(
        label,
        size.max(4),
        BufferUsage::STORAGE | BufferUsage::COPY_DST,
    ))
}

fn create_cluster_buffers(
    device: &dyn GraphicsDevice,
    config: &RendererConfig,
) -> Result<ClusterBuffers, ResourceError> {
    let per_cluster = config.max_clusters() as u64 * size_of::<u32>() as u64;
    Ok(ClusterBuffers {
        flags: storage_buffer(device, "cluster flags", per_cluster)?,
        light_bounds: storage_buffer(
            device,
            "light bounds",
            config.max_lights as u64 * size_of::<ClusterBox>() as u64,
        )?,
        counts: storage_buffer(device, "cluster light counts", per_cluster)?,
        offsets: storage_buffer(device, "cluster light offsets", per_cluster)?,
        claimed: storage_buffer(device, "cluster claimed slots", per_cluster)?,
        total: storage_buffer(device, "light list total", size_of::<u32>() as u64)?,
        light_list: storage_buffer(
            device,
            "light index list",
            config.light_list_capacity as u64 * size_of::<u32>() as u64,
        )?,
    })
}

impl FramePool {
    /// Creates `config.frames_in_flight` slots. Fences start signaled so the
    /// first acquisition of every slot does not wait.
    pub fn new(device: &dyn GraphicsDevice, config: &RendererConfig) -> Result<Self, RenderError> {
        let count = config.frames_in_flight;
        let timestamp_period = device.timestamp_period();
        let mut pool = Self {
            slots: Vec::with_capacity(count),
            shared_cluster: None,
            next: 0,
            fence_timeout: config.fence_timeout(),
            timestamp_period,
            destroyed: false,
        };
        if let Err(e) = pool.populate(device, config) {
            pool.destroy(device);
            return Err(e);
        }
        log::info!(
            "FramePool: {} slots, {} clusters, {} lights, {:?} transient buffers, timestamps {}",
            count,
            config.max_clusters(),
            config.max_lights,
            config.transient_policy,
            if pool.timestamp_period.is_some() { "on" } else { "off" }
        );
        Ok(pool)
    }

    fn populate(
        &mut self,
        device: &dyn GraphicsDevice,
        config: &RendererConfig,
    ) -> Result<(), RenderError> {
        if config.transient_policy == TransientPolicy::Shared {
            self.shared_cluster = Some(create_cluster_buffers(device, config)?);
        }
        for index in 0..config.frames_in_flight {
            let uniforms = device.create_buffer(&BufferDescriptor::new(
                "frame uniforms",
                size_of::<ClusterUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            ))?;
            let lights = storage_buffer(
                device,
                "frame lights",
                config.max_lights.max(1) as u64 * size_of::<GpuPointLight>() as u64,
            )?;
            let cluster = match self.shared_cluster {
                Some(shared) => shared,
                None => create_cluster_buffers(device, config)?,
            };
            let semaphores = FrameSemaphores::create(device)?;
            let fences = [
                device.create_fence(true)?,
                device.create_fence(true)?,
                device.create_fence(true)?,
                device.create_fence(true)?,
            ];
            let queries = match self.timestamp_period {
                Some(_) => match SlotQueries::create(device, index) {
                    Ok(queries) => Some(queries),
                    Err(e) => {
                        log::warn!("FramePool: Timestamp queries disabled: {e}");
                        self.timestamp_period = None;
                        None
                    }
                },
                None => None,
            };
            self.slots.push(FrameSlot {
                index,
                bindings: FrameBindings {
                    uniforms,
                    lights,
                    cluster,
                },
                semaphores,
                fences,
                queries,
                readback_in_flight: false,
            });
        }
        if self.timestamp_period.is_none() {
            for slot in &mut self.slots {
                if let Some(queries) = slot.queries.take() {
                    release_queries(device, &queries);
                }
            }
        }
        Ok(())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the pool holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// A slot by index.
    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    /// The bindings of every slot, in slot order.
    pub fn bindings(&self) -> Vec<FrameBindings> {
        self.slots.iter().map(|slot| slot.bindings).collect()
    }

    /// Whether timestamp queries are recorded.
    pub fn has_timestamps(&self) -> bool {
        self.timestamp_period.is_some()
    }

    /// Waits for the next slot's previous submissions to retire, resets its
    /// fences and returns its index.
    ///
    /// # Errors
    ///
    /// A fence that is not signaled within the configured timeout is a
    /// device fault and is returned as a fatal [`RenderError::Sync`].
    pub fn acquire_next(&mut self, device: &dyn GraphicsDevice) -> Result<usize, RenderError> {
        let slot = self
            .slots
            .get(self.next)
            .ok_or(RenderError::NotInitialized)?;
        for fence in slot.fences {
            device.wait_for_fence(fence, self.fence_timeout)?;
        }
        for fence in slot.fences {
            device.reset_fence(fence)?;
        }
        let index = slot.index;
        self.next = (index + 1) % self.slots.len();
        log::trace!("FramePool: Acquired slot {index}");
        Ok(index)
    }

    /// Re-signals the fences of a slot that was acquired but never submitted,
    /// so its next acquisition does not wait forever.
    pub fn abandon(&mut self, device: &dyn GraphicsDevice, index: usize) -> Result<(), RenderError> {
        let slot = self.slots.get(index).ok_or(RenderError::NotInitialized)?;
        for submission in FrameSubmission::ALL {
            device.submit(
                submission.queue(),
                &SubmitInfo {
                    label: Some("abandoned frame"),
                    fence: Some(slot.fence(submission)),
                    ..Default::default()
                },
            )?;
        }
        log::debug!("FramePool: Abandoned slot {index}");
        Ok(())
    }

    /// Number of slots with at least one unsignaled fence.
    pub fn outstanding(&self, device: &dyn GraphicsDevice) -> Result<usize, SyncError> {
        let mut outstanding = 0;
        for slot in &self.slots {
            let mut retired = true;
            for fence in slot.fences {
                retired &= device.is_fence_signaled(fence)?;
            }
            if !retired {
                outstanding += 1;
            }
        }
        Ok(outstanding)
    }

    /// Waits for every slot's submissions to retire.
    pub fn wait_all(&self, device: &dyn GraphicsDevice) -> Result<(), SyncError> {
        for slot in &self.slots {
            for fence in slot.fences {
                device.wait_for_fence(fence, self.fence_timeout)?;
            }
        }
        Ok(())
    }

    /// Starts mapping the timestamps the slot's transfer submission copied
    /// into its readback buffer. Does nothing if this frame recorded none.
    pub fn schedule_readback(&mut self, device: &dyn GraphicsDevice, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(queries) = slot.queries() else {
            return;
        };
        match device.map_buffer_read(queries.readback, 0, SlotQueries::RESOLVE_SIZE) {
            Ok(()) => slot.readback_in_flight = true,
            Err(e) => log::warn!("FramePool: Failed to map timestamps of slot {index}: {e}"),
        }
    }

    /// Collects the slot's timestamps from its previous frame if their map
    /// has completed. Only valid after [`Self::acquire_next`] returned this
    /// slot. Never waits on the GPU.
    pub fn read_timings(
        &mut self,
        device: &dyn GraphicsDevice,
        index: usize,
    ) -> Result<Option<StageTimings>, ResourceError> {
        let (Some(period), Some(slot)) = (self.timestamp_period, self.slots.get_mut(index)) else {
            return Ok(None);
        };
        let Some(queries) = slot.queries.filter(|_| slot.readback_in_flight) else {
            return Ok(None);
        };
        let bytes = match device.try_read_mapped(queries.readback) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::trace!("FramePool: Timestamps of slot {index} not mapped yet");
                return Ok(None);
            }
            Err(e) => {
                slot.readback_in_flight = false;
                return Err(e);
            }
        };
        slot.readback_in_flight = false;
        let raw: Vec<u64> = bytemuck::pod_collect_to_vec(&bytes);
        Ok(Some(StageTimings::from_raw(&raw, period)))
    }

    /// Releases every resource. The GPU must be idle. Calling it twice is a
    /// no-op.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for slot in self.slots.drain(..) {
            release_buffer(device, slot.bindings.uniforms);
            release_buffer(device, slot.bindings.lights);
            if self.shared_cluster.is_none() {
                for buffer in slot.bindings.cluster.all() {
                    release_buffer(device, buffer);
                }
            }
            for semaphore in slot.semaphores.all() {
                if let Err(e) = device.destroy_semaphore(semaphore) {
                    log::warn!("FramePool: Failed to destroy semaphore {semaphore:?}: {e}");
                }
            }
            for fence in slot.fences {
                if let Err(e) = device.destroy_fence(fence) {
                    log::warn!("FramePool: Failed to destroy fence {fence:?}: {e}");
                }
            }
            if let Some(queries) = slot.queries {
                release_queries(device, &queries);
            }
        }
        if let Some(shared) = self.shared_cluster.take() {
            for buffer in shared.all() {
                release_buffer(device, buffer);
            }
        }
        log::debug!("FramePool: Destroyed");
    }
}

fn release_buffer(device: &dyn GraphicsDevice, buffer: BufferId) {
    if let Err(e) = device.destroy_buffer(buffer) {
        log::warn!("FramePool: Failed to destroy buffer {buffer:?}: {e}");
    }
}

fn release_queries(device: &dyn GraphicsDevice, queries: &SlotQueries) {
    release_query_set(device, queries.timestamps.query_set);
    release_buffer(device, queries.resolve);
    release_buffer(device, queries.readback);
}

fn release_query_set(device: &dyn GraphicsDevice, query_set: QuerySetId) {
    if let Err(e) = device.destroy_query_set(query_set) {
        log::warn!("FramePool: Failed to destroy query set {query_set:?}: {e}");
    }
}
