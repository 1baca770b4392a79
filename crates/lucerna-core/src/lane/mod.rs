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

//! # Lane Abstraction
//!
//! A **Lane** is one GPU processing strategy of the frame: the depth pre-pass,
//! the clustering pass, light culling, forward shading or the light debug
//! particles. Lanes own their pipelines and bind groups; the frame scheduler
//! owns the passes and decides when each lane records.
//!
//! The set of lanes is fixed and each one is a concrete type selected when the
//! scheduler is built. The [`Lane`] trait only covers what they share: identity
//! and the initialize/shutdown lifecycle.

use crate::renderer::{
    BufferId, ClusterGrid, FrameTimestamps, GraphicsDevice, RenderError, RendererConfig,
    SceneBuffers, SceneSource, TextureFormat,
};
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane has not been initialized yet.
    NotInitialized,
    /// No resources were prepared for the requested frame slot.
    UnknownFrameSlot(usize),
    /// A domain-specific error occurred during execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A domain-specific error occurred during initialization.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized => write!(f, "Lane not initialized"),
            LaneError::UnknownFrameSlot(slot) => write!(f, "No resources for frame slot {slot}"),
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
            LaneError::InitializationFailed(e) => write!(f, "Lane initialization failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) | LaneError::InitializationFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<LaneError> for RenderError {
    fn from(e: LaneError) -> Self {
        match e {
            LaneError::NotInitialized => RenderError::NotInitialized,
            LaneError::InitializationFailed(e) => RenderError::InitializationFailed(e.to_string()),
            other => RenderError::RenderingFailed(other.to_string()),
        }
    }
}

/// Classification of lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Depth-only geometry pass.
    DepthPrepass,
    /// Per-cluster visibility flags.
    Clustering,
    /// Per-cluster light lists.
    LightCulling,
    /// Lit geometry.
    Shading,
    /// Debug visualization.
    Debug,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::DepthPrepass => write!(f, "DepthPrepass"),
            LaneKind::Clustering => write!(f, "Clustering"),
            LaneKind::LightCulling => write!(f, "LightCulling"),
            LaneKind::Shading => write!(f, "Shading"),
            LaneKind::Debug => write!(f, "Debug"),
        }
    }
}

/// The transient cluster-state buffers written by the culling stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterBuffers {
    /// One `u32` of [`ClusterFlags`](crate::renderer::ClusterFlags) per cluster.
    pub flags: BufferId,
    /// One [`ClusterBox`](crate::renderer::ClusterBox) per light.
    pub light_bounds: BufferId,
    /// One atomic light count per cluster.
    pub counts: BufferId,
    /// One offset into the light index list per cluster.
    pub offsets: BufferId,
    /// One atomic claimed-slot counter per cluster.
    pub claimed: BufferId,
    /// A single atomic running total of light/cluster pairs.
    pub total: BufferId,
    /// The global light index list.
    pub light_list: BufferId,
}

impl ClusterBuffers {
    /// Every buffer, in a fixed order.
    pub fn all(&self) -> [BufferId; 7] {
        [
            self.flags,
            self.light_bounds,
            self.counts,
            self.offsets,
            self.claimed,
            self.total,
            self.light_list,
        ]
    }
}

/// The buffers a lane binds for one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBindings {
    /// Per-frame [`ClusterUniforms`](crate::renderer::ClusterUniforms).
    pub uniforms: BufferId,
    /// Per-frame [`GpuPointLight`](crate::renderer::GpuPointLight) array.
    pub lights: BufferId,
    /// Cluster state, owned by the slot or shared between slots.
    pub cluster: ClusterBuffers,
}

/// Everything a lane needs to create its pipelines and bind groups.
#[derive(Debug, Clone, Copy)]
pub struct LaneSetup<'a> {
    /// The renderer configuration.
    pub config: &'a RendererConfig,
    /// Format of the presentation surface.
    pub surface_format: TextureFormat,
    /// Format of the depth buffer.
    pub depth_format: TextureFormat,
    /// The scene's buffers.
    pub scene: SceneBuffers,
    /// One entry per frame slot.
    pub frames: &'a [FrameBindings],
}

/// Per-frame state passed to a lane when it records.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Index of the frame slot being recorded.
    pub slot: usize,
    /// The current cluster grid.
    pub grid: &'a ClusterGrid,
    /// Number of lights uploaded for this frame.
    pub num_lights: u32,
    /// The scene being drawn.
    pub scene: &'a dyn SceneSource,
    /// Timestamp queries of the slot, if the adapter supports them.
    pub timestamps: Option<FrameTimestamps>,
}

/// The base trait shared by every lane.
pub trait Lane: Send + Sync {
    /// A short name identifying the strategy, used in logs.
    fn strategy_name(&self) -> &'static str;

    /// The kind of work this lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Creates the lane's pipelines and per-slot bind groups.
    fn on_initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        setup: &LaneSetup<'_>,
    ) -> Result<(), LaneError>;

    /// Releases every GPU resource the lane owns.
    fn on_shutdown(&mut self, device: &dyn GraphicsDevice);
}
