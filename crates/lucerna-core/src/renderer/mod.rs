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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module defines the traits (like [`GraphicsDevice`]), the descriptors
//! (like [`BufferDescriptor`]) and the error types shared by the render lanes,
//! the frame scheduler and the wgpu backend. It also holds the renderer's
//! data model: the cluster grid, lights, camera and configuration.

pub mod api;
pub mod camera;
pub mod cluster;
pub mod config;
pub mod error;
pub mod light;
pub mod overlay;
pub mod scene;
pub mod timing;
pub mod traits;

pub use self::api::*;
pub use self::camera::Camera;
pub use self::cluster::{ClusterBox, ClusterFlags, ClusterGrid, ClusterUniforms};
pub use self::config::{DepthSlicing, RendererConfig, TransientPolicy, MAX_FRAMES_IN_FLIGHT};
pub use self::error::{
    ConfigError, PipelineError, RenderError, ResourceError, ShaderError, SyncError,
};
pub use self::light::{GpuPointLight, LightField, PointLight};
pub use self::overlay::{NullOverlay, TextOverlay};
pub use self::scene::{GpuMaterial, MeshScene, SceneBuffers, SceneSource, SubMesh, Vertex};
pub use self::timing::{FrameTimestamps, GpuStage, StageTimings};
pub use self::traits::*;
