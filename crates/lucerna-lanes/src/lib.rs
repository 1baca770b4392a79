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

//! Hot-path strategies of the clustered renderer.
//!
//! - [`light_list`]: the three-stage per-cluster light-list build on the CPU.
//! - [`render_lane`]: the GPU lanes recorded by the frame scheduler.

#![warn(missing_docs)]

pub mod light_list;
pub mod render_lane;

pub use light_list::{BuildStage, LightListBuilder, LightListError, LightListStats};
pub use render_lane::{
    ClusteringLane, DepthPrepassLane, ForwardShadingLane, LightCullingLane, LightParticleLane,
    ShadingDraws,
};
