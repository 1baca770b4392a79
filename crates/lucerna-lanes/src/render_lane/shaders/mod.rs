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

//! Built-in WGSL sources for the clustered render lanes.
//!
//! Every module starts with [`CLUSTER_COMMON_WGSL`], which declares the frame
//! uniforms, the light and material arrays (bind group 0), the cluster
//! addressing helpers and the shared geometry vertex stage `vs_geometry`.
//! Group 1 is declared per module since its access modes differ per pass.
//!
//! # Available Shaders
//!
//! - [`DEPTH_PREPASS_WGSL`] - Depth-only geometry
//! - [`CLUSTERING_WGSL`] - Marks clusters that contain visible fragments
//! - [`LIGHT_CULLING_WGSL`] - The three light-list stages (`compute_flags`,
//!   `compute_offsets`, `compute_list`)
//! - [`FORWARD_SHADING_WGSL`] - Lit geometry reading its cluster's light list
//! - [`LIGHT_PARTICLES_WGSL`] - One billboard per light

/// Declarations shared by every clustered pass.
pub const CLUSTER_COMMON_WGSL: &str = include_str!("cluster_common.wgsl");

/// Depth pre-pass. Uses `vs_geometry` without a fragment stage.
pub const DEPTH_PREPASS_WGSL: &str = CLUSTER_COMMON_WGSL;

/// Clustering pass, fragment entry point `fs_clustering`.
pub const CLUSTERING_WGSL: &str = concat!(
    include_str!("cluster_common.wgsl"),
    include_str!("clustering.wgsl")
);

/// Light culling compute stages.
///
/// Stage A and C run 32 invocations per workgroup along x (one per light);
/// stage B runs 16x16 tiles per workgroup with one depth slice per z.
pub const LIGHT_CULLING_WGSL: &str = concat!(
    include_str!("cluster_common.wgsl"),
    include_str!("light_culling.wgsl")
);

/// Forward shading, fragment entry point `fs_forward`.
pub const FORWARD_SHADING_WGSL: &str = concat!(
    include_str!("cluster_common.wgsl"),
    include_str!("forward_shading.wgsl")
);

/// Light debug particles, entry points `vs_particle` and `fs_particle`.
pub const LIGHT_PARTICLES_WGSL: &str = concat!(
    include_str!("cluster_common.wgsl"),
    include_str!("light_particles.wgsl")
);
