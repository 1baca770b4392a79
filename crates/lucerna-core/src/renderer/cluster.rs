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

//! The cluster grid: screen tiles crossed with depth slices.
//!
//! A cluster is addressed either by its coordinates `(x, y, z)` or by its
//! linear index `x + y * tile_count_x + z * tile_count_x * tile_count_y`. Tile
//! counts follow the viewport on every resize while the depth slice count stays
//! fixed, so the depth range a light covers depends only on its view-space
//! depth.

use super::camera::Camera;
use super::config::{DepthSlicing, RendererConfig};
use super::error::ConfigError;
use crate::lucerna_bitflags;
use crate::math::{Extent2D, Mat4, Vec3, Vec4};

lucerna_bitflags! {
    /// Per-cluster state bits written during a frame.
    pub struct ClusterFlags: u32 {
        /// A visible fragment fell into the cluster during the clustering pass.
        const VISIBLE = 1 << 0;
        /// At least one light overlaps the cluster (set by the bounds stage).
        const ACTIVE = 1 << 1;
    }
}

/// An inclusive box of cluster coordinates covered by one light.
///
/// The layout matches the six integers the culling shaders store per light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClusterBox {
    /// Smallest covered tile x, tile y and depth slice.
    pub min: [u32; 3],
    /// Largest covered tile x, tile y and depth slice.
    pub max: [u32; 3],
}

impl ClusterBox {
    /// A box that covers no cluster.
    pub const EMPTY: Self = Self {
        min: [1, 1, 1],
        max: [0, 0, 0],
    };

    /// Creates a box from inclusive corners.
    pub const fn new(min: [u32; 3], max: [u32; 3]) -> Self {
        Self { min, max }
    }

    /// Returns `true` if the box covers no cluster.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Number of clusters inside the box, saturating at `usize::MAX`.
    pub fn cluster_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..3)
            .map(|i| ((self.max[i] - self.min[i]) as usize).saturating_add(1))
            .fold(1usize, usize::saturating_mul)
    }

    /// Returns `true` if the coordinates lie inside the box.
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        let p = [x, y, z];
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

impl Default for ClusterBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Uniform block shared by every pass of a frame.
///
/// The field order and padding mirror the `FrameUniforms` struct declared in
/// the WGSL shaders.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClusterUniforms {
    /// World-to-view transform.
    pub view: [[f32; 4]; 4],
    /// View-to-clip transform.
    pub projection: [[f32; 4]; 4],
    /// Model-to-world transform of the scene.
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model transform.
    pub normal: [[f32; 4]; 4],
    /// Camera position in world space, `w = 1`.
    pub camera_position: [f32; 4],
    /// Viewport size in pixels.
    pub resolution: [f32; 2],
    /// Tile size in pixels.
    pub tile_size: [u32; 2],
    /// Tile counts and depth slice count.
    pub grid_dim: [u32; 3],
    /// Number of lights uploaded this frame.
    pub num_lights: u32,
    /// Near plane distance.
    pub cam_near: f32,
    /// Far plane distance.
    pub cam_far: f32,
    /// [`DepthSlicing::as_u32`].
    pub depth_slicing: u32,
    /// Capacity of the global light index list.
    pub light_list_capacity: u32,
}

/// Screen tiles crossed with depth slices.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGrid {
    viewport: Extent2D,
    max_viewport: Extent2D,
    tile_size: Extent2D,
    tile_count_x: u32,
    tile_count_y: u32,
    depth_slices: u32,
    near: f32,
    far: f32,
    slicing: DepthSlicing,
}

fn tile_count(extent: u32, tile: u32) -> u32 {
    (extent.max(1) - 1) / tile + 1
}

impl ClusterGrid {
    /// Creates a grid for `viewport`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero tile size, zero depth slices or an
    /// invalid depth range.
    pub fn new(
        viewport: Extent2D,
        tile_size: Extent2D,
        depth_slices: u32,
        near: f32,
        far: f32,
        slicing: DepthSlicing,
    ) -> Result<Self, ConfigError> {
        if tile_size.is_empty() {
            return Err(ConfigError::ZeroTileSize);
        }
        if depth_slices == 0 {
            return Err(ConfigError::ZeroDepthSlices);
        }
        if !(near > 0.0 && far > near) {
            return Err(ConfigError::InvalidDepthRange { near, far });
        }
        let mut grid = Self {
            viewport,
            max_viewport: Extent2D::new(u32::MAX, u32::MAX),
            tile_size,
            tile_count_x: 1,
            tile_count_y: 1,
            depth_slices,
            near,
            far,
            slicing,
        };
        grid.resize(viewport);
        Ok(grid)
    }

    /// Creates a grid from the renderer configuration. The viewport is clamped
    /// to the configured maximum, now and on every later resize.
    pub fn from_viewport(config: &RendererConfig, viewport: Extent2D) -> Result<Self, ConfigError> {
        let mut grid = Self::new(
            viewport,
            config.tile_size(),
            config.depth_slices,
            config.near,
            config.far,
            config.depth_slicing,
        )?;
        grid.max_viewport = config.max_extent();
        grid.resize(viewport);
        if grid.cluster_count() > config.max_clusters() {
            return Err(ConfigError::ClusterCapacityExceeded {
                requested: grid.cluster_count(),
                max: config.max_clusters(),
            });
        }
        Ok(grid)
    }

    /// Recomputes the tile counts for a new viewport size.
    ///
    /// Returns `true` if the tile counts changed. A viewport smaller than one
    /// tile, including an empty one, yields a single tile.
    pub fn resize(&mut self, viewport: Extent2D) -> bool {
        self.viewport = viewport.clamp_to(self.max_viewport);
        let tx = tile_count(self.viewport.width, self.tile_size.width);
        let ty = tile_count(self.viewport.height, self.tile_size.height);
        let changed = tx != self.tile_count_x || ty != self.tile_count_y;
        self.tile_count_x = tx;
        self.tile_count_y = ty;
        changed
    }

    /// The (clamped) viewport the grid was computed for.
    pub fn viewport(&self) -> Extent2D {
        self.viewport
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> Extent2D {
        self.tile_size
    }

    /// Number of tiles along x.
    pub fn tile_count_x(&self) -> u32 {
        self.tile_count_x
    }

    /// Number of tiles along y.
    pub fn tile_count_y(&self) -> u32 {
        self.tile_count_y
    }

    /// Number of depth slices.
    pub fn depth_slices(&self) -> u32 {
        self.depth_slices
    }

    /// Total number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.tile_count_x as usize * self.tile_count_y as usize * self.depth_slices as usize
    }

    /// Near plane distance.
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance.
    pub fn far(&self) -> f32 {
        self.far
    }

    /// The depth partitioning scheme.
    pub fn slicing(&self) -> DepthSlicing {
        self.slicing
    }

    /// Linear index of the cluster at `(x, y, z)`.
    #[inline]
    pub fn cluster_index(&self, x: u32, y: u32, z: u32) -> u32 {
        x + y * self.tile_count_x + z * self.tile_count_x * self.tile_count_y
    }

    /// Coordinates of the cluster with linear index `index`.
    #[inline]
    pub fn cluster_coords(&self, index: u32) -> (u32, u32, u32) {
        let per_slice = self.tile_count_x * self.tile_count_y;
        let z = index / per_slice;
        let rem = index % per_slice;
        (rem % self.tile_count_x, rem / self.tile_count_x, z)
    }

    /// Tile containing the pixel `(px, py)`, origin at the top left.
    pub fn tile_for_pixel(&self, px: u32, py: u32) -> (u32, u32) {
        (
            (px / self.tile_size.width).min(self.tile_count_x - 1),
            (py / self.tile_size.height).min(self.tile_count_y - 1),
        )
    }

    /// Depth slice containing a positive view-space distance. Distances
    /// outside `[near, far]` land in the first or last slice.
    pub fn slice_for_depth(&self, depth: f32) -> u32 {
        let t = match self.slicing {
            DepthSlicing::Linear => (depth - self.near) / (self.far - self.near),
            DepthSlicing::Logarithmic => {
                (depth.max(f32::MIN_POSITIVE) / self.near).ln() / (self.far / self.near).ln()
            }
        };
        let slice = (t * self.depth_slices as f32).floor();
        if slice.is_nan() || slice < 0.0 {
            0
        } else {
            (slice as u32).min(self.depth_slices - 1)
        }
    }

    fn slice_boundary(&self, k: u32) -> f32 {
        let t = k as f32 / self.depth_slices as f32;
        match self.slicing {
            DepthSlicing::Linear => self.near + (self.far - self.near) * t,
            DepthSlicing::Logarithmic => self.near * (self.far / self.near).powf(t),
        }
    }

    /// Near boundary of slice `k`.
    pub fn slice_near(&self, k: u32) -> f32 {
        self.slice_boundary(k)
    }

    /// Far boundary of slice `k`.
    pub fn slice_far(&self, k: u32) -> f32 {
        self.slice_boundary(k + 1)
    }

    /// Computes the clusters overlapped by a light's sphere of influence.
    ///
    /// `center` is in view space (the camera looks down `-Z`). The screen
    /// range is the projection of the sphere's view-space bounding box,
    /// clipped to the depth range, which is conservative. A light outside
    /// the frustum or with a non-positive range covers nothing.
    pub fn light_bounds(&self, center: Vec3, radius: f32, projection: &Mat4) -> ClusterBox {
        if radius <= 0.0 || !radius.is_finite() {
            return ClusterBox::EMPTY;
        }
        let depth = -center.z;
        let d_min = depth - radius;
        let d_max = depth + radius;
        if d_max < self.near || d_min > self.far {
            return ClusterBox::EMPTY;
        }
        let d_min = d_min.max(self.near);
        let d_max = d_max.min(self.far);

        let mut ndc_min = [f32::INFINITY; 2];
        let mut ndc_max = [f32::NEG_INFINITY; 2];
        for x in [center.x - radius, center.x + radius] {
            for y in [center.y - radius, center.y + radius] {
                for z in [-d_min, -d_max] {
                    let clip = *projection * Vec4::new(x, y, z, 1.0);
                    let ndc = [clip.x / clip.w, clip.y / clip.w];
                    for i in 0..2 {
                        ndc_min[i] = ndc_min[i].min(ndc[i]);
                        ndc_max[i] = ndc_max[i].max(ndc[i]);
                    }
                }
            }
        }
        if ndc_max[0] < -1.0 || ndc_min[0] > 1.0 || ndc_max[1] < -1.0 || ndc_min[1] > 1.0 {
            return ClusterBox::EMPTY;
        }

        let width = self.viewport.width.max(1);
        let height = self.viewport.height.max(1);
        let to_px = |ndc: f32, extent: u32| {
            let p = ((ndc * 0.5 + 0.5) * extent as f32).max(0.0);
            (p as u32).min(extent - 1)
        };
        let px_min = to_px(ndc_min[0], width);
        let px_max = to_px(ndc_max[0], width);
        // Framebuffer y grows downwards while NDC y grows upwards.
        let py_min = to_px(-ndc_max[1], height);
        let py_max = to_px(-ndc_min[1], height);

        let (x0, y0) = self.tile_for_pixel(px_min, py_min);
        let (x1, y1) = self.tile_for_pixel(px_max, py_max);
        ClusterBox::new(
            [x0, y0, self.slice_for_depth(d_min)],
            [x1, y1, self.slice_for_depth(d_max)],
        )
    }

    /// Iterates the linear indices of every cluster inside `bounds`.
    pub fn clusters_in<'a>(&'a self, bounds: &ClusterBox) -> impl Iterator<Item = u32> + 'a {
        let b = *bounds;
        let (zs, ys, xs) = if b.is_empty() {
            (1..=0, 1..=0, 1..=0)
        } else {
            (b.min[2]..=b.max[2], b.min[1]..=b.max[1], b.min[0]..=b.max[0])
        };
        zs.flat_map(move |z| {
            let xs = xs.clone();
            ys.clone()
                .flat_map(move |y| xs.clone().map(move |x| self.cluster_index(x, y, z)))
        })
    }

    /// Builds the per-frame uniform block.
    pub fn uniforms(
        &self,
        camera: &Camera,
        model: &Mat4,
        num_lights: u32,
        light_list_capacity: u32,
    ) -> ClusterUniforms {
        let normal = model
            .inverse()
            .map(|m| m.transpose())
            .unwrap_or(Mat4::IDENTITY);
        ClusterUniforms {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            camera_position: Vec4::from_vec3(camera.eye, 1.0).to_array(),
            resolution: [self.viewport.width as f32, self.viewport.height as f32],
            tile_size: [self.tile_size.width, self.tile_size.height],
            grid_dim: [self.tile_count_x, self.tile_count_y, self.depth_slices],
            num_lights,
            cam_near: self.near,
            cam_far: self.far,
            depth_slicing: self.slicing.as_u32(),
            light_list_capacity,
        }
    }
}
