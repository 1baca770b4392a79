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

//! CPU implementation of the per-cluster light-list build.
//!
//! [`LightListBuilder`] runs the same three stages as the culling compute
//! shaders, over the same data layout and with the same atomic protocol:
//!
//! 1. **Bounds & count**: every light walks the clusters of its
//!    [`ClusterBox`], increments their counts and marks them
//!    [`ClusterFlags::ACTIVE`].
//! 2. **Offsets**: every active cluster adds its count to a shared running
//!    total and takes the previous value as its offset.
//! 3. **Populate**: every light walks its cached box again and claims one slot
//!    per cluster from a counter that starts at zero.
//!
//! Each stage runs in parallel over scoped worker threads and returns only
//! once every worker has joined, which plays the role of the storage barrier
//! between dispatches. The GPU lane runs the same stages in
//! `light_culling.wgsl`; this builder is the CPU model of that kernel, driven
//! directly by the integration tests.

use lucerna_core::math::Mat4;
use lucerna_core::math::Vec4;
use lucerna_core::renderer::{ClusterBox, ClusterFlags, ClusterGrid, ConfigError, PointLight};
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Below this many items a stage runs on the calling thread.
const MIN_PARALLEL_ITEMS: usize = 256;

/// Upper bound on worker threads per stage.
const MAX_WORKERS: usize = 8;

/// Errors reported by [`LightListBuilder`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LightListError {
    /// The light or cluster count exceeds the capacity the builder was created with.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The visibility mask does not cover the grid.
    #[error("Visibility mask covers {len} clusters, the grid has {expected}")]
    VisibilityMismatch {
        /// Length of the mask.
        len: usize,
        /// Number of clusters in the grid.
        expected: usize,
    },
    /// A stage was run before the stage it depends on.
    #[error("Stage {requested:?} cannot run after {current:?}")]
    StageOutOfOrder {
        /// The stage that was requested.
        requested: BuildStage,
        /// The last stage that completed.
        current: BuildStage,
    },
}

/// Progress of the current build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    /// Every counter is zero.
    Reset,
    /// Bounds are cached and counts are final.
    Counted,
    /// Offsets are final.
    Offsets,
    /// The index list is populated.
    Populated,
}

/// Summary of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightListStats {
    /// Clusters with at least one light.
    pub active_clusters: u32,
    /// Light/cluster pairs, the length of the used part of the index list.
    pub total: u32,
    /// Pairs that did not fit in the index list.
    pub truncated: u32,
}

/// Builds compacted per-cluster light index lists.
#[derive(Debug)]
pub struct LightListBuilder {
    light_capacity: usize,
    cluster_capacity: usize,
    flags: Vec<AtomicU32>,
    counts: Vec<AtomicU32>,
    offsets: Vec<AtomicU32>,
    claimed: Vec<AtomicU32>,
    total: AtomicU32,
    light_list: Vec<AtomicU32>,
    bounds: Vec<ClusterBox>,
    grid_dim: [u32; 3],
    cluster_count: usize,
    truncated: AtomicU32,
    stage: BuildStage,
    workers: usize,
}

fn zeroed(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

impl LightListBuilder {
    /// Allocates every buffer for the given capacities. Nothing is resized later.
    pub fn new(light_capacity: usize, cluster_capacity: usize, list_capacity: usize) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS);
        Self {
            light_capacity,
            cluster_capacity,
            flags: zeroed(cluster_capacity),
            counts: zeroed(cluster_capacity),
            offsets: zeroed(cluster_capacity),
            claimed: zeroed(cluster_capacity),
            total: AtomicU32::new(0),
            light_list: zeroed(list_capacity),
            bounds: Vec::with_capacity(light_capacity),
            grid_dim: [0; 3],
            cluster_count: 0,
            truncated: AtomicU32::new(0),
            stage: BuildStage::Reset,
            workers,
        }
    }

    /// Overrides the number of worker threads. `1` runs every stage inline.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Maximum number of lights per build.
    pub fn light_capacity(&self) -> usize {
        self.light_capacity
    }

    /// Maximum number of clusters per build.
    pub fn cluster_capacity(&self) -> usize {
        self.cluster_capacity
    }

    /// Number of entries in the global index list.
    pub fn list_capacity(&self) -> usize {
        self.light_list.len()
    }

    /// The last completed stage.
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Zeroes flags, counts, offsets, claimed counters and the running total.
    ///
    /// The index list itself is left untouched: only `[offset, offset + count)`
    /// of an active cluster is ever read, and Stage C rewrites all of it.
    pub fn reset(&mut self) {
        for buffer in [&self.flags, &self.counts, &self.offsets, &self.claimed] {
            for value in buffer.iter() {
                value.store(0, Ordering::Relaxed);
            }
        }
        self.total.store(0, Ordering::Relaxed);
        self.truncated.store(0, Ordering::Relaxed);
        self.bounds.clear();
        self.stage = BuildStage::Reset;
    }

    fn expect_stage(&self, requested: BuildStage, required: BuildStage) -> Result<(), LightListError> {
        if self.stage != required {
            return Err(LightListError::StageOutOfOrder {
                requested,
                current: self.stage,
            });
        }
        Ok(())
    }

    /// Runs `f` for every index in `0..len`, split across the worker threads.
    /// Returns after every worker has finished.
    fn for_each_index<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        if self.workers <= 1 || len < MIN_PARALLEL_ITEMS {
            (0..len).for_each(f);
            return;
        }
        let chunk = len.div_ceil(self.workers);
        std::thread::scope(|scope| {
            for start in (0..len).step_by(chunk) {
                let end = (start + chunk).min(len);
                let f = &f;
                scope.spawn(move || (start..end).for_each(f));
            }
        });
    }

    fn clamp_box(&self, b: &ClusterBox) -> ClusterBox {
        if b.is_empty() || self.grid_dim.iter().any(|&d| d == 0) {
            return ClusterBox::EMPTY;
        }
        let mut clamped = *b;
        for axis in 0..3 {
            clamped.max[axis] = clamped.max[axis].min(self.grid_dim[axis] - 1);
        }
        if clamped.is_empty() {
            ClusterBox::EMPTY
        } else {
            clamped
        }
    }

    fn for_each_cluster(&self, b: &ClusterBox, mut f: impl FnMut(usize)) {
        let [tx, ty, _] = self.grid_dim;
        for z in b.min[2]..=b.max[2] {
            for y in b.min[1]..=b.max[1] {
                for x in b.min[0]..=b.max[0] {
                    f((x + y * tx + z * tx * ty) as usize);
                }
            }
        }
    }

    fn is_visible(&self, cluster: usize, visibility_enabled: bool) -> bool {
        !visibility_enabled
            || ClusterFlags::from_bits_truncate(self.flags[cluster].load(Ordering::Relaxed))
                .contains(ClusterFlags::VISIBLE)
    }

    /// Stage A: caches the per-light bounds and counts lights per cluster.
    ///
    /// With a `visibility` mask, only clusters marked
    /// [`ClusterFlags::VISIBLE`] receive lights, as the GPU does after the
    /// clustering pass.
    ///
    /// # Errors
    ///
    /// Fails if the light count or the grid exceeds the builder's capacity,
    /// if the mask does not match the grid, or if the builder was not reset.
    pub fn stage_a_bounds_and_count(
        &mut self,
        grid: &ClusterGrid,
        bounds: &[ClusterBox],
        visibility: Option<&[ClusterFlags]>,
    ) -> Result<(), LightListError> {
        self.expect_stage(BuildStage::Counted, BuildStage::Reset)?;
        if bounds.len() > self.light_capacity {
            return Err(ConfigError::LightCapacityExceeded {
                requested: bounds.len(),
                max: self.light_capacity,
            }
            .into());
        }
        let cluster_count = grid.cluster_count();
        if cluster_count > self.cluster_capacity {
            return Err(ConfigError::ClusterCapacityExceeded {
                requested: cluster_count,
                max: self.cluster_capacity,
            }
            .into());
        }
        if let Some(mask) = visibility {
            if mask.len() != cluster_count {
                return Err(LightListError::VisibilityMismatch {
                    len: mask.len(),
                    expected: cluster_count,
                });
            }
            for (flag, visible) in self.flags.iter().zip(mask) {
                flag.store(
                    (*visible & ClusterFlags::VISIBLE).bits(),
                    Ordering::Relaxed,
                );
            }
        }

        self.grid_dim = [grid.tile_count_x(), grid.tile_count_y(), grid.depth_slices()];
        self.cluster_count = cluster_count;
        self.bounds.clear();
        let clamped: Vec<ClusterBox> = bounds.iter().map(|b| self.clamp_box(b)).collect();
        self.bounds.extend(clamped);

        let use_mask = visibility.is_some();
        self.for_each_index(self.bounds.len(), |light| {
            self.for_each_cluster(&self.bounds[light], |cluster| {
                if self.is_visible(cluster, use_mask) {
                    self.counts[cluster].fetch_add(1, Ordering::Relaxed);
                    self.flags[cluster].fetch_or(ClusterFlags::ACTIVE.bits(), Ordering::Relaxed);
                }
            });
        });
        self.stage = BuildStage::Counted;
        Ok(())
    }

    /// Stage B: gives every active cluster a disjoint region of the index list.
    ///
    /// Regions are handed out in whatever order the workers reach the
    /// clusters, so offsets differ between runs while the partition does not.
    pub fn stage_b_offsets(&mut self) -> Result<(), LightListError> {
        self.expect_stage(BuildStage::Offsets, BuildStage::Counted)?;
        self.for_each_index(self.cluster_count, |cluster| {
            let flags = ClusterFlags::from_bits_truncate(self.flags[cluster].load(Ordering::Relaxed));
            if flags.contains(ClusterFlags::ACTIVE) {
                let count = self.counts[cluster].load(Ordering::Relaxed);
                let offset = self.total.fetch_add(count, Ordering::Relaxed);
                self.offsets[cluster].store(offset, Ordering::Relaxed);
            }
        });
        self.stage = BuildStage::Offsets;
        Ok(())
    }

    /// Stage C: writes each light's index into the regions of its clusters.
    ///
    /// The cached Stage A bounds are reused as-is, so the clusters walked here
    /// are exactly the ones that were counted. Pairs that land past the end of
    /// the index list are dropped and returned as the truncated count.
    pub fn stage_c_populate(&mut self) -> Result<u32, LightListError> {
        self.expect_stage(BuildStage::Populated, BuildStage::Offsets)?;
        let capacity = self.light_list.len();
        self.for_each_index(self.bounds.len(), |light| {
            self.for_each_cluster(&self.bounds[light], |cluster| {
                let flags =
                    ClusterFlags::from_bits_truncate(self.flags[cluster].load(Ordering::Relaxed));
                if !flags.contains(ClusterFlags::ACTIVE) {
                    return;
                }
                let count = self.counts[cluster].load(Ordering::Relaxed);
                let slot = self.claimed[cluster].fetch_add(1, Ordering::Relaxed);
                let index = self.offsets[cluster].load(Ordering::Relaxed) as usize + slot as usize;
                if slot < count && index < capacity {
                    self.light_list[index].store(light as u32, Ordering::Relaxed);
                } else {
                    self.truncated.fetch_add(1, Ordering::Relaxed);
                }
            });
        });
        self.stage = BuildStage::Populated;
        let truncated = self.truncated.load(Ordering::Relaxed);
        if truncated > 0 {
            log::warn!(
                "LightListBuilder: {} light/cluster pairs exceed the index list capacity of {}",
                truncated,
                capacity
            );
        }
        Ok(truncated)
    }

    /// Resets the builder and runs all three stages over precomputed bounds.
    pub fn build_with_bounds(
        &mut self,
        grid: &ClusterGrid,
        bounds: &[ClusterBox],
        visibility: Option<&[ClusterFlags]>,
    ) -> Result<LightListStats, LightListError> {
        self.reset();
        self.stage_a_bounds_and_count(grid, bounds, visibility)?;
        self.stage_b_offsets()?;
        let truncated = self.stage_c_populate()?;
        Ok(LightListStats {
            active_clusters: self.active_clusters().count() as u32,
            total: self.total(),
            truncated,
        })
    }

    /// Computes every light's bounds with the grid and runs the full build.
    ///
    /// `view` maps world space to view space and `projection` is the camera
    /// projection the grid tiles the screen of.
    pub fn build(
        &mut self,
        grid: &ClusterGrid,
        lights: &[PointLight],
        view: &Mat4,
        projection: &Mat4,
        visibility: Option<&[ClusterFlags]>,
    ) -> Result<LightListStats, LightListError> {
        let bounds: Vec<ClusterBox> = lights
            .iter()
            .map(|light| {
                let center = (*view * Vec4::from_vec3(light.position, 1.0)).truncate();
                grid.light_bounds(center, light.range, projection)
            })
            .collect();
        self.build_with_bounds(grid, &bounds, visibility)
    }

    /// The cached bounds of the current build, one per light.
    pub fn light_bounds(&self) -> &[ClusterBox] {
        &self.bounds
    }

    /// Flags of a cluster.
    pub fn flags(&self, cluster: usize) -> ClusterFlags {
        self.flags
            .get(cluster)
            .map(|f| ClusterFlags::from_bits_truncate(f.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    /// Number of lights counted for a cluster.
    pub fn count(&self, cluster: usize) -> u32 {
        self.counts
            .get(cluster)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Total number of light/cluster pairs.
    pub fn total(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    /// Indices of clusters marked active in the current build.
    pub fn active_clusters(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.cluster_count).filter(|&c| self.flags(c).contains(ClusterFlags::ACTIVE))
    }

    /// The `[offset, offset + count)` region of a cluster. Inactive clusters
    /// own the empty range at zero.
    pub fn cluster_range(&self, cluster: usize) -> Range<usize> {
        if !self.flags(cluster).contains(ClusterFlags::ACTIVE) {
            return 0..0;
        }
        let offset = self.offsets[cluster].load(Ordering::Relaxed) as usize;
        offset..offset + self.count(cluster) as usize
    }

    /// The light indices stored for a cluster. Entries truncated by the list
    /// capacity are missing.
    pub fn lights_in_cluster(&self, cluster: usize) -> Vec<u32> {
        let range = self.cluster_range(cluster);
        let end = range.end.min(self.light_list.len());
        let start = range.start.min(end);
        self.light_list[start..end]
            .iter()
            .map(|v| v.load(Ordering::Relaxed))
            .collect()
    }

    /// Number of slots claimed in a cluster during Stage C.
    pub fn claimed(&self, cluster: usize) -> u32 {
        self.claimed
            .get(cluster)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// The used part of the global index list.
    pub fn light_list(&self) -> Vec<u32> {
        let end = (self.total() as usize).min(self.light_list.len());
        self.light_list[..end]
            .iter()
            .map(|v| v.load(Ordering::Relaxed))
            .collect()
    }
}
