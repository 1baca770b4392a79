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

use lucerna_core::math::{Aabb, Extent2D, Mat4, Vec3};
use lucerna_core::renderer::{
    Camera, ClusterBox, ClusterFlags, ClusterGrid, DepthSlicing, LightField, RendererConfig,
};
use lucerna_lanes::light_list::LightListBuilder;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn grid(width: u32, height: u32, slices: u32) -> ClusterGrid {
    ClusterGrid::new(
        Extent2D::new(width, height),
        Extent2D::new(64, 64),
        slices,
        1.0,
        50.0,
        DepthSlicing::Linear,
    )
    .unwrap()
}

/// Random boxes inside the grid, some of them empty.
fn random_bounds(grid: &ClusterGrid, count: usize, seed: u64) -> Vec<ClusterBox> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let dims = [grid.tile_count_x(), grid.tile_count_y(), grid.depth_slices()];
    (0..count)
        .map(|_| {
            if rng.gen_ratio(1, 10) {
                return ClusterBox::EMPTY;
            }
            let mut min = [0; 3];
            let mut max = [0; 3];
            for axis in 0..3 {
                let a = rng.gen_range(0..dims[axis]);
                let b = rng.gen_range(a..=(a + 3).min(dims[axis] - 1));
                min[axis] = a;
                max[axis] = b;
            }
            ClusterBox::new(min, max)
        })
        .collect()
}

/// The lights whose box covers each cluster, computed without atomics.
fn expected_sets(grid: &ClusterGrid, bounds: &[ClusterBox]) -> Vec<BTreeSet<u32>> {
    let mut sets = vec![BTreeSet::new(); grid.cluster_count()];
    for (light, b) in bounds.iter().enumerate() {
        for cluster in grid.clusters_in(b) {
            sets[cluster as usize].insert(light as u32);
        }
    }
    sets
}

#[test]
fn test_four_by_three_by_two_scenario() {
    let grid = grid(256, 192, 2);
    assert_eq!(grid.cluster_count(), 24);

    // Light A covers tiles (0..=1, 0..=1) of slice 0, which includes cluster 4;
    // nothing is visible there, so A lands in {0, 1, 5} only.
    let light_a = ClusterBox::new([0, 0, 0], [1, 1, 0]);
    let light_b = ClusterBox::new([1, 1, 0], [2, 1, 0]);
    let mut visibility = vec![ClusterFlags::VISIBLE; 24];
    visibility[4] = ClusterFlags::EMPTY;

    let mut builder = LightListBuilder::new(2, 24, 64);
    let stats = builder
        .build_with_bounds(&grid, &[light_a, light_b], Some(&visibility))
        .unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.active_clusters, 4);
    assert_eq!(stats.truncated, 0);

    assert_eq!(builder.count(5), 2);
    let mut five = builder.lights_in_cluster(5);
    five.sort_unstable();
    assert_eq!(five, vec![0, 1]);
    assert_eq!(builder.lights_in_cluster(0), vec![0]);
    assert_eq!(builder.lights_in_cluster(1), vec![0]);
    assert_eq!(builder.lights_in_cluster(6), vec![1]);
    for cluster in (0..24).filter(|c| ![0, 1, 5, 6].contains(c)) {
        assert_eq!(builder.count(cluster), 0, "cluster {cluster}");
        assert_eq!(builder.cluster_range(cluster), 0..0);
    }
    assert!(!builder.flags(4).contains(ClusterFlags::ACTIVE));
}

#[test]
fn test_partition_matches_overlap_sets() {
    let grid = grid(1280, 720, 16);
    let bounds = random_bounds(&grid, 600, 7);
    let expected = expected_sets(&grid, &bounds);

    let mut builder = LightListBuilder::new(1024, grid.cluster_count(), 1 << 16).with_workers(4);
    let stats = builder.build_with_bounds(&grid, &bounds, None).unwrap();
    assert_eq!(stats.truncated, 0);

    for (cluster, set) in expected.iter().enumerate() {
        let stored = builder.lights_in_cluster(cluster);
        assert_eq!(stored.len(), set.len(), "duplicates or omissions in {cluster}");
        let stored: BTreeSet<u32> = stored.into_iter().collect();
        assert_eq!(&stored, set, "cluster {cluster}");
        assert_eq!(builder.claimed(cluster), builder.count(cluster));
    }
}

#[test]
fn test_active_ranges_are_disjoint_and_dense() {
    let grid = grid(1920, 1080, 8);
    let bounds = random_bounds(&grid, 400, 11);
    let mut builder = LightListBuilder::new(512, grid.cluster_count(), 1 << 16).with_workers(8);
    builder.build_with_bounds(&grid, &bounds, None).unwrap();

    let mut ranges: Vec<_> = builder
        .active_clusters()
        .map(|c| builder.cluster_range(c))
        .collect();
    ranges.sort_by_key(|r| r.start);
    let mut cursor = 0;
    for range in &ranges {
        assert_eq!(range.start, cursor, "gap or overlap at {cursor}");
        assert!(!range.is_empty());
        cursor = range.end;
    }
    assert_eq!(cursor, builder.total() as usize);
}

#[test]
fn test_rebuild_after_reset_is_identical_up_to_permutation() {
    let grid = grid(800, 600, 12);
    let bounds = random_bounds(&grid, 300, 3);
    let mut builder = LightListBuilder::new(512, grid.cluster_count(), 1 << 15).with_workers(4);

    let snapshot = |builder: &LightListBuilder| -> Vec<Vec<u32>> {
        (0..grid.cluster_count())
            .map(|c| {
                let mut lights = builder.lights_in_cluster(c);
                lights.sort_unstable();
                lights
            })
            .collect()
    };

    let first_stats = builder.build_with_bounds(&grid, &bounds, None).unwrap();
    let first = snapshot(&builder);
    let second_stats = builder.build_with_bounds(&grid, &bounds, None).unwrap();
    let second = snapshot(&builder);

    assert_eq!(first_stats, second_stats);
    assert_eq!(first, second);
}

#[test]
fn test_zero_lights_leave_everything_empty() {
    let grid = grid(640, 480, 4);
    let visibility = vec![ClusterFlags::VISIBLE; grid.cluster_count()];
    let mut builder = LightListBuilder::new(16, grid.cluster_count(), 128);
    let stats = builder.build_with_bounds(&grid, &[], Some(&visibility)).unwrap();

    assert_eq!(stats.total, 0);
    assert_eq!(stats.active_clusters, 0);
    for cluster in 0..grid.cluster_count() {
        assert_eq!(builder.count(cluster), 0);
        assert!(!builder.flags(cluster).contains(ClusterFlags::ACTIVE));
        assert!(builder.lights_in_cluster(cluster).is_empty());
    }
    assert!(builder.light_list().is_empty());
}

#[test]
fn test_build_from_light_field_covers_every_visible_light() {
    let config = RendererConfig::default();
    let grid = ClusterGrid::from_viewport(&config, Extent2D::new(800, 600)).unwrap();
    let mut camera = Camera::default();
    camera.set_viewport(Extent2D::new(800, 600));
    let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
    let field = LightField::generate(256, bounds, 42);

    let mut builder = LightListBuilder::new(
        config.max_lights,
        config.max_clusters(),
        config.light_list_capacity,
    );
    let view = camera.view_matrix();
    let projection = camera.projection_matrix();
    let stats = builder
        .build(&grid, field.lights(), &view, &projection, None)
        .unwrap();

    let covered: usize = builder
        .light_bounds()
        .iter()
        .map(|b| b.cluster_count())
        .sum();
    assert_eq!(stats.total as usize, covered);
    assert!(stats.total > 0);
    assert_eq!(stats.truncated, 0);
}

#[test]
fn test_lights_behind_camera_cover_nothing() {
    let grid = grid(640, 480, 8);
    let projection = Mat4::perspective_rh_zo(1.0, 640.0 / 480.0, 1.0, 50.0);
    let behind = grid.light_bounds(Vec3::new(0.0, 0.0, 10.0), 2.0, &projection);
    let mut builder = LightListBuilder::new(4, grid.cluster_count(), 64);
    let stats = builder.build_with_bounds(&grid, &[behind], None).unwrap();
    assert_eq!(stats.total, 0);
}

#[test]
fn test_resize_changes_grid_but_not_capacity() {
    let config = RendererConfig::default();
    let mut grid = ClusterGrid::from_viewport(&config, Extent2D::new(800, 600)).unwrap();
    let mut builder = LightListBuilder::new(8, config.max_clusters(), 1024);
    builder
        .build_with_bounds(&grid, &[ClusterBox::new([12, 9, 0], [12, 9, 0])], None)
        .unwrap();

    assert!(grid.resize(Extent2D::new(1920, 1080)));
    assert_eq!((grid.tile_count_x(), grid.tile_count_y()), (30, 17));
    let stats = builder
        .build_with_bounds(&grid, &[ClusterBox::new([29, 16, 0], [29, 16, 0])], None)
        .unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(builder.lights_in_cluster(grid.cluster_index(29, 16, 0) as usize), vec![0]);
}
