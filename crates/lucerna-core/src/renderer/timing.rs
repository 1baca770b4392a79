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

//! Per-stage GPU timing collected with timestamp queries.

use super::api::{PassTimestampWrites, QuerySetId};
use std::fmt;

/// The GPU stages of a frame that carry a begin/end timestamp pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuStage {
    /// Depth-only draw of opaque geometry.
    Depth,
    /// Draw writing the per-cluster visibility flags.
    Clustering,
    /// Light bounds and per-cluster counts.
    ComputeFlags,
    /// Per-cluster offsets into the light index list.
    ComputeOffsets,
    /// Population of the light index list.
    ComputeList,
    /// Shading, light particles and overlay.
    Onscreen,
    /// Clearing of the transient cluster buffers.
    Transfer,
}

impl GpuStage {
    /// Every stage, in submission order.
    pub const ALL: [GpuStage; 7] = [
        GpuStage::Depth,
        GpuStage::Clustering,
        GpuStage::ComputeFlags,
        GpuStage::ComputeOffsets,
        GpuStage::ComputeList,
        GpuStage::Onscreen,
        GpuStage::Transfer,
    ];

    /// Number of queries a frame needs.
    pub const QUERY_COUNT: u32 = 2 * Self::ALL.len() as u32;

    /// Position of the stage in [`GpuStage::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Label used in the statistics text.
    pub fn label(&self) -> &'static str {
        match self {
            GpuStage::Depth => "subpass depth",
            GpuStage::Clustering => "subpass clustering",
            GpuStage::ComputeFlags => "compute grid_flags",
            GpuStage::ComputeOffsets => "compute light_offsets",
            GpuStage::ComputeList => "compute light_list",
            GpuStage::Onscreen => "subpass scene, particles, text",
            GpuStage::Transfer => "transfer",
        }
    }
}

impl fmt::Display for GpuStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The timestamp query set of one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimestamps {
    /// The query set holding [`GpuStage::QUERY_COUNT`] timestamps.
    pub query_set: QuerySetId,
}

impl FrameTimestamps {
    /// The begin/end writes for `stage`.
    pub fn writes(&self, stage: GpuStage) -> PassTimestampWrites {
        PassTimestampWrites::span(self.query_set, 2 * stage.index() as u32)
    }
}

/// Milliseconds spent in each [`GpuStage`] during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageTimings {
    millis: [f32; GpuStage::ALL.len()],
}

impl StageTimings {
    /// Converts raw begin/end timestamp pairs, laid out as
    /// [`FrameTimestamps::writes`] records them, into milliseconds.
    pub fn from_raw(raw: &[u64], period_ns: f32) -> Self {
        let mut millis = [0.0; GpuStage::ALL.len()];
        for (i, ms) in millis.iter_mut().enumerate() {
            if let (Some(&begin), Some(&end)) = (raw.get(2 * i), raw.get(2 * i + 1)) {
                *ms = end.saturating_sub(begin) as f32 * period_ns / 1_000_000.0;
            }
        }
        Self { millis }
    }

    /// Milliseconds spent in `stage`.
    pub fn get(&self, stage: GpuStage) -> f32 {
        self.millis[stage.index()]
    }

    /// Sum over every stage.
    pub fn total(&self) -> f32 {
        self.millis.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_writes_use_stage_pairs() {
        let ts = FrameTimestamps {
            query_set: QuerySetId(1),
        };
        let w = ts.writes(GpuStage::ComputeOffsets);
        assert_eq!(w.beginning_of_pass_write_index, Some(6));
        assert_eq!(w.end_of_pass_write_index, Some(7));
        assert_eq!(GpuStage::QUERY_COUNT, 14);
    }

    #[test]
    fn test_from_raw_converts_ticks() {
        let mut raw = vec![0u64; 14];
        raw[0] = 1_000;
        raw[1] = 3_000_000;
        raw[12] = 10;
        raw[13] = 5;
        let timings = StageTimings::from_raw(&raw, 1.0);
        assert_relative_eq!(timings.get(GpuStage::Depth), 2.999, epsilon = 1e-4);
        assert_eq!(timings.get(GpuStage::Transfer), 0.0);
        assert_relative_eq!(timings.total(), 2.999, epsilon = 1e-4);
    }
}
