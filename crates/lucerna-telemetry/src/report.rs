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

//! Text of the statistics overlay.

use lucerna_core::math::Extent2D;
use lucerna_core::renderer::{GpuStage, StageTimings};

/// Builds the overlay lines: adapter, resolution, then one line per GPU
/// stage in milliseconds and their total.
///
/// Without timings, the stage table is replaced by a single notice.
pub fn stage_report(
    adapter_name: &str,
    extent: Extent2D,
    light_count: usize,
    timings: Option<&StageTimings>,
) -> Vec<String> {
    let mut lines = vec![
        adapter_name.to_string(),
        format!("resolution: {}x{}", extent.width, extent.height),
        format!("lights: {light_count}"),
        String::new(),
    ];
    match timings {
        Some(timings) => {
            lines.push("query data (in ms)".to_string());
            lines.push("------------------".to_string());
            for stage in GpuStage::ALL {
                lines.push(format!("{}: {:.3}", stage.label(), timings.get(stage)));
            }
            lines.push(format!("total: {:.3}", timings.total()));
        }
        None => lines.push("timestamp queries unavailable".to_string()),
    }
    lines
}
