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

//! Start-up configuration of the clustered renderer.
//!
//! Every capacity the GPU buffers are sized for lives here. The configuration
//! is validated once before the first frame; after that only the light count
//! may change at runtime, and only up to [`RendererConfig::max_lights`].

use super::error::ConfigError;
use crate::math::Extent2D;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for [`RendererConfig::frames_in_flight`].
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// How view-space depth is partitioned into slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthSlicing {
    /// Slices of equal thickness between near and far.
    Linear,
    /// Slices growing exponentially with distance.
    #[default]
    Logarithmic,
}

impl DepthSlicing {
    /// Value passed to shaders.
    pub fn as_u32(&self) -> u32 {
        match self {
            DepthSlicing::Linear => 0,
            DepthSlicing::Logarithmic => 1,
        }
    }
}

/// Ownership of the transient cluster-state buffers (flags, bounds, counts,
/// offsets, claimed counters and the global light index list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransientPolicy {
    /// Every frame slot owns its own copy.
    #[default]
    PerSlot,
    /// One copy shared by all slots. Culling of frame N+1 waits for shading
    /// of frame N to release the buffers.
    Shared,
}

/// Configuration of the renderer, loadable from RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum viewport width; larger windows are clamped.
    pub max_width: u32,
    /// Maximum viewport height; larger windows are clamped.
    pub max_height: u32,
    /// Start-up viewport width.
    pub initial_width: u32,
    /// Start-up viewport height.
    pub initial_height: u32,
    /// Screen tile width in pixels.
    pub tile_width: u32,
    /// Screen tile height in pixels.
    pub tile_height: u32,
    /// Number of depth slices.
    pub depth_slices: u32,
    /// Depth partitioning scheme.
    pub depth_slicing: DepthSlicing,
    /// Capacity of the light buffers.
    pub max_lights: usize,
    /// Number of lights generated at start-up.
    pub initial_lights: usize,
    /// Capacity, in entries, of the global light index list. At most
    /// `u32::MAX`.
    pub light_list_capacity: usize,
    /// Number of frame slots.
    pub frames_in_flight: usize,
    /// Bounded wait for a frame slot's fences, in milliseconds.
    pub fence_timeout_ms: u64,
    /// Ownership of the transient cluster buffers.
    pub transient_policy: TransientPolicy,
    /// Camera near plane.
    pub near: f32,
    /// Camera far plane.
    pub far: f32,
    /// Refresh period of the statistics overlay, in milliseconds.
    pub text_refresh_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            initial_width: 800,
            initial_height: 600,
            tile_width: 64,
            tile_height: 64,
            depth_slices: 256,
            depth_slicing: DepthSlicing::Logarithmic,
            max_lights: 2048,
            initial_lights: 2048,
            light_list_capacity: 1024 * 1024,
            frames_in_flight: 3,
            fence_timeout_ms: 5000,
            transient_policy: TransientPolicy::PerSlot,
            near: 0.1,
            far: 100.0,
            text_refresh_ms: 500,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from RON text. Missing fields take their default.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_ron_str(&text)
    }

    /// Serializes the configuration to pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Rejects every configuration the fixed-capacity buffers cannot serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.depth_slices == 0 {
            return Err(ConfigError::ZeroDepthSlices);
        }
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(ConfigError::InvalidFramesInFlight(self.frames_in_flight));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::InvalidDepthRange {
                near: self.near,
                far: self.far,
            });
        }
        let clusters = self.max_clusters();
        if clusters > u32::MAX as usize {
            return Err(ConfigError::ClusterCapacityExceeded {
                requested: clusters,
                max: u32::MAX as usize,
            });
        }
        if self.max_lights > u32::MAX as usize {
            return Err(ConfigError::LightCapacityExceeded {
                requested: self.max_lights,
                max: u32::MAX as usize,
            });
        }
        if self.light_list_capacity > u32::MAX as usize {
            return Err(ConfigError::LightListCapacityExceeded {
                requested: self.light_list_capacity,
                max: u32::MAX as usize,
            });
        }
        self.check_light_count(self.initial_lights)
    }

    /// Checks a runtime light-count change against the light buffer capacity.
    pub fn check_light_count(&self, count: usize) -> Result<(), ConfigError> {
        if count > self.max_lights {
            return Err(ConfigError::LightCapacityExceeded {
                requested: count,
                max: self.max_lights,
            });
        }
        Ok(())
    }

    /// The largest viewport the renderer supports.
    pub fn max_extent(&self) -> Extent2D {
        Extent2D::new(self.max_width, self.max_height)
    }

    /// The start-up viewport, clamped to [`Self::max_extent`].
    pub fn initial_extent(&self) -> Extent2D {
        Extent2D::new(self.initial_width, self.initial_height).clamp_to(self.max_extent())
    }

    /// The screen tile size.
    pub fn tile_size(&self) -> Extent2D {
        Extent2D::new(self.tile_width, self.tile_height)
    }

    /// Number of clusters the cluster buffers must hold: the grid of the
    /// largest viewport.
    pub fn max_clusters(&self) -> usize {
        let tx = self.max_width.max(1).div_ceil(self.tile_width.max(1)) as usize;
        let ty = self.max_height.max(1).div_ceil(self.tile_height.max(1)) as usize;
        tx * ty * self.depth_slices as usize
    }

    /// The bounded wait used when acquiring a frame slot.
    pub fn fence_timeout(&self) -> Duration {
        Duration::from_millis(self.fence_timeout_ms)
    }

    /// The overlay refresh period.
    pub fn text_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.text_refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_clusters(), 30 * 17 * 256);
    }

    #[test]
    fn test_rejects_configuration_errors() {
        let config = RendererConfig {
            tile_width: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTileSize));

        let config = RendererConfig {
            frames_in_flight: 9,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFramesInFlight(9)));

        let config = RendererConfig {
            initial_lights: 4096,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LightCapacityExceeded {
                requested: 4096,
                max: 2048
            })
        );

        let config = RendererConfig {
            near: 5.0,
            far: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDepthRange { .. })
        ));

        let config = RendererConfig {
            light_list_capacity: u32::MAX as usize + 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LightListCapacityExceeded {
                requested: u32::MAX as usize + 1,
                max: u32::MAX as usize
            })
        );
    }

    #[test]
    fn test_ron_partial_override() {
        let config =
            RendererConfig::from_ron_str("(frames_in_flight: 2, transient_policy: Shared)").unwrap();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.transient_policy, TransientPolicy::Shared);
        assert_eq!(config.tile_width, 64);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = RendererConfig {
            depth_slicing: DepthSlicing::Linear,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(RendererConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            RendererConfig::from_ron_str("(frames_in_flight: \"three\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_initial_extent_is_clamped() {
        let config = RendererConfig {
            initial_width: 4000,
            ..Default::default()
        };
        assert_eq!(config.initial_extent(), Extent2D::new(1920, 600));
    }
}
