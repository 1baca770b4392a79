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

//! Size-dependent render targets.

use lucerna_core::math::Extent2D;
use lucerna_core::renderer::{
    GraphicsDevice, ResourceError, TextureDescriptor, TextureFormat, TextureId, TextureUsage,
    TextureViewId,
};
use std::borrow::Cow;

/// The depth buffer shared by the depth pre-pass, the clustering pass and
/// the on-screen pass. Rebuilt whenever the viewport changes.
#[derive(Debug)]
pub struct RenderTargets {
    depth: Option<(TextureId, TextureViewId)>,
    extent: Extent2D,
}

impl RenderTargets {
    /// Format of the depth buffer.
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

    /// Creates targets for `extent`.
    pub fn new(device: &dyn GraphicsDevice, extent: Extent2D) -> Result<Self, ResourceError> {
        let mut targets = Self {
            depth: None,
            extent,
        };
        targets.rebuild(device, extent)?;
        Ok(targets)
    }

    /// Replaces the targets with ones of the new size. The GPU must no
    /// longer use the old ones.
    pub fn rebuild(
        &mut self,
        device: &dyn GraphicsDevice,
        extent: Extent2D,
    ) -> Result<(), ResourceError> {
        self.destroy(device);
        let size = Extent2D::new(extent.width.max(1), extent.height.max(1));
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("depth buffer")),
            size: size.into(),
            mip_level_count: 1,
            sample_count: 1,
            format: Self::DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT,
        })?;
        let view = match device.create_texture_view(texture) {
            Ok(view) => view,
            Err(e) => {
                let _ = device.destroy_texture(texture);
                return Err(e);
            }
        };
        self.depth = Some((texture, view));
        self.extent = size;
        log::debug!("RenderTargets: Depth buffer {}x{}", size.width, size.height);
        Ok(())
    }

    /// View of the depth buffer.
    pub fn depth_view(&self) -> Option<TextureViewId> {
        self.depth.map(|(_, view)| view)
    }

    /// Size of the targets.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Releases the targets. Calling it twice is a no-op.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if let Some((texture, view)) = self.depth.take() {
            if let Err(e) = device.destroy_texture_view(view) {
                log::warn!("RenderTargets: Failed to destroy depth view: {e}");
            }
            if let Err(e) = device.destroy_texture(texture) {
                log::warn!("RenderTargets: Failed to destroy depth texture: {e}");
            }
        }
    }
}
