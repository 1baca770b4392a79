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

use std::sync::Arc;

use crate::math::Extent2D;
use crate::platform::window::LucernaWindow;
use crate::renderer::api::{SemaphoreId, TextureFormat, TextureViewId};
use crate::renderer::error::RenderError;
use crate::renderer::GraphicsDevice;

/// A presentable image acquired from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceImage {
    /// View to render into.
    pub view: TextureViewId,
    /// Size of the image.
    pub extent: Extent2D,
}

/// The result of asking the surface for its next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready; the acquire semaphore will be signaled.
    Acquired(SurfaceImage),
    /// The surface no longer matches the window and must be resized before
    /// retrying. No semaphore was signaled.
    Stale,
}

/// Owns the presentation surface and the device behind it.
pub trait RenderSystem: std::fmt::Debug + Send + Sync {
    /// Initializes the device and the presentation surface for `window`.
    fn init(&mut self, window: &dyn LucernaWindow) -> Result<(), RenderError>;

    /// Resizes the presentation surface. Zero-sized requests are ignored.
    fn resize(&mut self, new_width: u32, new_height: u32);

    /// Current size of the presentation surface.
    fn surface_extent(&self) -> Extent2D;

    /// Format of the presentation surface.
    fn surface_format(&self) -> Option<TextureFormat>;

    /// Acquires the next presentable image and arranges for `signal` to be
    /// signaled once the image is available to the GPU.
    /// ## Errors
    /// * `RenderError::SurfaceAcquisitionFailed` - For unrecoverable surface errors.
    fn acquire_image(&mut self, signal: SemaphoreId) -> Result<AcquireOutcome, RenderError>;

    /// Presents an image once every semaphore in `wait` is signaled.
    fn present(&mut self, image: SurfaceImage, wait: &[SemaphoreId]) -> Result<(), RenderError>;

    /// Returns the device used by this render system.
    /// ## Errors
    /// * `RenderError::NotInitialized` - Before a successful [`RenderSystem::init`].
    fn graphics_device(&self) -> Result<Arc<dyn GraphicsDevice>, RenderError>;

    /// Releases the surface and the device.
    fn shutdown(&mut self);
}
