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

//! The concrete, WGPU-based implementation of the `RenderSystem` trait.

use super::backend::WgpuBackendSelector;
use super::context::WgpuGraphicsContext;
use super::conversions::from_wgpu_texture_format;
use super::device::WgpuDevice;
use lucerna_core::math::Extent2D;
use lucerna_core::platform::window::{LucernaWindow, LucernaWindowHandle};
use lucerna_core::renderer::{
    AcquireOutcome, GraphicsDevice, RenderError, RenderSystem, RendererAdapterInfo, SemaphoreId,
    SurfaceImage, TextureFormat, TextureViewId,
};
use std::fmt;
use std::sync::{Arc, Mutex};

/// A swapchain image between acquire and present.
struct AcquiredFrame {
    texture: wgpu::SurfaceTexture,
    view: TextureViewId,
}

/// The concrete, WGPU-based implementation of the [`RenderSystem`] trait.
///
/// It owns the graphics context and the device built on top of it, and
/// holds the current swapchain image from [`RenderSystem::acquire_image`]
/// until [`RenderSystem::present`].
pub struct WgpuRenderSystem {
    graphics_context_shared: Option<Arc<Mutex<WgpuGraphicsContext>>>,
    wgpu_device: Option<Arc<WgpuDevice>>,
    current_width: u32,
    current_height: u32,
    current_frame: Option<AcquiredFrame>,
    presented_frames: u64,
}

impl fmt::Debug for WgpuRenderSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuRenderSystem")
            .field("graphics_context_shared", &self.graphics_context_shared)
            .field("wgpu_device", &self.wgpu_device)
            .field("current_width", &self.current_width)
            .field("current_height", &self.current_height)
            .field(
                "current_frame",
                &self.current_frame.as_ref().map(|frame| frame.view),
            )
            .field("presented_frames", &self.presented_frames)
            .finish()
    }
}

impl Default for WgpuRenderSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl WgpuRenderSystem {
    /// Creates a new, uninitialized `WgpuRenderSystem`.
    ///
    /// The system is not usable until [`RenderSystem::init`] is called.
    pub fn new() -> Self {
        log::info!("WgpuRenderSystem created (uninitialized).");
        Self {
            graphics_context_shared: None,
            wgpu_device: None,
            current_width: 0,
            current_height: 0,
            current_frame: None,
            presented_frames: 0,
        }
    }

    async fn initialize(
        &mut self,
        window_handle: LucernaWindowHandle,
        window_size: (u32, u32),
    ) -> Result<(), RenderError> {
        if self.graphics_context_shared.is_some() {
            return Err(RenderError::InitializationFailed(
                "WgpuRenderSystem is already initialized.".to_string(),
            ));
        }
        log::info!("WgpuRenderSystem: Initializing...");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = WgpuBackendSelector::new(instance.clone())
            .select_adapter()
            .await
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        let context = WgpuGraphicsContext::new(&instance, window_handle, adapter, window_size)
            .await
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        (self.current_width, self.current_height) = context.get_size();
        let context_arc = Arc::new(Mutex::new(context));
        self.graphics_context_shared = Some(Arc::clone(&context_arc));
        self.wgpu_device = Some(Arc::new(WgpuDevice::new(context_arc)));

        log::info!(
            "WgpuRenderSystem: GraphicsContext created with size: {}x{}",
            self.current_width,
            self.current_height
        );
        Ok(())
    }

    /// Adapter description, once initialized.
    pub fn adapter_info(&self) -> Option<RendererAdapterInfo> {
        self.wgpu_device.as_ref().map(|d| d.get_adapter_info())
    }

    /// Number of images handed to the display so far.
    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    /// Drops a held swapchain image without presenting it.
    fn release_current_frame(&mut self) {
        if let Some(frame) = self.current_frame.take() {
            if let Some(device) = self.wgpu_device.as_ref() {
                let _ = device.destroy_texture_view(frame.view);
            }
            drop(frame.texture);
        }
    }
}

impl RenderSystem for WgpuRenderSystem {
    fn init(&mut self, window: &dyn LucernaWindow) -> Result<(), RenderError> {
        let window_size = window.inner_size();
        let window_handle_arc = window.clone_handle_arc();
        pollster::block_on(self.initialize(window_handle_arc, window_size))
    }

    fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            log::warn!(
                "WgpuRenderSystem::resize called with zero size ({new_width}, {new_height}). Ignoring."
            );
            return;
        }
        self.release_current_frame();
        if let Some(context) = &self.graphics_context_shared {
            match context.lock() {
                Ok(mut guard) => {
                    guard.resize(new_width, new_height);
                    self.current_width = new_width;
                    self.current_height = new_height;
                }
                Err(e) => log::error!("WgpuRenderSystem: Context poisoned during resize: {e}"),
            }
        }
    }

    fn surface_extent(&self) -> Extent2D {
        Extent2D::new(self.current_width, self.current_height)
    }

    fn surface_format(&self) -> Option<TextureFormat> {
        let context = self.graphics_context_shared.as_ref()?.lock().ok()?;
        from_wgpu_texture_format(context.surface_config.format)
    }

    fn acquire_image(&mut self, signal: SemaphoreId) -> Result<AcquireOutcome, RenderError> {
        let device = self
            .wgpu_device
            .clone()
            .ok_or(RenderError::NotInitialized)?;
        let context_arc = self
            .graphics_context_shared
            .clone()
            .ok_or(RenderError::NotInitialized)?;
        self.release_current_frame();

        let acquired = {
            let context = context_arc.lock().map_err(|e| {
                RenderError::SurfaceAcquisitionFailed(format!("context poisoned: {e}"))
            })?;
            match context.get_current_texture() {
                Ok(texture) => Ok(texture),
                Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                    log::debug!("WgpuRenderSystem: Surface is stale, requesting a resize.");
                    return Ok(AcquireOutcome::Stale);
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("WgpuRenderSystem: Surface acquisition timed out.");
                    return Ok(AcquireOutcome::Stale);
                }
                Err(e) => Err(RenderError::SurfaceAcquisitionFailed(format!("{e:?}"))),
            }
        }?;

        if acquired.suboptimal {
            log::debug!("WgpuRenderSystem: Acquired a suboptimal surface image.");
        }
        let view = device.create_texture_view_for_surface(
            &acquired.texture,
            Some("Lucerna Surface Image View"),
        )?;
        device.signal_semaphore(signal)?;
        self.current_frame = Some(AcquiredFrame {
            texture: acquired,
            view,
        });

        Ok(AcquireOutcome::Acquired(SurfaceImage {
            view,
            extent: self.surface_extent(),
        }))
    }

    fn present(&mut self, image: SurfaceImage, wait: &[SemaphoreId]) -> Result<(), RenderError> {
        let device = self
            .wgpu_device
            .clone()
            .ok_or(RenderError::NotInitialized)?;
        let frame = self.current_frame.take().ok_or_else(|| {
            RenderError::RenderingFailed("present called without an acquired image".to_string())
        })?;
        if frame.view != image.view {
            let view = frame.view;
            self.current_frame = Some(frame);
            return Err(RenderError::RenderingFailed(format!(
                "present of {:?} while {view:?} is the acquired image",
                image.view
            )));
        }

        device.consume_semaphores(wait)?;
        device.destroy_texture_view(frame.view)?;
        frame.texture.present();
        self.presented_frames += 1;
        Ok(())
    }

    fn graphics_device(&self) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        self.wgpu_device
            .clone()
            .map(|device| device as Arc<dyn GraphicsDevice>)
            .ok_or(RenderError::NotInitialized)
    }

    fn shutdown(&mut self) {
        log::info!("WgpuRenderSystem shutting down...");
        self.release_current_frame();
        if let Some(device) = self.wgpu_device.take() {
            device.poll_device_blocking();
        }
        self.graphics_context_shared = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_system_reports_not_initialized() {
        let mut system = WgpuRenderSystem::new();
        assert!(matches!(
            system.graphics_device(),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            system.acquire_image(SemaphoreId(0)),
            Err(RenderError::NotInitialized)
        ));
        assert!(system.surface_format().is_none());
        assert!(system.adapter_info().is_none());
    }

    #[test]
    fn test_zero_resize_is_ignored() {
        let mut system = WgpuRenderSystem::new();
        system.resize(0, 720);
        assert_eq!(system.surface_extent(), Extent2D::new(0, 0));
    }

    #[test]
    fn test_present_without_acquire_fails() {
        let mut system = WgpuRenderSystem::new();
        let image = SurfaceImage {
            view: TextureViewId(1),
            extent: Extent2D::new(4, 4),
        };
        assert!(matches!(
            system.present(image, &[]),
            Err(RenderError::NotInitialized)
        ));
    }
}
