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

use anyhow::anyhow;
use anyhow::Result;
use lucerna_core::platform::window::LucernaWindowHandle;
use wgpu::SurfaceTargetUnsafe;
use wgpu::{Adapter, Features, Instance};

/// Holds the core WGPU state objects required for rendering.
///
/// It is initialized with a pre-selected adapter and owns the presentation
/// surface together with the device and queue.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    pub surface_config: wgpu::SurfaceConfiguration,

    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
    pub adapter_device_type: wgpu::DeviceType,
    pub active_device_features: wgpu::Features,
    pub device_limits: wgpu::Limits,
}

/// Storage buffers the culling shaders bind at once.
const REQUIRED_STORAGE_BUFFERS_PER_STAGE: u32 = 8;

impl WgpuGraphicsContext {
    /// Initializes the graphics context for a window surface.
    ///
    /// ## Arguments
    /// * `instance` - The shared `wgpu::Instance`.
    /// * `window_handle` - Any object that can provide a raw window handle.
    /// * `adapter` - The pre-selected `wgpu::Adapter` to use.
    /// * `window_size` - The initial physical size of the surface.
    pub async fn new(
        instance: &Instance,
        window_handle: LucernaWindowHandle,
        adapter: Adapter,
        window_size: (u32, u32),
    ) -> Result<Self> {
        log::info!("WgpuGraphicsContext: Initializing with pre-selected adapter...");

        // --- 1. Create Surface ---
        let surface_target = unsafe {
            SurfaceTargetUnsafe::from_window(&window_handle)
                .map_err(|e| anyhow!("Failed to create surface target: {}", e))?
        };
        let surface = unsafe { instance.create_surface_unsafe(surface_target)? };
        log::debug!("WgpuGraphicsContext: Surface created for the window.");

        let adapter_info = adapter.get_info();
        log::info!(
            "WgpuGraphicsContext: Using adapter \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 2. Create Logical Device and Queue ---
        // Timestamps feed the statistics overlay; everything else works without them.
        let optional_features: Features = wgpu::Features::TIMESTAMP_QUERY;
        let features_to_enable: Features = adapter.features() & optional_features;

        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: REQUIRED_STORAGE_BUFFERS_PER_STAGE
                .min(adapter_limits.max_storage_buffers_per_shader_stage),
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Lucerna Logical Device"),
                required_features: features_to_enable,
                required_limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("WgpuGraphicsContext: Logical device and queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let active_device_features = device.features();
        let device_limits = device.limits();
        log::info!("WgpuGraphicsContext: Active device features: {active_device_features:?}");
        log::debug!("WgpuGraphicsContext: Device limits: {device_limits:?}");

        // --- 3. Configure Surface ---
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: window_size.0.max(1),
            height: window_size.1.max(1),
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
            active_device_features,
            device_limits,
        })
    }

    /// Reconfigures the surface when the window is resized.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            log::info!("WgpuGraphicsContext: Resizing surface to {new_width}x{new_height}");
            self.surface_config.width = new_width;
            self.surface_config.height = new_height;
            self.surface.configure(&self.device, &self.surface_config);
        } else {
            log::warn!(
                "WgpuGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    /// Reapplies the current configuration, used after the surface reports
    /// itself lost or outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Returns the next surface texture to render into.
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    /// Returns the size of the surface configuration.
    pub fn get_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}
