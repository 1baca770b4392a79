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

//! Graphics adapter selection with fallback.
//!
//! Backends are tried in order of preference for the current platform
//! (Vulkan, DX12 on Windows, Metal on macOS), then OpenGL, and finally a
//! software fallback adapter if nothing else answers.

use anyhow::{anyhow, Result};
use std::time::Instant;
use wgpu::{Adapter, Backend, Instance, RequestAdapterOptions};

use lucerna_core::renderer::GraphicsBackendType;

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        _ => "No-op",
    }
}

/// Picks the adapter the renderer runs on.
pub struct WgpuBackendSelector {
    instance: Instance,
}

impl WgpuBackendSelector {
    /// Create a new selector sharing `instance` with the surface.
    pub fn new(instance: Instance) -> Self {
        Self { instance }
    }

    /// Backends to try, most preferred first.
    pub fn preferred_backends() -> Vec<GraphicsBackendType> {
        let mut backends = Vec::new();
        #[cfg(target_os = "windows")]
        backends.push(GraphicsBackendType::Dx12);
        #[cfg(target_os = "macos")]
        backends.push(GraphicsBackendType::Metal);
        #[cfg(not(target_os = "macos"))]
        backends.push(GraphicsBackendType::Vulkan);
        backends.push(GraphicsBackendType::OpenGL);
        backends
    }

    fn type_to_backend(backend_type: GraphicsBackendType) -> Backend {
        match backend_type {
            GraphicsBackendType::Vulkan => Backend::Vulkan,
            GraphicsBackendType::Dx12 => Backend::Dx12,
            GraphicsBackendType::OpenGL => Backend::Gl,
            GraphicsBackendType::Metal => Backend::Metal,
            GraphicsBackendType::WebGpu => Backend::BrowserWebGpu,
            GraphicsBackendType::Unknown => Backend::Noop,
        }
    }

    /// Try to get an adapter running on a specific backend.
    async fn try_backend(&self, backend_type: GraphicsBackendType) -> Result<Adapter> {
        let backend = Self::type_to_backend(backend_type);

        let adapter = self
            .instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find suitable adapter for {backend_type:?}: {e}"))?;

        let adapter_info = adapter.get_info();
        if adapter_info.backend != backend {
            return Err(anyhow!(
                "Adapter returned wrong backend: requested {:?}, got {:?}",
                backend,
                adapter_info.backend
            ));
        }

        log::info!(
            "WgpuBackendSelector: {} backend succeeded with adapter \"{}\"",
            backend_name(backend),
            adapter_info.name
        );
        Ok(adapter)
    }

    /// Walks the preferred backends and returns the first adapter found.
    pub async fn select_adapter(&self) -> Result<Adapter> {
        let start_time = Instant::now();
        let mut attempted = Vec::new();

        for backend_type in Self::preferred_backends() {
            attempted.push(backend_type);
            match self.try_backend(backend_type).await {
                Ok(adapter) => {
                    log::info!(
                        "WgpuBackendSelector: Selected {:?} in {} ms",
                        backend_type,
                        start_time.elapsed().as_millis()
                    );
                    return Ok(adapter);
                }
                Err(e) => log::warn!("WgpuBackendSelector: {e}"),
            }
        }

        log::warn!("WgpuBackendSelector: No preferred backend available, trying the fallback adapter.");
        self.instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: true,
            })
            .await
            .map_err(|e| anyhow!("All backend attempts failed (attempted {attempted:?}): {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_function() {
        assert_eq!(backend_name(Backend::Vulkan), "Vulkan");
        assert_eq!(backend_name(Backend::Metal), "Metal");
        assert_eq!(backend_name(Backend::Dx12), "DirectX 12");
        assert_eq!(backend_name(Backend::Gl), "OpenGL");
    }

    #[test]
    fn test_backend_type_conversion() {
        assert_eq!(
            WgpuBackendSelector::type_to_backend(GraphicsBackendType::Vulkan),
            Backend::Vulkan
        );
        assert_eq!(
            WgpuBackendSelector::type_to_backend(GraphicsBackendType::OpenGL),
            Backend::Gl
        );
        assert_eq!(
            WgpuBackendSelector::type_to_backend(GraphicsBackendType::Metal),
            Backend::Metal
        );
    }

    #[test]
    fn test_opengl_is_always_a_fallback() {
        let backends = WgpuBackendSelector::preferred_backends();
        assert_eq!(backends.last(), Some(&GraphicsBackendType::OpenGL));
        assert!(backends.len() >= 2);
    }
}
