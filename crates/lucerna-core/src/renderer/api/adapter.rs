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

//! Adapter description reported by the backend.

/// The graphics backend behind an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// DirectX 12.
    Dx12,
    /// OpenGL or GLES.
    OpenGL,
    /// WebGPU.
    WebGpu,
    /// Anything else, including test doubles.
    #[default]
    Unknown,
}

/// The physical kind of adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererDeviceType {
    /// A GPU integrated with the CPU.
    IntegratedGpu,
    /// A discrete GPU.
    DiscreteGpu,
    /// A virtualized GPU.
    VirtualGpu,
    /// A software rasterizer.
    Cpu,
    /// Unknown.
    #[default]
    Unknown,
}

/// Information about the adapter in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererAdapterInfo {
    /// Human-readable adapter name, shown in the statistics overlay.
    pub name: String,
    /// Backend the adapter runs on.
    pub backend_type: GraphicsBackendType,
    /// Physical adapter kind.
    pub device_type: RendererDeviceType,
}
