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

//! Bind groups and their layouts.
//!
//! The renderer only ever binds buffers to its shaders, so the binding model is
//! reduced to uniform and storage buffers.

use super::buffer::BufferId;
use crate::lucerna_bitflags;
use std::num::NonZeroU64;

lucerna_bitflags! {
    /// Which shader stages can see a binding.
    pub struct ShaderStageFlags: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
    }
}

/// An opaque handle to a bind group layout resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutId(pub usize);

/// An opaque handle to a bind group resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// Describes the type of buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferBindingType {
    /// A uniform buffer.
    Uniform,
    /// A storage buffer.
    Storage {
        /// Whether the buffer is read-only in the shader.
        read_only: bool,
    },
}

/// Describes a single binding entry in a bind group layout.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    /// The binding index (`@binding(n)` in WGSL).
    pub binding: u32,
    /// Which shader stages can access this binding.
    pub visibility: ShaderStageFlags,
    /// The type of buffer binding.
    pub ty: BufferBindingType,
    /// Minimum size required for the buffer binding.
    pub min_binding_size: Option<NonZeroU64>,
}

impl BindGroupLayoutEntry {
    /// A uniform buffer entry.
    pub fn uniform(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self {
            binding,
            visibility,
            ty: BufferBindingType::Uniform,
            min_binding_size: None,
        }
    }

    /// A storage buffer entry.
    pub fn storage(binding: u32, visibility: ShaderStageFlags, read_only: bool) -> Self {
        Self {
            binding,
            visibility,
            ty: BufferBindingType::Storage { read_only },
            min_binding_size: None,
        }
    }
}

/// Describes a bind group layout to be created.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// The entries in this layout.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A single entry in a bind group.
#[derive(Debug, Clone, Copy)]
pub struct BindGroupEntry {
    /// The binding index.
    pub binding: u32,
    /// The buffer to bind.
    pub buffer: BufferId,
    /// Offset into the buffer in bytes.
    pub offset: u64,
    /// Size of the binding, or `None` to bind to the end of the buffer.
    pub size: Option<NonZeroU64>,
}

impl BindGroupEntry {
    /// Binds a whole buffer.
    pub fn buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            buffer,
            offset: 0,
            size: None,
        }
    }
}

/// Describes a bind group to be created.
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// The layout this bind group conforms to.
    pub layout: BindGroupLayoutId,
    /// The buffers to bind at each binding point.
    pub entries: &'a [BindGroupEntry],
}
