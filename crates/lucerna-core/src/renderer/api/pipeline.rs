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

//! Render and compute pipeline descriptors.
//!
//! The descriptors mirror the WebGPU pipeline model and are translated one to
//! one by the backend.

use super::bind_group::BindGroupLayoutId;
use super::shader::ShaderModuleId;
use super::texture::TextureFormat;
use std::borrow::Cow;

/// The data type of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Uint32 => 4,
        }
    }
}

/// Whether a vertex buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Advance once per vertex.
    #[default]
    Vertex,
    /// Advance once per instance.
    Instance,
}

/// One attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// The attribute format.
    pub format: VertexFormat,
    /// Byte offset from the start of the vertex.
    pub offset: u64,
    /// Shader location (`@location(n)`).
    pub shader_location: u32,
}

/// The memory layout of one vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayoutDescriptor<'a> {
    /// Stride between elements in bytes.
    pub array_stride: u64,
    /// Step mode.
    pub step_mode: VertexStepMode,
    /// The attributes of an element.
    pub attributes: Cow<'a, [VertexAttributeDescriptor]>,
}

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Triangle strip.
    TriangleStrip,
    /// Every two vertices form a line.
    LineList,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// Winding order considered front facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

/// Comparison function for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less or equal.
    LessEqual,
    /// Passes if the new value is greater.
    Greater,
    /// Always passes.
    Always,
}

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    One,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    OneMinusSrcAlpha,
}

/// Blend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `src + dst`.
    Add,
    /// `max(src, dst)`.
    Max,
}

/// Blending of one channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Multiplier for the source.
    pub src_factor: BlendFactor,
    /// Multiplier for the destination.
    pub dst_factor: BlendFactor,
    /// The combining operation.
    pub operation: BlendOperation,
}

/// Color and alpha blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Color blending.
    pub color: BlendComponent,
    /// Alpha blending.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// Standard "over" alpha blending.
    pub const ALPHA_BLENDING: Self = Self {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
    };

    /// Additive blending, used for light sprites.
    pub const ADDITIVE: Self = Self {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::One,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::One,
            operation: BlendOperation::Max,
        },
    };
}

/// State of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetStateDescriptor {
    /// The target format.
    pub format: TextureFormat,
    /// Blending, or `None` to overwrite.
    pub blend: Option<BlendState>,
    /// Whether color writes are enabled at all.
    pub write_enabled: bool,
}

/// Primitive assembly and rasterization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveStateDescriptor {
    /// Topology.
    pub topology: PrimitiveTopology,
    /// Front face winding.
    pub front_face: FrontFace,
    /// Culling mode, or `None` for double-sided.
    pub cull_mode: Option<CullMode>,
}

/// Depth testing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStateDescriptor {
    /// Depth buffer format.
    pub format: TextureFormat,
    /// Whether depth is written.
    pub depth_write_enabled: bool,
    /// The depth test.
    pub depth_compare: CompareFunction,
}

/// An opaque handle to a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLayoutId(pub usize);

/// Describes a pipeline layout.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// Bind group layouts, in set order.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}

/// A complete descriptor for a render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The compiled vertex shader module.
    pub vertex_shader_module: ShaderModuleId,
    /// The name of the vertex entry point.
    pub vertex_entry_point: Cow<'a, str>,
    /// The compiled fragment shader module, if any.
    pub fragment_shader_module: Option<ShaderModuleId>,
    /// The name of the fragment entry point.
    pub fragment_entry_point: Option<Cow<'a, str>>,
    /// The layout of the vertex buffers.
    pub vertex_buffers_layout: Cow<'a, [VertexBufferLayoutDescriptor<'a>]>,
    /// The pipeline layout.
    pub layout: Option<PipelineLayoutId>,
    /// Primitive assembly and rasterization.
    pub primitive_state: PrimitiveStateDescriptor,
    /// Depth testing, or `None` to disable it.
    pub depth_stencil_state: Option<DepthStencilStateDescriptor>,
    /// The color targets the pipeline renders to.
    pub color_target_states: Cow<'a, [ColorTargetStateDescriptor]>,
}

/// An opaque handle to a compiled render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);

/// Describes a compute pipeline.
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout.
    pub layout: Option<PipelineLayoutId>,
    /// The compiled shader module.
    pub shader_module: ShaderModuleId,
    /// The entry point function name.
    pub entry_point: Cow<'a, str>,
}

/// An opaque handle to a compiled compute pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputePipelineId(pub usize);
