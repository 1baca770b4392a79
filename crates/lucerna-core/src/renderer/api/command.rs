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

//! Defines data structures used for recording and describing GPU commands.

use super::query::QuerySetId;
use super::texture::TextureViewId;
use crate::math::LinearRgba;

/// An opaque handle to a recorded command buffer that is ready for submission.
///
/// Returned by [`CommandEncoder::finish`](crate::renderer::CommandEncoder::finish)
/// and consumed by [`GraphicsDevice::submit`](crate::renderer::GraphicsDevice::submit).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment are loaded into the pass.
    Load,
    /// The attachment is cleared to the specified value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results are stored to the attachment's memory.
    Store,
    /// The results are discarded.
    Discard,
}

/// Load and store operations for a single attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    /// The operation to perform at the beginning of the pass.
    pub load: LoadOp<V>,
    /// The operation to perform at the end of the pass.
    pub store: StoreOp,
}

/// A color attachment for a render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassColorAttachment {
    /// The view that will be rendered to.
    pub view: TextureViewId,
    /// The load and store operations.
    pub ops: Operations<LinearRgba>,
}

/// A depth attachment for a render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDepthStencilAttachment {
    /// The depth texture view.
    pub view: TextureViewId,
    /// Depth load and store operations. `None` makes depth read-only.
    pub depth_ops: Option<Operations<f32>>,
}

/// Requests timestamps at the beginning and/or end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTimestampWrites {
    /// The query set receiving the timestamps.
    pub query_set: QuerySetId,
    /// Query index written when the pass begins.
    pub beginning_of_pass_write_index: Option<u32>,
    /// Query index written when the pass ends.
    pub end_of_pass_write_index: Option<u32>,
}

impl PassTimestampWrites {
    /// Writes a begin and end timestamp into two consecutive queries.
    pub fn span(query_set: QuerySetId, first_index: u32) -> Self {
        Self {
            query_set,
            beginning_of_pass_write_index: Some(first_index),
            end_of_pass_write_index: Some(first_index + 1),
        }
    }
}

/// A descriptor for a render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Color attachments.
    pub color_attachments: &'a [RenderPassColorAttachment],
    /// Optional depth attachment.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
    /// Optional timestamp queries.
    pub timestamp_writes: Option<PassTimestampWrites>,
}

/// A descriptor for a compute pass.
#[derive(Debug, Default)]
pub struct ComputePassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Optional timestamp queries.
    pub timestamp_writes: Option<PassTimestampWrites>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_op_variants() {
        let clear_color: LoadOp<LinearRgba> = LoadOp::Clear(LinearRgba::new(1.0, 0.5, 0.0, 1.0));
        assert!(matches!(clear_color, LoadOp::Clear(_)));
        let clear_depth: LoadOp<f32> = LoadOp::Clear(1.0);
        assert!(matches!(clear_depth, LoadOp::Clear(v) if (v - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_timestamp_span_uses_consecutive_indices() {
        let writes = PassTimestampWrites::span(QuerySetId(3), 4);
        assert_eq!(writes.beginning_of_pass_write_index, Some(4));
        assert_eq!(writes.end_of_pass_write_index, Some(5));
    }
}
