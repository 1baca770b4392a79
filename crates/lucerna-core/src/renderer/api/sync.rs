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

//! Submission and synchronization primitives.
//!
//! The frame scheduler expresses all GPU ordering through these types:
//! semaphores order work between queues, fences let the CPU wait for the GPU,
//! and memory barriers order accesses inside a command buffer.

use super::command::CommandBufferId;
use crate::lucerna_bitflags;
use std::fmt;

/// The queue a submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Graphics and transfer work.
    Graphics,
    /// Asynchronous compute work.
    Compute,
    /// Presentation.
    Present,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Graphics => write!(f, "graphics"),
            QueueKind::Compute => write!(f, "compute"),
            QueueKind::Present => write!(f, "present"),
        }
    }
}

/// A CPU-waitable signal set by the GPU when a submission completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub usize);

/// A GPU-side signal ordering one submission after another.
///
/// Semaphores are binary: each signal must be consumed by exactly one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreId(pub usize);

/// Everything needed to submit command buffers to a queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitInfo<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// Command buffers, executed in order.
    pub command_buffers: &'a [CommandBufferId],
    /// Semaphores the submission waits on before executing.
    pub wait_semaphores: &'a [SemaphoreId],
    /// Semaphores signaled once the submission completes.
    pub signal_semaphores: &'a [SemaphoreId],
    /// Fence signaled once the submission completes.
    pub fence: Option<FenceId>,
}

lucerna_bitflags! {
    /// Kinds of memory access a barrier orders.
    pub struct AccessFlags: u32 {
        /// Writes from the host (buffer uploads).
        const HOST_WRITE = 1 << 0;
        /// Transfer writes (copies and clears).
        const TRANSFER_WRITE = 1 << 1;
        /// Transfer reads.
        const TRANSFER_READ = 1 << 2;
        /// Shader storage or uniform reads.
        const SHADER_READ = 1 << 3;
        /// Shader storage writes.
        const SHADER_WRITE = 1 << 4;
        /// Vertex and index fetches.
        const VERTEX_READ = 1 << 5;
    }
}

/// A full memory barrier between two sets of accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBarrier {
    /// Accesses that must complete.
    pub src_access: AccessFlags,
    /// Accesses that must wait.
    pub dst_access: AccessFlags,
}

impl MemoryBarrier {
    /// Host uploads become visible to shaders.
    pub const HOST_TO_SHADER: Self = Self {
        src_access: AccessFlags::HOST_WRITE,
        dst_access: AccessFlags::from_bits_truncate(
            AccessFlags::SHADER_READ.bits() | AccessFlags::VERTEX_READ.bits(),
        ),
    };

    /// Shader writes of one dispatch become visible to the next.
    pub const SHADER_TO_SHADER: Self = Self {
        src_access: AccessFlags::SHADER_WRITE,
        dst_access: AccessFlags::from_bits_truncate(
            AccessFlags::SHADER_READ.bits() | AccessFlags::SHADER_WRITE.bits(),
        ),
    };

    /// Shader accesses finish before a transfer writes the same memory.
    pub const SHADER_TO_TRANSFER: Self = Self {
        src_access: AccessFlags::from_bits_truncate(
            AccessFlags::SHADER_READ.bits() | AccessFlags::SHADER_WRITE.bits(),
        ),
        dst_access: AccessFlags::TRANSFER_WRITE,
    };

    /// Transfer writes become visible to later shaders.
    pub const TRANSFER_TO_SHADER: Self = Self {
        src_access: AccessFlags::TRANSFER_WRITE,
        dst_access: AccessFlags::from_bits_truncate(
            AccessFlags::SHADER_READ.bits() | AccessFlags::SHADER_WRITE.bits(),
        ),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_presets() {
        assert!(MemoryBarrier::SHADER_TO_SHADER
            .dst_access
            .contains(AccessFlags::SHADER_READ));
        assert!(MemoryBarrier::SHADER_TO_TRANSFER
            .src_access
            .contains(AccessFlags::SHADER_WRITE));
        assert_eq!(
            MemoryBarrier::TRANSFER_TO_SHADER.src_access,
            AccessFlags::TRANSFER_WRITE
        );
    }
}
