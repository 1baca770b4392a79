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

//! Acts as the **[A]gent** for the clustered renderer.
//!
//! The agent decides *when* and *in which order* GPU work happens and
//! delegates the recording of each pass to the lanes:
//! - [`FramePool`] hands out frame slots and bounds how far the CPU runs ahead.
//! - [`FrameScheduler`] records a frame into four submissions on the graphics
//!   and compute queues, chained by semaphores, and recovers from stale
//!   presentation surfaces.
//! - [`RenderAgent`] owns the renderer's state (lights, camera, scene,
//!   overlay) and exposes the frame loop contract.

mod agent;
mod frame_pool;
mod scheduler;
mod targets;

pub use agent::*;
pub use frame_pool::*;
pub use scheduler::*;
pub use targets::*;
