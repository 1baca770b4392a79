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

//! # Lucerna Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! of the clustered forward renderer.
//!
//! Nothing in this crate talks to a GPU. The `lucerna-infra` crate implements
//! the [`renderer::GraphicsDevice`] and [`renderer::RenderSystem`] contracts on
//! top of wgpu, `lucerna-lanes` records the individual passes, and
//! `lucerna-agents` drives whole frames.

#![warn(missing_docs)]

pub mod lane;
pub mod math;
pub mod platform;
pub mod renderer;
pub mod utils;

pub use utils::timer::Stopwatch;
