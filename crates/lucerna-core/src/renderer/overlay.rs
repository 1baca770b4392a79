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

//! The text overlay collaborator.

use super::error::RenderError;
use super::traits::RenderPass;

/// Draws statistics text on top of the shaded image.
///
/// Glyph rendering lives outside the renderer; the frame scheduler only hands
/// the overlay new text and a render pass to record into.
pub trait TextOverlay: Send {
    /// Replaces the displayed text.
    fn set_text(&mut self, lines: &[String]);

    /// Records the overlay's draw calls into the on-screen pass.
    fn record(&mut self, pass: &mut dyn RenderPass) -> Result<(), RenderError>;
}

/// An overlay that draws nothing and remembers the last text it was given.
#[derive(Debug, Default, Clone)]
pub struct NullOverlay {
    lines: Vec<String>,
}

impl NullOverlay {
    /// The last text set.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl TextOverlay for NullOverlay {
    fn set_text(&mut self, lines: &[String]) {
        self.lines = lines.to_vec();
    }

    fn record(&mut self, _pass: &mut dyn RenderPass) -> Result<(), RenderError> {
        Ok(())
    }
}
