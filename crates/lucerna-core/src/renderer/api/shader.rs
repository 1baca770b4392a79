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

//! Shader module descriptors.

use std::borrow::Cow;

/// Represents the source data for a shader module.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// WGSL source code.
    Wgsl(Cow<'a, str>),
}

/// Describes a shader module to be created by the graphics device.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// The shader source.
    pub source: ShaderSourceData<'a>,
}

impl<'a> ShaderModuleDescriptor<'a> {
    /// Describes a module built from static WGSL source.
    pub fn wgsl(label: &'a str, source: &'a str) -> Self {
        Self {
            label: Some(label),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(source)),
        }
    }
}

/// An opaque handle representing a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

/// The programmable stage a shader entry point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Compute stage.
    Compute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgsl_descriptor() {
        let descriptor = ShaderModuleDescriptor::wgsl("test_shader", "fn main() {}");
        assert_eq!(descriptor.label, Some("test_shader"));
        let ShaderSourceData::Wgsl(ref cow) = descriptor.source;
        assert_eq!(cow.as_ref(), "fn main() {}");
    }
}
