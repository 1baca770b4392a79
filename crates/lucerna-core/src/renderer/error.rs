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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Errors fall into three families. Configuration errors ([`ConfigError`]) are
//! rejected before any frame is scheduled. Device and driver faults
//! ([`SyncError`], submission failures, device loss) are fatal for the frame
//! loop. A stale presentation surface is never an error; it is handled inside
//! the scheduler by resizing and retrying.

use crate::renderer::api::{FenceId, RenderPipelineId, SemaphoreId, ShaderModuleId};
use std::fmt;
use std::time::Duration;

/// An error related to the creation or compilation of a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source failed to compile into a backend-specific module.
    CompilationError {
        /// A descriptive label for the shader, if available.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderModuleId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a render or compute pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Failed to create a pipeline layout.
    LayoutCreationFailed(String),
    /// The backend failed to compile the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// A shader module provided for the pipeline was invalid or missing.
    InvalidShaderModuleForPipeline {
        /// The ID of the invalid shader module.
        id: ShaderModuleId,
        /// The label of the pipeline being created.
        pipeline_label: Option<String>,
    },
    /// The specified render pipeline ID is not valid.
    InvalidRenderPipeline {
        /// The ID of the invalid render pipeline.
        id: RenderPipelineId,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutCreationFailed(msg) => {
                write!(f, "Pipeline layout creation failed: {msg}")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            PipelineError::InvalidShaderModuleForPipeline { id, pipeline_label } => {
                write!(
                    f,
                    "Invalid shader module {:?} for pipeline '{}'",
                    id,
                    pipeline_label.as_deref().unwrap_or("Unknown")
                )
            }
            PipelineError::InvalidRenderPipeline { id } => {
                write!(f, "Invalid render pipeline ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the graphics backend.
    BackendError(String),
    /// An access outside of a resource's bounds.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A caller-side configuration error. These are detected when a configuration
/// is validated or a light count is changed, never while a frame is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// More lights were requested than the light buffers can hold.
    LightCapacityExceeded {
        /// The requested light count.
        requested: usize,
        /// The configured maximum.
        max: usize,
    },
    /// The cluster grid would need more cells than the cluster buffers hold.
    ClusterCapacityExceeded {
        /// Clusters required by the requested grid.
        requested: usize,
        /// Clusters the buffers were sized for.
        max: usize,
    },
    /// The light index list is larger than a `u32` index can address.
    LightListCapacityExceeded {
        /// The configured list length.
        requested: usize,
        /// The largest addressable length.
        max: usize,
    },
    /// A tile dimension is zero.
    ZeroTileSize,
    /// The depth slice count is zero.
    ZeroDepthSlices,
    /// The number of frames in flight is outside `1..=8`.
    InvalidFramesInFlight(usize),
    /// The camera depth range is not `0 < near < far`.
    InvalidDepthRange {
        /// Near plane distance.
        near: f32,
        /// Far plane distance.
        far: f32,
    },
    /// A configuration file could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LightCapacityExceeded { requested, max } => {
                write!(f, "Requested {requested} lights, capacity is {max}")
            }
            ConfigError::ClusterCapacityExceeded { requested, max } => {
                write!(f, "Requested {requested} clusters, capacity is {max}")
            }
            ConfigError::LightListCapacityExceeded { requested, max } => {
                write!(f, "Light list of {requested} entries exceeds the limit of {max}")
            }
            ConfigError::ZeroTileSize => write!(f, "Tile width and height must be non-zero"),
            ConfigError::ZeroDepthSlices => write!(f, "Depth slice count must be non-zero"),
            ConfigError::InvalidFramesInFlight(n) => {
                write!(f, "Frames in flight must be within 1..=8, got {n}")
            }
            ConfigError::InvalidDepthRange { near, far } => {
                write!(f, "Invalid depth range: near {near}, far {far}")
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A failure of a CPU/GPU synchronization primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A bounded fence wait expired.
    FenceTimeout {
        /// The fence that did not signal.
        fence: FenceId,
        /// How long the wait lasted.
        timeout: Duration,
    },
    /// The fence handle is unknown to the device.
    UnknownFence(FenceId),
    /// The semaphore handle is unknown to the device.
    UnknownSemaphore(SemaphoreId),
    /// A submission waited on a semaphore nobody signaled.
    SemaphoreNotSignaled(SemaphoreId),
    /// The device could not be polled, so nothing is known about the wait.
    DeviceFault(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::FenceTimeout { fence, timeout } => {
                write!(f, "Fence {fence:?} was not signaled within {timeout:?}")
            }
            SyncError::UnknownFence(id) => write!(f, "Unknown fence {id:?}"),
            SyncError::UnknownSemaphore(id) => write!(f, "Unknown semaphore {id:?}"),
            SyncError::SemaphoreNotSignaled(id) => {
                write!(f, "Semaphore {id:?} waited on without a pending signal")
            }
            SyncError::DeviceFault(msg) => write!(f, "Device fault while synchronizing: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

/// A high-level error raised by the rendering system or the frame loop.
#[derive(Debug)]
pub enum RenderError {
    /// An operation was attempted before the rendering system was initialized.
    NotInitialized,
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// Failed to acquire the next presentable image.
    SurfaceAcquisitionFailed(String),
    /// A queue submission was rejected by the device.
    SubmissionFailed(String),
    /// A critical rendering operation failed.
    RenderingFailed(String),
    /// The graphics device was lost.
    DeviceLost,
    /// An unexpected or internal error occurred.
    Internal(String),
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// The configuration was rejected.
    Config(ConfigError),
    /// A synchronization primitive failed.
    Sync(SyncError),
}

impl RenderError {
    /// Returns `true` if the error must terminate the frame loop.
    ///
    /// Only configuration errors are recoverable: the caller can keep the
    /// previous settings and continue rendering.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RenderError::Config(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The rendering system is not initialized.")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::SubmissionFailed(msg) => {
                write!(f, "Queue submission failed: {msg}")
            }
            RenderError::RenderingFailed(msg) => {
                write!(f, "A critical rendering operation failed: {msg}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
            RenderError::Resource(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::Config(err) => write!(f, "Invalid renderer configuration: {err}"),
            RenderError::Sync(err) => write!(f, "GPU synchronization failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            RenderError::Config(err) => Some(err),
            RenderError::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        RenderError::Config(err)
    }
}

impl From<SyncError> for RenderError {
    fn from(err: SyncError) -> Self {
        RenderError::Sync(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_resource_error_wraps_shader_error() {
        let res_err: ResourceError = ShaderError::NotFound {
            id: ShaderModuleId(42),
        }
        .into();
        assert_eq!(
            format!("{res_err}"),
            "Shader resource error: Shader module not found for ID: ShaderModuleId(42)"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn test_render_error_source_chain() {
        let res_err: ResourceError = ShaderError::NotFound {
            id: ShaderModuleId(101),
        }
        .into();
        let render_err: RenderError = res_err.into();
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }

    #[test]
    fn test_fatality_classification() {
        let timeout: RenderError = SyncError::FenceTimeout {
            fence: FenceId(0),
            timeout: Duration::from_millis(5),
        }
        .into();
        assert!(timeout.is_fatal());
        assert!(RenderError::SubmissionFailed("lost".into()).is_fatal());
        let fault: RenderError = SyncError::DeviceFault("context poisoned".into()).into();
        assert!(fault.is_fatal());

        let config: RenderError = ConfigError::LightCapacityExceeded {
            requested: 4096,
            max: 2048,
        }
        .into();
        assert!(!config.is_fatal());
        assert_eq!(
            format!("{config}"),
            "Invalid renderer configuration: Requested 4096 lights, capacity is 2048"
        );
    }
}
