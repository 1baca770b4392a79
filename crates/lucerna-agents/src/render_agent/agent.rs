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

//! Defines the RenderAgent, the owner of everything a running renderer needs.

use super::scheduler::{FrameInputs, FrameOutcome, FrameScheduler};
use lucerna_core::math::{Aabb, Vec3};
use lucerna_core::renderer::{
    Camera, ConfigError, GraphicsDevice, LightField, RenderError, RenderSystem, RendererConfig,
    SceneSource, TextOverlay,
};
use std::sync::Arc;

/// Seed of the start-up light field, so every run shows the same lights.
pub const LIGHT_SEED: u64 = 0x6c75_6365_726e_61;

/// Places a camera inside the scene bounds, looking along -X at the lower
/// half of the scene.
pub fn frame_camera(bounds: &Aabb, config: &RendererConfig) -> Camera {
    let center = bounds.center();
    let half = bounds.half_extents();
    let target = center - Vec3::new(0.0, half.y * 0.5, 0.0);
    let eye = target + Vec3::new(half.x * 0.75, 0.0, 0.0);
    Camera {
        near: config.near,
        far: config.far,
        ..Camera::new(eye, target)
    }
}

/// The agent responsible for the renderer's state and frame loop.
///
/// It owns the presentation system, the scene, the lights, the camera and
/// the overlay, and drives the [`FrameScheduler`] once per frame.
pub struct RenderAgent {
    config: RendererConfig,
    render_system: Box<dyn RenderSystem>,
    scheduler: FrameScheduler,
    scene: Box<dyn SceneSource>,
    camera: Camera,
    lights: LightField,
    overlay: Box<dyn TextOverlay>,
    animate_lights: bool,
    shut_down: bool,
}

impl std::fmt::Debug for RenderAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderAgent")
            .field("scheduler", &self.scheduler)
            .field("camera", &self.camera)
            .field("lights", &self.lights.len())
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

impl RenderAgent {
    /// Builds the scheduler for an initialized render system and generates
    /// the start-up lights.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] for an invalid configuration, or the
    /// first resource error hit while creating frame slots and lanes.
    pub fn new(
        config: RendererConfig,
        mut render_system: Box<dyn RenderSystem>,
        scene: Box<dyn SceneSource>,
        overlay: Box<dyn TextOverlay>,
    ) -> Result<Self, RenderError> {
        let scheduler =
            FrameScheduler::new(render_system.as_mut(), config.clone(), scene.as_ref())?;
        let bounds = scene.bounds();
        let mut camera = frame_camera(&bounds, &config);
        camera.set_viewport(scheduler.grid().viewport());
        let lights = LightField::generate(config.initial_lights, bounds, LIGHT_SEED);
        log::info!(
            "RenderAgent: Created with {} lights, {} frames in flight",
            lights.len(),
            config.frames_in_flight
        );
        Ok(Self {
            config,
            render_system,
            scheduler,
            scene,
            camera,
            lights,
            overlay,
            animate_lights: true,
            shut_down: false,
        })
    }

    /// Advances the lights along their orbits and renders one frame.
    pub fn render_frame(&mut self) -> Result<FrameOutcome, RenderError> {
        if self.shut_down {
            return Err(RenderError::NotInitialized);
        }
        if self.animate_lights {
            self.lights.update();
        }
        self.camera.set_viewport(self.scheduler.grid().viewport());
        self.scheduler.render_frame(
            self.render_system.as_mut(),
            FrameInputs {
                camera: &self.camera,
                lights: &self.lights,
                scene: self.scene.as_ref(),
                overlay: self.overlay.as_mut(),
            },
        )
    }

    /// Forwards a window resize to the scheduler.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> Result<bool, RenderError> {
        let rebuilt = self
            .scheduler
            .handle_resize(self.render_system.as_mut(), width, height)?;
        self.camera.set_viewport(self.scheduler.grid().viewport());
        Ok(rebuilt)
    }

    /// Regenerates the light field with `count` lights.
    ///
    /// # Errors
    ///
    /// A count above `max_lights` is rejected and the current lights are kept.
    pub fn set_light_count(&mut self, count: usize) -> Result<(), ConfigError> {
        self.config.check_light_count(count)?;
        self.lights.regenerate(count);
        log::info!("RenderAgent: Light count set to {count}");
        Ok(())
    }

    /// Number of lights.
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Pauses or resumes the orbital light motion.
    pub fn set_light_animation(&mut self, enabled: bool) {
        self.animate_lights = enabled;
    }

    /// The camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera, for input handling.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The lights.
    pub fn lights(&self) -> &LightField {
        &self.lights
    }

    /// The scene.
    pub fn scene(&self) -> &dyn SceneSource {
        self.scene.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The frame scheduler.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// The text overlay.
    pub fn overlay(&self) -> &dyn TextOverlay {
        self.overlay.as_ref()
    }

    /// The graphics device.
    pub fn graphics_device(&self) -> Result<Arc<dyn GraphicsDevice>, RenderError> {
        self.render_system.graphics_device()
    }

    /// Waits for in-flight frames, then tears down the scheduler, the scene
    /// buffers and finally the render system. Calling it twice is a no-op.
    pub fn shutdown(&mut self) -> Result<(), RenderError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        log::info!("RenderAgent: Shutting down");
        let mut result = self.scheduler.shutdown();
        match self.render_system.graphics_device() {
            Ok(device) => {
                if let Err(e) = self.scene.release(device.as_ref()) {
                    log::warn!("RenderAgent: Failed to release scene buffers: {e}");
                    result = result.and(Err(e.into()));
                }
            }
            Err(e) => log::warn!("RenderAgent: No device to release the scene with: {e}"),
        }
        self.render_system.shutdown();
        result
    }
}

impl Drop for RenderAgent {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("RenderAgent: Shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_camera_sits_inside_bounds() {
        let bounds =
            Aabb::from_center_half_extents(Vec3::new(0.0, 2.0, 0.0), Vec3::new(8.0, 4.0, 3.0));
        let camera = frame_camera(&bounds, &RendererConfig::default());
        assert!(bounds.contains_point(camera.eye));
        assert_relative_eq!(camera.eye.x, 6.0);
        assert_relative_eq!(camera.target.y, 0.0);
        assert_relative_eq!(camera.eye.y, camera.target.y);
        assert_relative_eq!(camera.far, 100.0);
    }
}
