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

// Lucerna Sandbox
// Clustered forward shading of a procedural scene with thousands of lights.

mod scene;

use anyhow::{Context, Result};
use lucerna_agents::render_agent::{FrameOutcome, RenderAgent};
use lucerna_core::math::Aabb;
use lucerna_core::platform::LucernaWindow;
use lucerna_core::renderer::{
    RenderError, RenderPass, RenderSystem, RendererConfig, SceneSource, TextOverlay,
};
use lucerna_infra::{
    translate_winit_input, ControlAction, WgpuRenderSystem, WinitWindow, WinitWindowBuilder,
};
use lucerna_telemetry::{init_logging, LoggingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config.ron");
const ORBIT_SPEED: f32 = 0.04;
const LIGHT_STEP: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    title: String,
    logging: LoggingConfig,
    renderer: RendererConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            title: "Lucerna".to_string(),
            logging: LoggingConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl SandboxConfig {
    fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).context("Malformed sandbox configuration")?;
        config
            .renderer
            .validate()
            .context("Invalid renderer configuration")?;
        Ok(config)
    }

    /// Reads the configuration, falling back to defaults when the file is absent.
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_ron_str(&text).with_context(|| format!("In {}", path.display()))
    }
}

/// Camera steps scaled to the scene, so every scene feels alike to navigate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CameraSpeeds {
    pan: f32,
    zoom: f32,
}

impl CameraSpeeds {
    fn for_bounds(bounds: &Aabb) -> Self {
        let diagonal = bounds.size().length();
        Self {
            pan: diagonal / 100.0,
            zoom: diagonal / 800.0,
        }
    }
}

/// Shows the overlay text in the window title. The sandbox has no font
/// rendering, so nothing is drawn into the on-screen pass.
struct WindowTitleOverlay {
    window: WinitWindow,
    title: String,
}

impl TextOverlay for WindowTitleOverlay {
    fn set_text(&mut self, lines: &[String]) {
        let mut title = self.title.clone();
        for line in lines.iter().filter(|l| !l.is_empty() && !l.starts_with('-')) {
            title.push_str(" | ");
            title.push_str(line);
        }
        self.window.set_title(&title);
    }

    fn record(&mut self, _pass: &mut dyn RenderPass) -> Result<(), RenderError> {
        Ok(())
    }
}

struct SandboxApp {
    config: SandboxConfig,
    window: Option<WinitWindow>,
    agent: Option<RenderAgent>,
    speeds: CameraSpeeds,
    error: Option<anyhow::Error>,
}

impl SandboxApp {
    fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            window: None,
            agent: None,
            speeds: CameraSpeeds { pan: 0.05, zoom: 0.1 },
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let renderer = &self.config.renderer;
        let window = WinitWindowBuilder::new()
            .with_title(self.config.title.clone())
            .with_dimensions(renderer.initial_width, renderer.initial_height)
            .build(event_loop)?;

        let mut render_system: Box<dyn RenderSystem> = Box::new(WgpuRenderSystem::new());
        render_system.init(&window)?;
        let device = render_system.graphics_device()?;
        let scene = scene::build_scene(device.as_ref())?;
        self.speeds = CameraSpeeds::for_bounds(&scene.bounds());

        let overlay = WindowTitleOverlay {
            window: window.clone(),
            title: self.config.title.clone(),
        };
        let agent = RenderAgent::new(
            renderer.clone(),
            render_system,
            Box::new(scene),
            Box::new(overlay),
        )?;
        log::info!(
            "Sandbox: Ready with {} lights; arrows orbit, A/D/R/F pan, W/S move, +/- lights",
            agent.light_count()
        );
        self.window = Some(window);
        self.agent = Some(agent);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Sandbox: {error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, action: ControlAction) {
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        let CameraSpeeds { pan, zoom } = self.speeds;
        let camera = agent.camera_mut();
        match action {
            ControlAction::OrbitLeft => camera.orbit(0.0, 0.0, -ORBIT_SPEED),
            ControlAction::OrbitRight => camera.orbit(0.0, 0.0, ORBIT_SPEED),
            ControlAction::OrbitUp => camera.orbit(0.0, ORBIT_SPEED, 0.0),
            ControlAction::OrbitDown => camera.orbit(0.0, -ORBIT_SPEED, 0.0),
            ControlAction::Zoom(lines) => camera.orbit(-zoom * lines, 0.0, 0.0),
            ControlAction::PanLeft => camera.pan(-pan, 0.0),
            ControlAction::PanRight => camera.pan(pan, 0.0),
            ControlAction::PanUp => camera.pan(0.0, -pan),
            ControlAction::PanDown => camera.pan(0.0, pan),
            ControlAction::MoveForward => camera.forward(-pan),
            ControlAction::MoveBackward => camera.forward(pan),
            ControlAction::MoreLights => {
                let count = agent.light_count().saturating_add(LIGHT_STEP);
                change_light_count(agent, count);
            }
            ControlAction::FewerLights => {
                let count = agent.light_count().saturating_sub(LIGHT_STEP);
                change_light_count(agent, count);
            }
            ControlAction::Quit => event_loop.exit(),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        match agent.render_frame() {
            Ok(FrameOutcome::Presented(_)) | Ok(FrameOutcome::Skipped) => {}
            Err(e) if e.is_fatal() => self.fail(event_loop, e.into()),
            Err(e) => log::warn!("Sandbox: Frame rejected: {e}"),
        }
    }
}

fn change_light_count(agent: &mut RenderAgent, count: usize) {
    if let Err(e) = agent.set_light_count(count) {
        log::warn!("Sandbox: {e}");
    }
}

impl ApplicationHandler for SandboxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(WinitWindow::winit_id) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Sandbox: Close requested, exiting event loop...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(agent) = self.agent.as_mut() {
                    if let Err(e) = agent.handle_resize(size.width, size.height) {
                        self.fail(event_loop, e.into());
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {
                if let Some(action) = translate_winit_input(&event) {
                    log::debug!("Sandbox: {action:?}");
                    self.apply(event_loop, action);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut agent) = self.agent.take() {
            if let Err(e) = agent.shutdown() {
                log::error!("Sandbox: Shutdown failed: {e}");
            }
        }
    }
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = SandboxConfig::load(&path)?;
    init_logging(&config.logging);
    log::info!("Sandbox: Starting with configuration {}", path.display());

    let event_loop = EventLoop::new()?;
    let mut app = SandboxApp::new(config);
    event_loop.run_app(&mut app)?;
    app.error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucerna_core::math::Vec3;
    use lucerna_core::renderer::TransientPolicy;

    #[test]
    fn test_shipped_config_parses() {
        let text = std::fs::read_to_string(DEFAULT_CONFIG).unwrap();
        let config = SandboxConfig::from_ron_str(&text).unwrap();
        assert_eq!(config.title, "Lucerna");
        assert_eq!(config.renderer.max_lights, 4096);
        assert_eq!(config.renderer.transient_policy, TransientPolicy::PerSlot);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = SandboxConfig::from_ron_str("(renderer: (frames_in_flight: 2))").unwrap();
        assert_eq!(config.title, "Lucerna");
        assert_eq!(config.renderer.frames_in_flight, 2);
        assert_eq!(config.renderer.max_lights, RendererConfig::default().max_lights);
    }

    #[test]
    fn test_invalid_renderer_config_is_rejected() {
        assert!(SandboxConfig::from_ron_str("(renderer: (initial_lights: 9999))").is_err());
        assert!(SandboxConfig::from_ron_str("(renderer: (tile_width: 0))").is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = SandboxConfig::load(Path::new("/nonexistent/lucerna.ron")).unwrap();
        assert_eq!(config.renderer, RendererConfig::default());
    }

    #[test]
    fn test_camera_speeds_follow_scene_size() {
        let bounds = Aabb::from_min_max(Vec3::ZERO, Vec3::new(60.0, 0.0, 80.0));
        let speeds = CameraSpeeds::for_bounds(&bounds);
        assert!((speeds.pan - 1.0).abs() < 1e-5);
        assert!((speeds.zoom - 0.125).abs() < 1e-5);
    }
}
