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

//! Translation from `winit` window events to viewer control actions.
//!
//! Only key presses (including auto-repeat) and wheel motion produce
//! actions; everything else is left to the application's event loop.

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A viewer control requested by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Orbit the camera around its target, to the left.
    OrbitLeft,
    /// Orbit to the right.
    OrbitRight,
    /// Orbit upwards.
    OrbitUp,
    /// Orbit downwards.
    OrbitDown,
    /// Zoom by a number of wheel lines; positive zooms in.
    Zoom(f32),
    /// Pan the camera and its target left.
    PanLeft,
    /// Pan right.
    PanRight,
    /// Pan up.
    PanUp,
    /// Pan down.
    PanDown,
    /// Move camera and target forward along the view direction.
    MoveForward,
    /// Move backward along the view direction.
    MoveBackward,
    /// Raise the light count.
    MoreLights,
    /// Lower the light count.
    FewerLights,
    /// Leave the application.
    Quit,
}

/// Pixels of trackpad scrolling treated as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

/// Translates a `winit::event::WindowEvent` into a [`ControlAction`].
///
/// Returns `None` for events that are not viewer controls.
pub fn translate_winit_input(event: &WindowEvent) -> Option<ControlAction> {
    match event {
        WindowEvent::KeyboardInput {
            event: key_event, ..
        } => match (key_event.state, key_event.physical_key) {
            (ElementState::Pressed, PhysicalKey::Code(keycode)) => map_keycode(keycode),
            _ => None,
        },
        WindowEvent::MouseWheel { delta, .. } => {
            let lines = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
            };
            (lines != 0.0).then_some(ControlAction::Zoom(lines))
        }
        _ => None,
    }
}

/// Maps a physical key to its control, if it has one.
fn map_keycode(keycode: KeyCode) -> Option<ControlAction> {
    let action = match keycode {
        KeyCode::ArrowLeft => ControlAction::OrbitLeft,
        KeyCode::ArrowRight => ControlAction::OrbitRight,
        KeyCode::ArrowUp => ControlAction::OrbitUp,
        KeyCode::ArrowDown => ControlAction::OrbitDown,
        KeyCode::KeyA => ControlAction::PanLeft,
        KeyCode::KeyD => ControlAction::PanRight,
        KeyCode::KeyR => ControlAction::PanUp,
        KeyCode::KeyF => ControlAction::PanDown,
        KeyCode::KeyW => ControlAction::MoveForward,
        KeyCode::KeyS => ControlAction::MoveBackward,
        KeyCode::NumpadAdd | KeyCode::Equal => ControlAction::MoreLights,
        KeyCode::NumpadSubtract | KeyCode::Minus => ControlAction::FewerLights,
        KeyCode::Escape => ControlAction::Quit,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_map_navigation_keys() {
        assert_eq!(map_keycode(KeyCode::ArrowLeft), Some(ControlAction::OrbitLeft));
        assert_eq!(map_keycode(KeyCode::ArrowDown), Some(ControlAction::OrbitDown));
        assert_eq!(map_keycode(KeyCode::KeyR), Some(ControlAction::PanUp));
        assert_eq!(map_keycode(KeyCode::KeyS), Some(ControlAction::MoveBackward));
    }

    #[test]
    fn test_map_light_count_keys() {
        assert_eq!(map_keycode(KeyCode::NumpadAdd), Some(ControlAction::MoreLights));
        assert_eq!(map_keycode(KeyCode::Equal), Some(ControlAction::MoreLights));
        assert_eq!(map_keycode(KeyCode::Minus), Some(ControlAction::FewerLights));
        assert_eq!(map_keycode(KeyCode::Escape), Some(ControlAction::Quit));
        assert_eq!(map_keycode(KeyCode::Space), None);
    }

    #[test]
    fn test_translate_mouse_wheel_line() {
        let event = WindowEvent::MouseWheel {
            device_id: winit::event::DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(0.0, 2.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(translate_winit_input(&event), Some(ControlAction::Zoom(2.0)));
    }

    #[test]
    fn test_translate_mouse_wheel_pixel() {
        let event = WindowEvent::MouseWheel {
            device_id: winit::event::DeviceId::dummy(),
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -80.0)),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(translate_winit_input(&event), Some(ControlAction::Zoom(-2.0)));
    }

    #[test]
    fn test_zero_scroll_is_ignored() {
        let event = WindowEvent::MouseWheel {
            device_id: winit::event::DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(3.0, 0.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(translate_winit_input(&event), None);
    }

    #[test]
    fn test_translate_non_input_returns_none() {
        let resize = WindowEvent::Resized(winit::dpi::PhysicalSize::new(100, 100));
        assert_eq!(translate_winit_input(&resize), None);
        assert_eq!(translate_winit_input(&WindowEvent::Focused(true)), None);
        assert_eq!(translate_winit_input(&WindowEvent::CloseRequested), None);
    }
}
