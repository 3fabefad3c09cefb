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


//! Translation from `winit` window events to Vesta's [`PlatformEvent`]s.
//!
//! This module is the adapter layer between the windowing backend and the
//! typed event queue: nothing else in the crate looks at `winit` input types.

use vesta_core::input::MouseButton;
use vesta_core::PlatformEvent;
use winit::event::{ElementState, Ime, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Translates a `winit::event::WindowEvent` into a keyboard or mouse [`PlatformEvent`].
///
/// Window management events (resize, close, focus) are not input and return
/// `None`; the window system handles them itself. Key repeats are dropped.
pub fn translate_winit_input(event: &WindowEvent) -> Option<PlatformEvent> {
    match event {
        WindowEvent::KeyboardInput {
            event: key_event, ..
        } => {
            let PhysicalKey::Code(keycode) = key_event.physical_key else {
                return None;
            };
            match key_event.state {
                ElementState::Pressed if key_event.repeat => None,
                state => Some(PlatformEvent::Key {
                    key_code: map_keycode_to_string(keycode),
                    pressed: state == ElementState::Pressed,
                }),
            }
        }
        WindowEvent::CursorMoved { position, .. } => Some(PlatformEvent::MouseMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseInput { state, button, .. } => Some(PlatformEvent::MouseButton {
            button: map_mouse_button(*button),
            pressed: *state == ElementState::Pressed,
        }),
        WindowEvent::MouseWheel { delta, .. } => {
            let (x, y): (f32, f32) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                MouseScrollDelta::PixelDelta(pos) => (pos.x as f32, pos.y as f32),
            };
            (x != 0.0 || y != 0.0).then_some(PlatformEvent::MouseWheel { x, y })
        }
        _ => None,
    }
}

/// Extracts typed text from a key press or a committed IME composition.
pub fn translate_text_input(event: &WindowEvent) -> Option<PlatformEvent> {
    let text = match event {
        WindowEvent::KeyboardInput {
            event: key_event, ..
        } if key_event.state == ElementState::Pressed => key_event.text.as_ref()?.to_string(),
        WindowEvent::Ime(Ime::Commit(text)) => text.clone(),
        _ => return None,
    };
    let text = printable(&text);
    (!text.is_empty()).then_some(PlatformEvent::TextInput(text))
}

/// Drops control characters (backspace, escape, enter) that winit reports as text.
fn printable(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

fn map_keycode_to_string(keycode: KeyCode) -> String {
    format!("{keycode:?}")
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, TouchPhase};

    #[test]
    fn keycodes_use_their_names() {
        assert_eq!(map_keycode_to_string(KeyCode::KeyA), "KeyA");
        assert_eq!(map_keycode_to_string(KeyCode::Space), "Space");
        assert_eq!(map_keycode_to_string(KeyCode::ArrowLeft), "ArrowLeft");
    }

    #[test]
    fn mouse_buttons_map_one_to_one() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(map_mouse_button(WinitMouseButton::Back), MouseButton::Back);
        assert_eq!(map_mouse_button(WinitMouseButton::Other(9)), MouseButton::Other(9));
    }

    #[test]
    fn mouse_press_and_release() {
        let press = WindowEvent::MouseInput {
            device_id: DeviceId::dummy(),
            state: ElementState::Pressed,
            button: WinitMouseButton::Left,
        };
        let release = WindowEvent::MouseInput {
            device_id: DeviceId::dummy(),
            state: ElementState::Released,
            button: WinitMouseButton::Right,
        };
        assert_eq!(
            translate_winit_input(&press),
            Some(PlatformEvent::MouseButton {
                button: MouseButton::Left,
                pressed: true
            })
        );
        assert_eq!(
            translate_winit_input(&release),
            Some(PlatformEvent::MouseButton {
                button: MouseButton::Right,
                pressed: false
            })
        );
    }

    #[test]
    fn cursor_position_is_forwarded() {
        let event = WindowEvent::CursorMoved {
            device_id: DeviceId::dummy(),
            position: PhysicalPosition::new(100.5, 200.75),
        };
        assert_eq!(
            translate_winit_input(&event),
            Some(PlatformEvent::MouseMoved { x: 100.5, y: 200.75 })
        );
    }

    #[test]
    fn wheel_lines_and_pixels() {
        let lines = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(-1.0, 2.0),
            phase: TouchPhase::Moved,
        };
        let pixels = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(5.5, -10.0)),
            phase: TouchPhase::Moved,
        };
        let still = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(0.0, 0.0),
            phase: TouchPhase::Ended,
        };
        assert_eq!(
            translate_winit_input(&lines),
            Some(PlatformEvent::MouseWheel { x: -1.0, y: 2.0 })
        );
        assert_eq!(
            translate_winit_input(&pixels),
            Some(PlatformEvent::MouseWheel { x: 5.5, y: -10.0 })
        );
        assert_eq!(translate_winit_input(&still), None);
    }

    #[test]
    fn window_events_are_not_input() {
        assert_eq!(
            translate_winit_input(&WindowEvent::Resized(winit::dpi::PhysicalSize::new(10, 10))),
            None
        );
        assert_eq!(translate_winit_input(&WindowEvent::CloseRequested), None);
        assert_eq!(translate_winit_input(&WindowEvent::Focused(true)), None);
    }

    #[test]
    fn ime_commits_become_text() {
        let commit = WindowEvent::Ime(Ime::Commit("héllo".to_string()));
        assert_eq!(
            translate_text_input(&commit),
            Some(PlatformEvent::TextInput("héllo".to_string()))
        );
        let control = WindowEvent::Ime(Ime::Commit("\u{8}".to_string()));
        assert_eq!(translate_text_input(&control), None);
        assert_eq!(translate_text_input(&WindowEvent::Focused(false)), None);
    }
}
