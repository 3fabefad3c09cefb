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


//! Typed events flowing from the window system to the frontend.

mod bus;

pub use self::bus::EventBus;

use crate::input::{ControllerInfo, MouseButton};

/// An event produced by the platform and delivered during `poll_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The user or the OS asked the application to close.
    ExitRequested,
    /// Composed text typed by the user (may be several characters).
    TextInput(String),
    /// A keyboard key changed state. Key repeats are not reported.
    Key {
        /// The physical key's name (e.g. `"KeyA"`, `"Space"`).
        key_code: String,
        pressed: bool,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    /// The cursor moved, in window pixels.
    MouseMoved { x: f32, y: f32 },
    /// The mouse wheel moved.
    MouseWheel { x: f32, y: f32 },
    ControllerConnected(ControllerInfo),
    ControllerDisconnected { index: u32 },
    ControllerButton {
        index: u32,
        button: u32,
        pressed: bool,
    },
    /// An analog axis moved; `value` is in `[-1, 1]`.
    ControllerAxis { index: u32, axis: u32, value: f32 },
    /// The window's drawable area changed, in pixels.
    WindowResized { width: u32, height: u32 },
}
