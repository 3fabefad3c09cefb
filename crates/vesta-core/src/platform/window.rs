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


use crate::event::PlatformEvent;
use crate::vesta_bitflags;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::path::PathBuf;
use std::sync::Arc;

/// Combines the windowing handle traits required by graphics backends so they
/// can be used together as one trait object.
pub trait WindowHandle: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> WindowHandle for T {}

/// A shareable handle a GPU backend can create a presentation surface from.
pub type VestaWindowHandle = Arc<dyn WindowHandle + Send + Sync>;

vesta_bitflags! {
    /// Window behavior toggles.
    pub struct WindowFlags: u32 {
        const FULLSCREEN = 1 << 0;
        const VSYNC = 1 << 1;
        const RESIZABLE = 1 << 2;
        const MOUSE_VISIBLE = 1 << 3;
    }
}

/// The windowing half of the platform boundary.
///
/// A window system owns the OS window and its event source. It never calls
/// into the frontend directly: events are queued on the sender handed to
/// `pump_events` and dispatched by the session.
pub trait WindowSystem: std::fmt::Debug {
    /// Collects pending OS events and queues them, in arrival order.
    /// ## Arguments
    /// * `events` - The session's event queue.
    fn pump_events(&mut self, events: &flume::Sender<PlatformEvent>);

    fn title(&self) -> String;

    fn set_title(&mut self, title: &str);

    /// Requests a new size, in logical units.
    fn set_size(&mut self, width: u32, height: u32);

    /// The window size in logical units.
    fn size(&self) -> (u32, u32);

    /// The drawable size in physical pixels.
    fn size_in_pixels(&self) -> (u32, u32);

    /// Applies the fullscreen, resizable and mouse-visibility flags. `VSYNC` is
    /// recorded here and applied by the render device.
    fn set_flags(&mut self, flags: WindowFlags);

    fn flags(&self) -> WindowFlags;

    /// A per-user writable directory for the application, if the OS provides one.
    fn user_path(&self) -> Option<PathBuf>;

    fn set_clipboard(&mut self, text: &str);

    /// The clipboard's text content, if any.
    fn clipboard(&mut self) -> Option<String>;

    /// A handle for creating a presentation surface. `None` for windows that
    /// have no OS counterpart.
    fn surface_handle(&self) -> Option<VestaWindowHandle>;
}
