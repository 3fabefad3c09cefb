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


//! A `winit`-based implementation of the [`WindowSystem`] trait.

use crate::platform::input::{translate_text_input, translate_winit_input};
use crate::platform::paths;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vesta_core::platform::{PlatformError, VestaWindowHandle, WindowFlags, WindowSystem};
use vesta_core::{PlatformEvent, StartupDescriptor};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowId};

/// Pump attempts while waiting for the OS to hand out the first window.
const CREATION_PUMPS: usize = 64;

/// State driven by the event loop: the window and the events it produced.
struct WinitState {
    initial_title: String,
    initial_size: LogicalSize<u32>,
    flags: WindowFlags,
    window: Option<Arc<Window>>,
    creation_error: Option<String>,
    pending: Vec<PlatformEvent>,
}

impl ApplicationHandler for WinitState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.initial_title,
            self.initial_size.width,
            self.initial_size.height
        );
        let attributes = Window::default_attributes()
            .with_title(self.initial_title.clone())
            .with_inner_size(self.initial_size)
            .with_resizable(self.flags.contains(WindowFlags::RESIZABLE))
            .with_visible(true);
        match event_loop.create_window(attributes) {
            Ok(window) => {
                log::info!("Winit window created successfully (id: {:?}).", window.id());
                window.set_ime_allowed(true);
                self.window = Some(Arc::new(window));
            }
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => self.pending.push(PlatformEvent::ExitRequested),
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                self.pending.push(PlatformEvent::WindowResized {
                    width: size.width,
                    height: size.height,
                });
            }
            _ => {}
        }
        if let Some(input) = translate_winit_input(&event) {
            self.pending.push(input);
        }
        if let Some(text) = translate_text_input(&event) {
            self.pending.push(text);
        }
    }
}

/// A desktop window backed by a `winit` event loop.
///
/// The loop is never run to completion; each `pump_events` call drains what
/// the OS has queued and returns immediately.
pub struct WinitWindowSystem {
    event_loop: EventLoop<()>,
    state: WinitState,
    application_name: String,
    clipboard: Option<arboard::Clipboard>,
}

impl fmt::Debug for WinitWindowSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WinitWindowSystem")
            .field("window", &self.state.window)
            .field("flags", &self.state.flags)
            .field("application_name", &self.application_name)
            .finish_non_exhaustive()
    }
}

impl WinitWindowSystem {
    /// Opens the window described by `descriptor`.
    ///
    /// ## Errors
    /// `PlatformError::WindowCreation` if the event loop or the window cannot be created.
    pub fn new(descriptor: &StartupDescriptor) -> Result<Self, PlatformError> {
        let mut event_loop =
            EventLoop::new().map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
        let mut state = WinitState {
            initial_title: descriptor.window_title.clone(),
            initial_size: LogicalSize::new(descriptor.width.max(1), descriptor.height.max(1)),
            flags: descriptor.flags,
            window: None,
            creation_error: None,
            pending: Vec::new(),
        };

        for _ in 0..CREATION_PUMPS {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::from_millis(1)), &mut state)
            {
                return Err(PlatformError::WindowCreation(format!(
                    "event loop exited during startup (code {code})"
                )));
            }
            if let Some(error) = state.creation_error.take() {
                return Err(PlatformError::WindowCreation(error));
            }
            if state.window.is_some() {
                break;
            }
        }
        if state.window.is_none() {
            return Err(PlatformError::WindowCreation(
                "the OS never resumed the application".to_string(),
            ));
        }

        let mut system = Self {
            event_loop,
            state,
            application_name: descriptor.application_name.clone(),
            clipboard: None,
        };
        system.set_flags(descriptor.flags);
        Ok(system)
    }

    fn window(&self) -> Option<&Arc<Window>> {
        self.state.window.as_ref()
    }

    fn clipboard_handle(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => log::warn!("{}", PlatformError::Clipboard(e.to_string())),
            }
        }
        self.clipboard.as_mut()
    }
}

impl WindowSystem for WinitWindowSystem {
    fn pump_events(&mut self, events: &flume::Sender<PlatformEvent>) {
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
        {
            self.state.pending.push(PlatformEvent::ExitRequested);
        }
        for event in self.state.pending.drain(..) {
            if events.send(event).is_err() {
                log::warn!("WinitWindowSystem: session queue closed");
                break;
            }
        }
    }

    fn title(&self) -> String {
        self.window()
            .map(|w| w.title())
            .unwrap_or_else(|| self.state.initial_title.clone())
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = self.window() {
            window.set_title(title);
        }
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if let Some(window) = self.window() {
            let _ = window.request_inner_size(LogicalSize::new(width.max(1), height.max(1)));
        }
    }

    fn size(&self) -> (u32, u32) {
        self.window().map_or((0, 0), |w| {
            let size: LogicalSize<u32> = w.inner_size().to_logical(w.scale_factor());
            (size.width, size.height)
        })
    }

    fn size_in_pixels(&self) -> (u32, u32) {
        self.window().map_or((0, 0), |w| {
            let size = w.inner_size();
            (size.width, size.height)
        })
    }

    fn set_flags(&mut self, flags: WindowFlags) {
        self.state.flags = flags;
        let Some(window) = self.window() else {
            return;
        };
        let fullscreen = flags
            .contains(WindowFlags::FULLSCREEN)
            .then_some(Fullscreen::Borderless(None));
        window.set_fullscreen(fullscreen);
        window.set_resizable(flags.contains(WindowFlags::RESIZABLE));
        window.set_cursor_visible(flags.contains(WindowFlags::MOUSE_VISIBLE));
    }

    fn flags(&self) -> WindowFlags {
        self.state.flags
    }

    fn user_path(&self) -> Option<PathBuf> {
        paths::user_path(&self.application_name)
    }

    fn set_clipboard(&mut self, text: &str) {
        if let Some(clipboard) = self.clipboard_handle() {
            if let Err(e) = clipboard.set_text(text.to_string()) {
                log::warn!("{}", PlatformError::Clipboard(e.to_string()));
            }
        }
    }

    fn clipboard(&mut self) -> Option<String> {
        self.clipboard_handle()?.get_text().ok()
    }

    fn surface_handle(&self) -> Option<VestaWindowHandle> {
        self.window()
            .map(|window| Arc::clone(window) as VestaWindowHandle)
    }
}
