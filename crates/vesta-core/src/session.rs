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

//! The frame/session lifecycle tying a window system to a render device.

use crate::config::StartupDescriptor;
use crate::event::{EventBus, PlatformEvent};
use crate::platform::{WindowFlags, WindowSystem};
use crate::renderer::{ClearCommand, DrawCommand, RenderDevice, RenderError, RenderStats};
use std::path::PathBuf;

/// Lifecycle states of the platform.
///
/// A [`Session`] value only exists between `Running` and the end of
/// `ShuttingDown`; `Uninitialized` is the state before `startup` and after
/// `shutdown` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Running,
    ShuttingDown,
}

/// A running platform: one window, one render device, one event queue.
///
/// Per frame, the frontend calls [`begin_frame`](Session::begin_frame), issues
/// resource calls and commands, drains events with
/// [`poll_events`](Session::poll_events) and finishes with
/// [`end_frame`](Session::end_frame).
#[derive(Debug)]
pub struct Session {
    descriptor: StartupDescriptor,
    state: SessionState,
    running: bool,
    in_frame: bool,
    frame_count: u64,
    window: Box<dyn WindowSystem>,
    device: Box<dyn RenderDevice>,
    events: EventBus<PlatformEvent>,
}

impl Session {
    /// Starts the platform with an already created window system and render device.
    pub fn startup(
        descriptor: StartupDescriptor,
        mut window: Box<dyn WindowSystem>,
        mut device: Box<dyn RenderDevice>,
    ) -> Self {
        window.set_flags(descriptor.flags);
        device.set_vsync(descriptor.flags.contains(WindowFlags::VSYNC));
        let (width, height) = window.size_in_pixels();
        if device.backbuffer_size() != (width, height) {
            device.resize_backbuffer(width, height);
        }

        let adapter = device.adapter_info();
        log::info!(
            "Session started: '{}' on {} ({:?}), {}x{} pixels",
            descriptor.window_title,
            adapter.name,
            adapter.renderer,
            width,
            height
        );

        Self {
            descriptor,
            state: SessionState::Running,
            running: true,
            in_frame: false,
            frame_count: 0,
            window,
            device,
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `false` once an exit request has been observed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The descriptor the session was started with.
    pub fn descriptor(&self) -> &StartupDescriptor {
        &self.descriptor
    }

    /// Number of frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Starts a frame.
    /// ## Errors
    /// * `RenderError::InvalidState` - If a frame is already in progress.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.in_frame {
            return Err(RenderError::InvalidState {
                operation: "begin a frame",
                state: "a frame is already in progress".to_string(),
            });
        }
        self.device.begin_frame()?;
        self.in_frame = true;
        Ok(())
    }

    /// Gathers platform events and hands each one to `handler`, in arrival order,
    /// before returning.
    ///
    /// Window resizes are applied to the backbuffer before the handler sees
    /// them; an exit request clears the running flag.
    pub fn poll_events<F: FnMut(&PlatformEvent)>(&mut self, mut handler: F) {
        self.window.pump_events(&self.events.sender());

        for event in self.events.drain() {
            match &event {
                PlatformEvent::ExitRequested => {
                    log::info!("Exit requested.");
                    self.running = false;
                }
                PlatformEvent::WindowResized { width, height } => {
                    self.device.resize_backbuffer(*width, *height);
                }
                _ => {}
            }
            handler(&event);
        }
    }

    /// Finishes the frame and presents it.
    /// ## Returns
    /// The frame's statistics.
    /// ## Errors
    /// * `RenderError::InvalidState` - If no frame is in progress.
    pub fn end_frame(&mut self) -> Result<RenderStats, RenderError> {
        if !self.in_frame {
            return Err(RenderError::InvalidState {
                operation: "end a frame",
                state: "no frame is in progress".to_string(),
            });
        }
        self.in_frame = false;
        let stats = self.device.end_frame()?;
        self.frame_count += 1;
        Ok(stats)
    }

    /// Submits a draw command. Only valid inside a frame.
    pub fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        self.require_frame("draw")?;
        self.device.draw(command)
    }

    /// Submits a clear command. Only valid inside a frame.
    pub fn clear(&mut self, command: &ClearCommand) -> Result<(), RenderError> {
        self.require_frame("clear")?;
        self.device.clear(command)
    }

    /// The render device, for resource creation and updates.
    pub fn device(&mut self) -> &mut dyn RenderDevice {
        self.device.as_mut()
    }

    pub fn device_ref(&self) -> &dyn RenderDevice {
        self.device.as_ref()
    }

    // --- Window ---

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    pub fn title(&self) -> String {
        self.window.title()
    }

    /// Requests a window size in logical units.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.window.set_size(width, height);
    }

    /// The window size in logical units.
    pub fn size(&self) -> (u32, u32) {
        self.window.size()
    }

    /// The drawable size in pixels.
    pub fn size_in_pixels(&self) -> (u32, u32) {
        self.window.size_in_pixels()
    }

    /// Applies window flags. `VSYNC` is forwarded to the render device.
    pub fn set_flags(&mut self, flags: WindowFlags) {
        self.window.set_flags(flags);
        self.device.set_vsync(flags.contains(WindowFlags::VSYNC));
    }

    pub fn flags(&self) -> WindowFlags {
        self.window.flags()
    }

    // --- Platform services ---

    /// A writable per-user directory for the application.
    pub fn user_path(&self) -> Option<PathBuf> {
        self.window.user_path()
    }

    pub fn set_clipboard(&mut self, text: &str) {
        self.window.set_clipboard(text);
    }

    pub fn clipboard(&mut self) -> Option<String> {
        self.window.clipboard()
    }

    /// Stops the platform and releases every backend resource.
    ///
    /// ## Returns
    /// The final state, always [`SessionState::Uninitialized`].
    pub fn shutdown(mut self) -> SessionState {
        self.state = SessionState::ShuttingDown;
        log::info!(
            "Session shutting down after {} frames.",
            self.frame_count
        );
        if self.in_frame {
            log::warn!("Shutdown requested mid-frame; the frame is discarded.");
            self.in_frame = false;
        }
        self.device.shutdown();
        self.state = SessionState::Uninitialized;
        log::info!("Session shut down.");
        self.state
    }

    fn require_frame(&self, operation: &'static str) -> Result<(), RenderError> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RenderError::InvalidState {
                operation,
                state: "no frame is in progress".to_string(),
            })
        }
    }
}
