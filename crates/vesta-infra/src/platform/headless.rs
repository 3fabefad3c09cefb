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


//! A window system with no OS window behind it.

use super::paths;
use vesta_core::platform::{VestaWindowHandle, WindowFlags, WindowSystem};
use vesta_core::{PlatformEvent, StartupDescriptor};
use std::path::PathBuf;

/// Pushes events into a [`HeadlessWindow`] from outside the session.
///
/// Cloneable and `Send`, so tests and tools can script input, controller
/// traffic or exit requests from any thread.
#[derive(Debug, Clone)]
pub struct EventInjector {
    sender: flume::Sender<PlatformEvent>,
}

impl EventInjector {
    /// Queues an event. It is delivered by the next `poll_events`.
    pub fn push(&self, event: PlatformEvent) {
        if let Err(e) = self.sender.send(event) {
            log::warn!("EventInjector: window is gone, event dropped: {e}");
        }
    }

    pub fn request_exit(&self) {
        self.push(PlatformEvent::ExitRequested);
    }
}

/// An in-memory window for offscreen rendering and tests.
///
/// Sizes are reported 1:1 in logical units and pixels. The clipboard is a
/// local string.
#[derive(Debug)]
pub struct HeadlessWindow {
    title: String,
    application_name: String,
    size: (u32, u32),
    flags: WindowFlags,
    clipboard: Option<String>,
    sender: flume::Sender<PlatformEvent>,
    receiver: flume::Receiver<PlatformEvent>,
}

impl HeadlessWindow {
    pub fn new(descriptor: &StartupDescriptor) -> Self {
        let (sender, receiver) = flume::unbounded();
        log::info!(
            "HeadlessWindow: Created '{}' ({}x{})",
            descriptor.window_title,
            descriptor.width,
            descriptor.height
        );
        Self {
            title: descriptor.window_title.clone(),
            application_name: descriptor.application_name.clone(),
            size: (descriptor.width.max(1), descriptor.height.max(1)),
            flags: descriptor.flags,
            clipboard: None,
            sender,
            receiver,
        }
    }

    pub fn injector(&self) -> EventInjector {
        EventInjector {
            sender: self.sender.clone(),
        }
    }
}

impl WindowSystem for HeadlessWindow {
    fn pump_events(&mut self, events: &flume::Sender<PlatformEvent>) {
        for event in self.receiver.try_iter() {
            if let PlatformEvent::WindowResized { width, height } = event {
                self.size = (width, height);
            }
            if events.send(event).is_err() {
                log::warn!("HeadlessWindow: session queue closed");
                return;
            }
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Resizes immediately and reports it like an OS window would.
    fn set_size(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size != self.size {
            self.size = size;
            let _ = self.sender.send(PlatformEvent::WindowResized {
                width: size.0,
                height: size.1,
            });
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn size_in_pixels(&self) -> (u32, u32) {
        self.size
    }

    fn set_flags(&mut self, flags: WindowFlags) {
        self.flags = flags;
    }

    fn flags(&self) -> WindowFlags {
        self.flags
    }

    fn user_path(&self) -> Option<PathBuf> {
        paths::user_path(&self.application_name)
    }

    fn set_clipboard(&mut self, text: &str) {
        self.clipboard = Some(text.to_string());
    }

    fn clipboard(&mut self) -> Option<String> {
        self.clipboard.clone()
    }

    fn surface_handle(&self) -> Option<VestaWindowHandle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> HeadlessWindow {
        HeadlessWindow::new(&StartupDescriptor {
            width: 64,
            height: 32,
            ..StartupDescriptor::default()
        })
    }

    fn pump(window: &mut HeadlessWindow) -> Vec<PlatformEvent> {
        let (sender, receiver) = flume::unbounded();
        window.pump_events(&sender);
        receiver.try_iter().collect()
    }

    #[test]
    fn injected_events_arrive_in_order() {
        let mut window = window();
        let injector = window.injector();
        injector.push(PlatformEvent::TextInput("a".to_string()));
        injector.push(PlatformEvent::ControllerDisconnected { index: 2 });
        injector.request_exit();

        assert_eq!(
            pump(&mut window),
            vec![
                PlatformEvent::TextInput("a".to_string()),
                PlatformEvent::ControllerDisconnected { index: 2 },
                PlatformEvent::ExitRequested,
            ]
        );
        assert!(pump(&mut window).is_empty());
    }

    #[test]
    fn set_size_reports_a_resize_once() {
        let mut window = window();
        window.set_size(128, 96);
        window.set_size(128, 96);
        assert_eq!(window.size_in_pixels(), (128, 96));
        assert_eq!(
            pump(&mut window),
            vec![PlatformEvent::WindowResized {
                width: 128,
                height: 96
            }]
        );
    }

    #[test]
    fn title_flags_and_clipboard() {
        let mut window = window();
        window.set_title("Renamed");
        window.set_flags(WindowFlags::FULLSCREEN | WindowFlags::VSYNC);
        window.set_clipboard("copied");
        assert_eq!(window.title(), "Renamed");
        assert!(window.flags().contains(WindowFlags::FULLSCREEN));
        assert_eq!(window.clipboard().as_deref(), Some("copied"));
        assert!(window.surface_handle().is_none());
    }
}
