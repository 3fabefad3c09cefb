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


//! Concrete backends of the Vesta platform layer.
//!
//! Two render devices implement [`RenderDevice`]: [`SoftwareDevice`], a CPU
//! rasterizer that is always available, and [`WgpuDevice`] on top of `wgpu`.
//! Two window systems implement [`WindowSystem`]: [`WinitWindowSystem`] for
//! desktop windows and [`HeadlessWindow`] for offscreen runs and tests.

pub mod graphics;
pub mod logging;
pub mod platform;

pub use graphics::software::SoftwareDevice;
pub use graphics::wgpu::WgpuDevice;
pub use platform::{EventInjector, HeadlessWindow, WinitWindowSystem};

use anyhow::Context;
use vesta_core::platform::{VestaWindowHandle, WindowSystem};
use vesta_core::renderer::{RenderDevice, RenderError, Renderer};
use vesta_core::{Session, StartupDescriptor};

/// Creates the render device for `renderer`.
///
/// `Renderer::Default` tries every GPU API and falls back to the software
/// device when no adapter can be opened. Explicit GPU choices never fall back.
///
/// ## Arguments
/// * `window` - Where the GPU device presents; ignored by the software device.
/// * `size` - The backbuffer size in pixels.
pub fn create_render_device(
    renderer: Renderer,
    window: Option<VestaWindowHandle>,
    size: (u32, u32),
) -> Result<Box<dyn RenderDevice>, RenderError> {
    match renderer {
        Renderer::Software => Ok(Box::new(SoftwareDevice::new(size.0, size.1))),
        Renderer::Default => match WgpuDevice::new(renderer, window, size) {
            Ok(device) => Ok(Box::new(device)),
            Err(e) => {
                log::warn!("GPU renderer unavailable ({e}); falling back to the software renderer");
                Ok(Box::new(SoftwareDevice::new(size.0, size.1)))
            }
        },
        gpu => Ok(Box::new(WgpuDevice::new(gpu, window, size)?)),
    }
}

/// Initialises logging, opens a desktop window and starts a session.
pub fn startup(descriptor: StartupDescriptor) -> anyhow::Result<Session> {
    logging::init_logging(descriptor.log_level);
    let window = WinitWindowSystem::new(&descriptor).context("Failed to open the window")?;
    let device = create_render_device(
        descriptor.renderer,
        window.surface_handle(),
        window.size_in_pixels(),
    )
    .context("Failed to create the render device")?;
    Ok(Session::startup(descriptor, Box::new(window), device))
}

/// Starts a session on a [`HeadlessWindow`].
///
/// ## Returns
/// The session and an injector for scripting its events.
pub fn startup_headless(descriptor: StartupDescriptor) -> anyhow::Result<(Session, EventInjector)> {
    logging::init_logging(descriptor.log_level);
    let window = HeadlessWindow::new(&descriptor);
    let injector = window.injector();
    let device = create_render_device(descriptor.renderer, None, window.size_in_pixels())
        .context("Failed to create the render device")?;
    Ok((Session::startup(descriptor, Box::new(window), device), injector))
}
