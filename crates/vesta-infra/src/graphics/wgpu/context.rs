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


use super::backend::{backend_name, create_instance, select_adapter};
use vesta_core::platform::VestaWindowHandle;
use vesta_core::renderer::{RenderError, Renderer};

/// A window surface and its swapchain configuration.
#[derive(Debug)]
pub struct PresentSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
}

/// Holds the core WGPU state objects required for rendering.
///
/// The surface is optional: without one the context renders offscreen only.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    #[allow(dead_code)]
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: Option<PresentSurface>,
}

impl WgpuGraphicsContext {
    /// Initializes the graphics context, optionally bound to a window.
    ///
    /// ## Arguments
    /// * `renderer` - Which graphics APIs the adapter may use.
    /// * `window` - A handle to present to, or `None` for offscreen rendering.
    /// * `size` - The initial physical size of the window surface.
    pub fn new(
        renderer: Renderer,
        window: Option<VestaWindowHandle>,
        size: (u32, u32),
    ) -> Result<Self, RenderError> {
        log::info!("Initializing WGPU Graphics Context...");
        let instance = create_instance(renderer)?;

        let surface = match window {
            Some(handle) => Some(instance.create_surface(handle).map_err(|e| {
                RenderError::InitializationFailed(format!("Failed to create surface: {e}"))
            })?),
            None => None,
        };
        if surface.is_some() {
            log::debug!("WGPU surface created for the window.");
        }

        let adapter = select_adapter(&instance, renderer, surface.as_ref())?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Vesta Logical Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            RenderError::InitializationFailed(format!("Failed to create logical device: {e}"))
        })?;
        log::info!("Logical device and command queue created.");

        let surface = surface.map(|surface| {
            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(|f| !f.is_srgb())
                .or_else(|| caps.formats.first().copied())
                .unwrap_or(wgpu::TextureFormat::Bgra8Unorm);
            let config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.0.max(1),
                height: size.1.max(1),
                present_mode: wgpu::PresentMode::Fifo,
                alpha_mode: caps
                    .alpha_modes
                    .first()
                    .copied()
                    .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            };
            surface.configure(&device, &config);
            PresentSurface {
                surface,
                config,
                present_modes: caps.present_modes,
            }
        });

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        backend_name(self.adapter.get_info().backend)
    }

    /// Reconfigures the surface (swapchain) when the window is resized.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        let Some(present) = self.surface.as_mut() else {
            return;
        };
        if new_width > 0 && new_height > 0 {
            log::info!(
                "WgpuGraphicsContext: Resizing surface configuration to {new_width}x{new_height}"
            );
            present.config.width = new_width;
            present.config.height = new_height;
            present.surface.configure(&self.device, &present.config);
        } else {
            log::warn!(
                "WgpuGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    /// Switches between FIFO presentation and the lowest-latency mode available.
    pub fn set_vsync(&mut self, enabled: bool) {
        let Some(present) = self.surface.as_mut() else {
            return;
        };
        let mode = if enabled {
            wgpu::PresentMode::Fifo
        } else {
            [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
                .into_iter()
                .find(|m| present.present_modes.contains(m))
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        if present.config.present_mode != mode {
            present.config.present_mode = mode;
            present.surface.configure(&self.device, &present.config);
        }
    }

    /// Blocks until every submitted command has finished.
    pub fn poll_device_blocking(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("Failed to poll device: {e:?}");
        }
    }
}
