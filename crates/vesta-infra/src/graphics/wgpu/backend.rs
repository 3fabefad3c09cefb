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


//! Adapter selection for a requested renderer.
//!
//! An explicit GPU API restricts the instance to that API. `Renderer::Default`
//! lets wgpu pick among every available backend.

use super::conversions::IntoWgpu;
use vesta_core::renderer::{RenderError, Renderer};
use wgpu::{Adapter, Backend, Instance, RequestAdapterOptions};

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

/// Creates an instance limited to the backends `renderer` allows.
pub fn create_instance(renderer: Renderer) -> Result<Instance, RenderError> {
    if !renderer.requires_gpu() && renderer != Renderer::Default {
        return Err(RenderError::InitializationFailed(format!(
            "{renderer:?} is not a GPU renderer"
        )));
    }
    Ok(Instance::new(&wgpu::InstanceDescriptor {
        backends: renderer.into_wgpu(),
        ..Default::default()
    }))
}

/// Requests an adapter able to present to `surface`, if one is given.
pub fn select_adapter(
    instance: &Instance,
    renderer: Renderer,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<Adapter, RenderError> {
    log::info!("Starting WGPU adapter selection for {renderer:?}...");

    let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))
    .map_err(|e| {
        log::warn!("No WGPU adapter available for {renderer:?}: {e}");
        RenderError::InitializationFailed(format!(
            "Failed to find suitable adapter for {renderer:?}: {e}"
        ))
    })?;

    let info = adapter.get_info();
    let wanted: wgpu::Backends = renderer.into_wgpu();
    if !wanted.contains(wgpu::Backends::from(info.backend)) {
        return Err(RenderError::InitializationFailed(format!(
            "Adapter returned wrong backend: requested {renderer:?}, got {}",
            backend_name(info.backend)
        )));
    }

    log::info!(
        "Selected {} adapter: \"{}\" (Device: {:?})",
        backend_name(info.backend),
        info.name,
        info.device_type
    );
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_is_not_a_wgpu_renderer() {
        assert!(matches!(
            create_instance(Renderer::Software),
            Err(RenderError::InitializationFailed(_))
        ));
    }

    #[test]
    fn backend_names() {
        assert_eq!(backend_name(Backend::Dx12), "DirectX 12");
        assert_eq!(backend_name(Backend::Gl), "OpenGL");
    }
}
