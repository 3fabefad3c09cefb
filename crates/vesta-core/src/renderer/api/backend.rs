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


//! Backend selection and adapter reporting.

use serde::{Deserialize, Serialize};

/// The renderer requested at startup.
///
/// GPU variants restrict the GPU backend to one graphics API. `Default`
/// picks any available GPU API and falls back to `Software` when none exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    #[default]
    Default,
    /// The CPU rasterizer. Always available.
    Software,
    Vulkan,
    Metal,
    Dx12,
    #[serde(rename = "opengl")]
    OpenGL,
}

impl Renderer {
    /// `true` if this choice requires the GPU backend.
    pub const fn requires_gpu(self) -> bool {
        matches!(
            self,
            Renderer::Vulkan | Renderer::Metal | Renderer::Dx12 | Renderer::OpenGL
        )
    }
}

/// The physical type of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererDeviceType {
    /// A GPU integrated into the CPU.
    IntegratedGpu,
    /// A discrete, dedicated GPU.
    DiscreteGpu,
    /// A virtualized or software-based GPU.
    VirtualGpu,
    /// A software renderer running on the CPU.
    Cpu,
    #[default]
    Unknown,
}

/// Backend-agnostic description of the device executing commands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RendererAdapterInfo {
    /// The adapter's name (e.g. "NVIDIA GeForce RTX 4090" or "Vesta Software Rasterizer").
    pub name: String,
    /// The renderer actually in use.
    pub renderer: Renderer,
    pub device_type: RendererDeviceType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        renderer: Renderer,
    }

    #[test]
    fn renderer_names_deserialize_lowercase() {
        let holder: Holder = toml::from_str("renderer = \"opengl\"").unwrap();
        assert_eq!(holder.renderer, Renderer::OpenGL);
        let holder: Holder = toml::from_str("renderer = \"software\"").unwrap();
        assert_eq!(holder.renderer, Renderer::Software);
    }

    #[test]
    fn only_explicit_apis_require_gpu() {
        assert!(Renderer::Vulkan.requires_gpu());
        assert!(!Renderer::Default.requires_gpu());
        assert!(!Renderer::Software.requires_gpu());
    }
}
