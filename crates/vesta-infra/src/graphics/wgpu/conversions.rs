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


use vesta_core::renderer::{
    BlendFactor, BlendMask, BlendMode, BlendOp, Color, CullMode, DepthCompare, IndexFormat,
    Renderer, RendererDeviceType, TextureFilter, TextureFormat, TextureWrap, VertexElement,
    VertexType,
};

/// A local extension trait to convert Vesta's types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Textures ---

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
            TextureFormat::Depth24Stencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for TextureFilter {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for TextureWrap {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
            TextureWrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

// --- Meshes ---

impl IntoWgpu<wgpu::VertexFormat> for VertexElement {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        use wgpu::VertexFormat as F;
        match (self.ty, self.normalized) {
            (VertexType::Float, _) => F::Float32,
            (VertexType::Float2, _) => F::Float32x2,
            (VertexType::Float3, _) => F::Float32x3,
            (VertexType::Float4, _) => F::Float32x4,
            (VertexType::Byte4, true) => F::Snorm8x4,
            (VertexType::Byte4, false) => F::Sint8x4,
            (VertexType::UByte4, true) => F::Unorm8x4,
            (VertexType::UByte4, false) => F::Uint8x4,
            (VertexType::Short2, true) => F::Snorm16x2,
            (VertexType::Short2, false) => F::Sint16x2,
            (VertexType::UShort2, true) => F::Unorm16x2,
            (VertexType::UShort2, false) => F::Uint16x2,
            (VertexType::Short4, true) => F::Snorm16x4,
            (VertexType::Short4, false) => F::Sint16x4,
            (VertexType::UShort4, true) => F::Unorm16x4,
            (VertexType::UShort4, false) => F::Uint16x4,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::CompareFunction> for DepthCompare {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            DepthCompare::None | DepthCompare::Always => wgpu::CompareFunction::Always,
            DepthCompare::Never => wgpu::CompareFunction::Never,
            DepthCompare::Less => wgpu::CompareFunction::Less,
            DepthCompare::Equal => wgpu::CompareFunction::Equal,
            DepthCompare::LessOrEqual => wgpu::CompareFunction::LessEqual,
            DepthCompare::Greater => wgpu::CompareFunction::Greater,
            DepthCompare::NotEqual => wgpu::CompareFunction::NotEqual,
            DepthCompare::GreaterOrEqual => wgpu::CompareFunction::GreaterEqual,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
            BlendFactor::ConstantColor => wgpu::BlendFactor::Constant,
            BlendFactor::OneMinusConstantColor => wgpu::BlendFactor::OneMinusConstant,
            BlendFactor::SrcAlphaSaturate => wgpu::BlendFactor::SrcAlphaSaturated,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOp {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOp::Add => wgpu::BlendOperation::Add,
            BlendOp::Subtract => wgpu::BlendOperation::Subtract,
            BlendOp::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOp::Min => wgpu::BlendOperation::Min,
            BlendOp::Max => wgpu::BlendOperation::Max,
        }
    }
}

fn blend_component(op: BlendOp, src: BlendFactor, dst: BlendFactor) -> wgpu::BlendComponent {
    // Min and Max ignore their factors; wgpu requires them to be One.
    let (src, dst) = match op {
        BlendOp::Min | BlendOp::Max => (BlendFactor::One, BlendFactor::One),
        _ => (src, dst),
    };
    wgpu::BlendComponent {
        src_factor: src.into_wgpu(),
        dst_factor: dst.into_wgpu(),
        operation: op.into_wgpu(),
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendMode {
    fn into_wgpu(self) -> wgpu::BlendState {
        wgpu::BlendState {
            color: blend_component(self.color_op, self.color_src, self.color_dst),
            alpha: blend_component(self.alpha_op, self.alpha_src, self.alpha_dst),
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for BlendMask {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        let mut writes = wgpu::ColorWrites::empty();
        if self.contains(BlendMask::RED) {
            writes |= wgpu::ColorWrites::RED;
        }
        if self.contains(BlendMask::GREEN) {
            writes |= wgpu::ColorWrites::GREEN;
        }
        if self.contains(BlendMask::BLUE) {
            writes |= wgpu::ColorWrites::BLUE;
        }
        if self.contains(BlendMask::ALPHA) {
            writes |= wgpu::ColorWrites::ALPHA;
        }
        writes
    }
}

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.to_f32_array();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

// --- Adapters ---

/// The wgpu backends a renderer choice may use.
impl IntoWgpu<wgpu::Backends> for Renderer {
    fn into_wgpu(self) -> wgpu::Backends {
        match self {
            Renderer::Default => wgpu::Backends::all(),
            Renderer::Software => wgpu::Backends::empty(),
            Renderer::Vulkan => wgpu::Backends::VULKAN,
            Renderer::Metal => wgpu::Backends::METAL,
            Renderer::Dx12 => wgpu::Backends::DX12,
            Renderer::OpenGL => wgpu::Backends::GL,
        }
    }
}

/// The renderer kind an adapter's backend corresponds to.
/// This is a free function because we cannot implement `From` due to orphan rules.
pub fn renderer_from_wgpu(backend: wgpu::Backend) -> Renderer {
    match backend {
        wgpu::Backend::Vulkan => Renderer::Vulkan,
        wgpu::Backend::Metal => Renderer::Metal,
        wgpu::Backend::Dx12 => Renderer::Dx12,
        wgpu::Backend::Gl => Renderer::OpenGL,
        _ => Renderer::Default,
    }
}

pub fn device_type_from_wgpu(device_type: wgpu::DeviceType) -> RendererDeviceType {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => RendererDeviceType::IntegratedGpu,
        wgpu::DeviceType::DiscreteGpu => RendererDeviceType::DiscreteGpu,
        wgpu::DeviceType::VirtualGpu => RendererDeviceType::VirtualGpu,
        wgpu::DeviceType::Cpu => RendererDeviceType::Cpu,
        _ => RendererDeviceType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_conversion() {
        assert_eq!(
            wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8.into_wgpu()
        );
        assert_eq!(
            wgpu::TextureFormat::Depth24PlusStencil8,
            TextureFormat::Depth24Stencil8.into_wgpu()
        );
    }

    #[test]
    fn test_vertex_element_conversion() {
        let normalized: wgpu::VertexFormat = VertexElement::new(0, VertexType::UByte4, true).into_wgpu();
        assert_eq!(wgpu::VertexFormat::Unorm8x4, normalized);
        let raw: wgpu::VertexFormat = VertexElement::new(0, VertexType::Short2, false).into_wgpu();
        assert_eq!(wgpu::VertexFormat::Sint16x2, raw);
    }

    #[test]
    fn test_depth_none_always_passes() {
        let compare: wgpu::CompareFunction = DepthCompare::None.into_wgpu();
        assert_eq!(wgpu::CompareFunction::Always, compare);
    }

    #[test]
    fn test_cull_mode_conversion() {
        let back: Option<wgpu::Face> = CullMode::Back.into_wgpu();
        assert_eq!(Some(wgpu::Face::Back), back);
        let none: Option<wgpu::Face> = CullMode::None.into_wgpu();
        assert_eq!(None, none);
    }

    #[test]
    fn test_min_max_blend_uses_unit_factors() {
        let mode = BlendMode::uniform(BlendOp::Max, BlendFactor::SrcAlpha, BlendFactor::Zero);
        let state: wgpu::BlendState = mode.into_wgpu();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.alpha.operation, wgpu::BlendOperation::Max);
    }

    #[test]
    fn test_blend_mask_conversion() {
        let writes: wgpu::ColorWrites = BlendMask::RGB.into_wgpu();
        assert_eq!(wgpu::ColorWrites::COLOR, writes);
        let all: wgpu::ColorWrites = BlendMask::RGBA.into_wgpu();
        assert_eq!(wgpu::ColorWrites::ALL, all);
    }

    #[test]
    fn test_renderer_backends() {
        let vulkan: wgpu::Backends = Renderer::Vulkan.into_wgpu();
        assert_eq!(wgpu::Backends::VULKAN, vulkan);
        assert_eq!(renderer_from_wgpu(wgpu::Backend::Gl), Renderer::OpenGL);
    }
}
