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


//! Render pipeline construction and the built-in clear and present passes.

use super::conversions::IntoWgpu;
use crate::graphics::shader::StageModule;
use vesta_core::renderer::{
    BlendMode, ClearMask, CullMode, DepthCompare, ResourceError, ShaderId, VertexFormat,
};

/// Everything a draw pipeline depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: ShaderId,
    pub vertex_format: Option<VertexFormat>,
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub compare: DepthCompare,
    pub cull: CullMode,
    pub blend: BlendMode,
}

/// Locations the vertex entry point reads from vertex buffers.
pub fn vertex_input_locations(stage: &StageModule) -> Vec<u32> {
    let module = &stage.module;
    let mut locations = Vec::new();
    for argument in &stage.entry_point().function.arguments {
        match &argument.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    locations.extend(members.iter().filter_map(|m| match m.binding {
                        Some(naga::Binding::Location { location, .. }) => Some(location),
                        _ => None,
                    }));
                }
            }
        }
    }
    locations
}

/// Checks that a mesh's vertex format feeds every location the shader reads.
pub fn check_vertex_inputs(
    stage: &StageModule,
    format: Option<&VertexFormat>,
) -> Result<(), ResourceError> {
    for location in vertex_input_locations(stage) {
        let provided = format.is_some_and(|f| f.elements().iter().any(|e| e.index == location));
        if !provided {
            return Err(ResourceError::InvalidDescriptor(format!(
                "the mesh provides no vertex attribute for shader location {location}"
            )));
        }
    }
    Ok(())
}

/// Inputs for [`create_draw_pipeline`].
pub struct DrawPipelineDesc<'a> {
    pub key: &'a PipelineKey,
    pub layout: &'a wgpu::PipelineLayout,
    pub vertex_module: &'a wgpu::ShaderModule,
    pub vertex_entry: &'a str,
    pub fragment_module: &'a wgpu::ShaderModule,
    pub fragment_entry: &'a str,
}

pub fn create_draw_pipeline(device: &wgpu::Device, desc: &DrawPipelineDesc<'_>) -> wgpu::RenderPipeline {
    let key = desc.key;
    log::debug!("WgpuDevice: Creating render pipeline for {:?}", key.shader);

    let attributes: Vec<wgpu::VertexAttribute> = key
        .vertex_format
        .iter()
        .flat_map(|format| format.offsets())
        .map(|(offset, element)| wgpu::VertexAttribute {
            format: element.into_wgpu(),
            offset: offset as u64,
            shader_location: element.index,
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout> = key
        .vertex_format
        .iter()
        .map(|format| wgpu::VertexBufferLayout {
            array_stride: format.stride() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        })
        .collect();

    let targets: Vec<Option<wgpu::ColorTargetState>> = key
        .color_formats
        .iter()
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format: *format,
                blend: Some(key.blend.into_wgpu()),
                write_mask: key.blend.mask.into_wgpu(),
            })
        })
        .collect();

    let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: key.compare.writes_depth(),
        depth_compare: key.compare.into_wgpu(),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Vesta Draw Pipeline"),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.vertex_module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.fragment_module,
            entry_point: Some(desc.fragment_entry),
            compilation_options: Default::default(),
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: key.cull.into_wgpu(),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

// --- Clears ---

/// Parameters of the clear pass, laid out as the clear shader's uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ClearUniform {
    pub color: [f32; 4],
    pub depth: f32,
    pub _padding: [f32; 3],
}

/// A full-screen triangle writing one color to `attachments` color outputs and
/// the uniform depth.
pub fn clear_shader_source(attachments: usize) -> String {
    let outputs: String = (0..attachments)
        .map(|i| format!("    @location({i}) c{i}: vec4<f32>,\n"))
        .collect();
    let assigns: String = (0..attachments)
        .map(|i| format!("    out.c{i} = params.color;\n"))
        .collect();
    format!(
        r#"struct Params {{ color: vec4<f32>, depth: f32 }}
@group(0) @binding(0) var<uniform> params: Params;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {{
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}}

struct Out {{
{outputs}    @builtin(frag_depth) depth: f32,
}}

@fragment
fn fs_main() -> Out {{
    var out: Out;
{assigns}    out.depth = params.depth;
    return out;
}}
"#
    )
}

/// Identifies a cached clear pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClearKey {
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub mask: ClearMask,
}

pub fn create_clear_pipeline(
    device: &wgpu::Device,
    key: &ClearKey,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    log::debug!("WgpuDevice: Creating clear pipeline for {key:?}");
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Vesta Clear Shader"),
        source: wgpu::ShaderSource::Wgsl(clear_shader_source(key.color_formats.len()).into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Vesta Clear Pipeline Layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    let write_mask = if key.mask.contains(ClearMask::COLOR) {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    };
    let targets: Vec<Option<wgpu::ColorTargetState>> = key
        .color_formats
        .iter()
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format: *format,
                blend: None,
                write_mask,
            })
        })
        .collect();

    let stencil_op = if key.mask.contains(ClearMask::STENCIL) {
        wgpu::StencilOperation::Replace
    } else {
        wgpu::StencilOperation::Keep
    };
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: stencil_op,
        depth_fail_op: stencil_op,
        pass_op: stencil_op,
    };
    let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: key.mask.contains(ClearMask::DEPTH),
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0xFF,
        },
        bias: wgpu::DepthBiasState::default(),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Vesta Clear Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

// --- Presentation ---

const BLIT_SHADER: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOut {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOut;
    out.position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return textureSample(source, source_sampler, in.uv);
}
"#;

pub fn create_blit_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Vesta Blit Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Copies the backbuffer onto a surface texture of `format`.
pub fn create_blit_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    log::debug!("WgpuDevice: Creating present pipeline for {format:?}");
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Vesta Blit Shader"),
        source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Vesta Blit Pipeline Layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Vesta Blit Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
