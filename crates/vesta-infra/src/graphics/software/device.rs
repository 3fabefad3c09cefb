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


use super::interp::{self, ShaderResources, VertexInvocation};
use super::raster::{self, DrawState, Plane, Planes, ShadedVertex};
use super::texture::SoftwareTexture;
use crate::graphics::shader::{compile_program, BindingKind, CompiledProgram, ShaderBindings};
use crate::graphics::validate_attachments;
use std::collections::HashMap;
use vesta_core::renderer::{
    ClearCommand, DrawCommand, IndexFormat, MeshId, Rect, RenderDevice, RenderError,
    RenderStats, RenderTargetId, Renderer, RendererAdapterInfo, RendererDeviceType,
    ResourceError, ResourceRegistry, ShaderData, ShaderError, ShaderId, TextureFormat,
    TextureId, TextureInfo, TextureSampler, UniformInfo, VertexFormat,
};

const ADAPTER_NAME: &str = "Vesta Software Rasterizer";

#[derive(Debug)]
struct TextureEntry {
    texture: SoftwareTexture,
    /// The render target this texture is an attachment of.
    owner: Option<RenderTargetId>,
}

#[derive(Debug)]
struct SoftwareRenderTarget {
    attachments: Vec<TextureId>,
}

#[derive(Debug)]
struct SoftwareMesh {
    vertex_format: Option<VertexFormat>,
    vertex_data: Vec<u8>,
    index_format: IndexFormat,
    index_data: Vec<u8>,
}

#[derive(Debug)]
struct SoftwareProgram {
    program: CompiledProgram,
    bindings: ShaderBindings,
}

/// A render device that rasterizes on the CPU.
///
/// Shaders run through a naga IR evaluator. The backbuffer is an in-memory
/// RGBA8 image with a depth-stencil plane; it is not presented to a window
/// and can be read back with [`SoftwareDevice::backbuffer_pixels`].
#[derive(Debug)]
pub struct SoftwareDevice {
    textures: ResourceRegistry<TextureId, TextureEntry>,
    targets: ResourceRegistry<RenderTargetId, SoftwareRenderTarget>,
    meshes: ResourceRegistry<MeshId, SoftwareMesh>,
    shaders: ResourceRegistry<ShaderId, SoftwareProgram>,
    backbuffer: SoftwareTexture,
    backbuffer_depth: SoftwareTexture,
    vsync: bool,
    stats: RenderStats,
    frame_number: u64,
}

impl SoftwareDevice {
    /// Creates a device with a `width` x `height` backbuffer.
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("SoftwareDevice: created with a {width}x{height} backbuffer");
        Self {
            textures: ResourceRegistry::new(),
            targets: ResourceRegistry::new(),
            meshes: ResourceRegistry::new(),
            shaders: ResourceRegistry::new(),
            backbuffer: backbuffer_plane(width, height, TextureFormat::Rgba8)
                .unwrap_or_else(|e| empty_plane(TextureFormat::Rgba8, &e)),
            backbuffer_depth: backbuffer_plane(width, height, TextureFormat::Depth24Stencil8)
                .unwrap_or_else(|e| empty_plane(TextureFormat::Depth24Stencil8, &e)),
            vsync: false,
            stats: RenderStats::default(),
            frame_number: 0,
        }
    }

    /// The backbuffer's RGBA8 pixels, top row first.
    pub fn backbuffer_pixels(&self) -> &[u8] {
        &self.backbuffer.data
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    fn texture(&self, id: TextureId) -> Result<&SoftwareTexture, ResourceError> {
        self.textures.get(id).map(|e| &e.texture)
    }

    fn texture_mut(&mut self, id: TextureId) -> Result<&mut SoftwareTexture, ResourceError> {
        self.textures.get_mut(id).map(|e| &mut e.texture)
    }

    fn program_mut(&mut self, shader: ShaderId) -> Result<&mut SoftwareProgram, ResourceError> {
        self.shaders.get_mut(shader)
    }

    /// Moves the pixels of a command's target out of their textures.
    fn take_planes(&mut self, target: Option<RenderTargetId>) -> Result<Planes, ResourceError> {
        let Some(target) = target else {
            return Ok(Planes {
                width: self.backbuffer.info.width,
                height: self.backbuffer.info.height,
                colors: vec![Plane {
                    texture: None,
                    format: TextureFormat::Rgba8,
                    data: std::mem::take(&mut self.backbuffer.data),
                }],
                depth: Some(Plane {
                    texture: None,
                    format: TextureFormat::Depth24Stencil8,
                    data: std::mem::take(&mut self.backbuffer_depth.data),
                }),
            });
        };

        let attachments = self.targets.get(target)?.attachments.clone();
        let first = self.texture(attachments[0])?.info;
        let mut planes = Planes {
            width: first.width,
            height: first.height,
            colors: Vec::with_capacity(attachments.len()),
            depth: None,
        };
        for id in attachments {
            let texture = self.texture_mut(id)?;
            let plane = Plane {
                texture: Some(id),
                format: texture.info.format,
                data: std::mem::take(&mut texture.data),
            };
            if plane.format.is_depth_stencil() {
                planes.depth = Some(plane);
            } else {
                planes.colors.push(plane);
            }
        }
        Ok(planes)
    }

    /// Returns pixels taken by [`take_planes`](Self::take_planes).
    fn restore_planes(&mut self, planes: Planes) {
        for plane in planes.colors.into_iter().chain(planes.depth) {
            match plane.texture {
                Some(id) => {
                    if let Ok(texture) = self.texture_mut(id) {
                        texture.data = plane.data;
                    }
                }
                None if plane.format.is_depth_stencil() => self.backbuffer_depth.data = plane.data,
                None => self.backbuffer.data = plane.data,
            }
        }
    }

    fn execute_draw(&self, command: &DrawCommand, planes: &mut Planes) -> Result<(), RenderError> {
        let program = self.shaders.get(command.shader)?;
        let mesh = self.meshes.get(command.mesh)?;

        let vertex_count = match &mesh.vertex_format {
            Some(format) => Some(format.vertex_count(mesh.vertex_data.len())?),
            None => None,
        };
        let indices = resolve_indices(mesh, command, vertex_count)?;

        let attachments: Vec<TextureId> = planes
            .colors
            .iter()
            .chain(planes.depth.as_ref())
            .filter_map(|p| p.texture)
            .collect();
        program.bindings.check_feedback(&attachments)?;
        let resources = self.bind_resources(&program.bindings)?;
        let bounds = planes.bounds();
        let state = DrawState {
            viewport: command.resolved_viewport(bounds),
            clip: command.clip_rect(bounds),
            compare: command.compare,
            cull: command.cull,
            blend: command.blend,
        };
        if state.clip.is_empty() || state.viewport.is_empty() {
            return Ok(());
        }

        let shader_error = |details: String| {
            RenderError::Internal(format!("shader execution failed: {details}"))
        };

        for instance in 0..command.instances() {
            let mut shaded: HashMap<u32, ShadedVertex> = HashMap::new();
            for &index in &indices {
                if shaded.contains_key(&index) {
                    continue;
                }
                let attributes = match &mesh.vertex_format {
                    Some(format) => raster::fetch_attributes(format, &mesh.vertex_data, index),
                    None => Vec::new(),
                };
                let output = interp::run_vertex(
                    &program.program.vertex,
                    &resources,
                    &VertexInvocation {
                        attributes: &attributes,
                        vertex_index: index,
                        instance_index: instance,
                    },
                )
                .map_err(shader_error)?;
                let position = output
                    .position
                    .ok_or_else(|| shader_error("vertex stage wrote no position".to_string()))?;
                shaded.insert(
                    index,
                    ShadedVertex {
                        position,
                        varyings: output.locations,
                    },
                );
            }

            for triangle in indices.chunks_exact(3) {
                let vertices = [&shaded[&triangle[0]], &shaded[&triangle[1]], &shaded[&triangle[2]]];
                raster::rasterize_triangle(planes, &state, vertices, |invocation| {
                    interp::run_fragment(&program.program.fragment, &resources, invocation)
                })
                .map_err(shader_error)?;
            }
        }
        Ok(())
    }

    /// Resolves a program's bindings to borrowed CPU resources.
    fn bind_resources<'a>(&'a self, bindings: &'a ShaderBindings) -> Result<ShaderResources<'a>, ResourceError> {
        let mut resources = ShaderResources::default();
        for (i, binding) in bindings.reflection().bindings.iter().enumerate() {
            match binding.kind {
                BindingKind::UniformBuffer { .. } => {
                    resources.uniform_buffers.insert(binding.slot, bindings.buffer(i));
                }
                BindingKind::Texture => {
                    if let Some(id) = bindings.texture(i) {
                        resources.textures.insert(binding.slot, self.texture(id)?.view());
                    }
                }
                BindingKind::Sampler => {
                    resources.samplers.insert(binding.slot, bindings.sampler(i));
                }
            }
        }
        Ok(resources)
    }
}

fn backbuffer_plane(
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<SoftwareTexture, ResourceError> {
    SoftwareTexture::new(TextureInfo {
        width,
        height,
        format,
    })
}

/// A 0x0 plane standing in for a backbuffer that could not be allocated.
fn empty_plane(format: TextureFormat, cause: &ResourceError) -> SoftwareTexture {
    log::error!("SoftwareDevice: backbuffer allocation failed, rendering to an empty surface: {cause}");
    SoftwareTexture {
        info: TextureInfo {
            width: 0,
            height: 0,
            format,
        },
        data: Vec::new(),
    }
}

/// The vertex indices a draw visits, in order.
fn resolve_indices(
    mesh: &SoftwareMesh,
    command: &DrawCommand,
    vertex_count: Option<usize>,
) -> Result<Vec<u32>, ResourceError> {
    let end = command
        .index_start
        .checked_add(command.index_count)
        .ok_or(ResourceError::OutOfBounds)?;

    let indices: Vec<u32> = if mesh.index_data.is_empty() {
        (command.index_start..end).collect()
    } else {
        let all = mesh.index_format.decode(&mesh.index_data);
        all.get(command.index_start as usize..end as usize)
            .ok_or(ResourceError::OutOfBounds)?
            .to_vec()
    };

    if let Some(count) = vertex_count {
        if indices.iter().any(|i| *i as usize >= count) {
            return Err(ResourceError::OutOfBounds);
        }
    }
    Ok(indices)
}

impl RenderDevice for SoftwareDevice {
    fn adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo {
            name: ADAPTER_NAME.to_string(),
            renderer: Renderer::Software,
            device_type: RendererDeviceType::Cpu,
        }
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.frame_number += 1;
        self.stats.begin_frame(self.frame_number);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<RenderStats, RenderError> {
        Ok(self.stats)
    }

    fn last_frame_stats(&self) -> RenderStats {
        self.stats
    }

    fn resize_backbuffer(&mut self, width: u32, height: u32) {
        log::debug!("SoftwareDevice: resizing backbuffer to {width}x{height}");
        let planes = backbuffer_plane(width, height, TextureFormat::Rgba8).and_then(|color| {
            backbuffer_plane(width, height, TextureFormat::Depth24Stencil8).map(|depth| (color, depth))
        });
        match planes {
            Ok((color, depth)) => {
                self.backbuffer = color;
                self.backbuffer_depth = depth;
            }
            Err(e) => log::error!(
                "SoftwareDevice: keeping the {}x{} backbuffer, resize to {width}x{height} failed: {e}",
                self.backbuffer.info.width,
                self.backbuffer.info.height
            ),
        }
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        (self.backbuffer.info.width, self.backbuffer.info.height)
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }

    fn shutdown(&mut self) {
        let live = self.textures.len() + self.meshes.len() + self.shaders.len() + self.targets.len();
        if live > 0 {
            log::debug!("SoftwareDevice: releasing {live} live resources on shutdown");
        }
        self.targets.drain().for_each(drop);
        self.textures.drain().for_each(drop);
        self.meshes.drain().for_each(drop);
        self.shaders.drain().for_each(drop);
    }

    // --- Textures ---

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<TextureId, ResourceError> {
        let info = TextureInfo {
            width,
            height,
            format,
        };
        info.validate().inspect_err(|e| log::error!("SoftwareDevice: {e}"))?;
        let texture =
            SoftwareTexture::new(info).inspect_err(|e| log::error!("SoftwareDevice: {e}"))?;
        let id = self.textures.insert(TextureEntry {
            texture,
            owner: None,
        });
        log::debug!("SoftwareDevice: created texture {id:?} ({width}x{height} {format:?})");
        Ok(id)
    }

    fn texture_info(&self, texture: TextureId) -> Result<TextureInfo, ResourceError> {
        Ok(self.texture(texture)?.info)
    }

    fn set_texture_data(&mut self, texture: TextureId, data: &[u8]) -> Result<(), ResourceError> {
        let target = self.texture_mut(texture)?;
        let bounds = target.info.bounds();
        target.info.validate_region(&bounds, data.len())?;
        target.data.copy_from_slice(data);
        Ok(())
    }

    fn set_texture_sub_data(
        &mut self,
        texture: TextureId,
        region: Rect,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let target = self.texture_mut(texture)?;
        target.info.validate_region(&region, data.len())?;
        target.write_region(&region, data);
        Ok(())
    }

    fn get_texture_data(&mut self, texture: TextureId, output: &mut [u8]) -> Result<(), ResourceError> {
        let source = self.texture(texture)?;
        if output.len() != source.data.len() {
            return Err(ResourceError::DataSizeMismatch {
                expected: source.data.len(),
                actual: output.len(),
            });
        }
        output.copy_from_slice(&source.data);
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), ResourceError> {
        if self.textures.get(texture)?.owner.is_some() {
            return Err(ResourceError::AttachmentOwned);
        }
        self.textures.remove(texture)?;
        log::debug!("SoftwareDevice: destroyed texture {texture:?}");
        Ok(())
    }

    // --- Render targets ---

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureFormat],
    ) -> Result<RenderTargetId, ResourceError> {
        validate_attachments(attachments).inspect_err(|e| log::error!("SoftwareDevice: {e}"))?;
        let infos: Vec<TextureInfo> = attachments
            .iter()
            .map(|format| TextureInfo {
                width,
                height,
                format: *format,
            })
            .collect();
        let textures = infos
            .into_iter()
            .map(|info| {
                info.validate()?;
                SoftwareTexture::new(info)
            })
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| log::error!("SoftwareDevice: {e}"))?;

        let ids: Vec<TextureId> = textures
            .into_iter()
            .map(|texture| {
                self.textures.insert(TextureEntry {
                    texture,
                    owner: None,
                })
            })
            .collect();
        let target = self.targets.insert(SoftwareRenderTarget {
            attachments: ids.clone(),
        });
        for id in ids {
            if let Ok(entry) = self.textures.get_mut(id) {
                entry.owner = Some(target);
            }
        }
        log::debug!(
            "SoftwareDevice: created render target {target:?} ({width}x{height}, {} attachments)",
            attachments.len()
        );
        Ok(target)
    }

    fn render_target_attachment(
        &self,
        target: RenderTargetId,
        index: usize,
    ) -> Result<TextureId, ResourceError> {
        self.targets
            .get(target)?
            .attachments
            .get(index)
            .copied()
            .ok_or(ResourceError::OutOfBounds)
    }

    fn destroy_render_target(&mut self, target: RenderTargetId) -> Result<(), ResourceError> {
        let removed = self.targets.remove(target)?;
        for id in removed.attachments {
            let _ = self.textures.remove(id);
        }
        log::debug!("SoftwareDevice: destroyed render target {target:?}");
        Ok(())
    }

    // --- Shaders ---

    fn create_shader(&mut self, data: &ShaderData) -> Result<ShaderId, ResourceError> {
        let program = compile_program(data).and_then(|program| {
            for stage in [&program.vertex, &program.fragment] {
                interp::check_supported(stage).map_err(|reason| ShaderError::CompilationError {
                    stage: crate::graphics::shader::reflect::stage_name(stage.stage).to_string(),
                    details: format!("the software renderer does not support {reason}"),
                })?;
            }
            Ok(program)
        });
        let program = program.inspect_err(|e| log::error!("SoftwareDevice: {e}"))?;

        let bindings = ShaderBindings::new(program.reflection.clone());
        let uniforms = bindings.uniforms().len();
        let id = self.shaders.insert(SoftwareProgram { program, bindings });
        log::debug!("SoftwareDevice: created shader {id:?} with {uniforms} uniforms");
        Ok(id)
    }

    fn shader_uniforms(
        &self,
        shader: ShaderId,
        output: &mut [UniformInfo],
    ) -> Result<usize, ResourceError> {
        Ok(self.shaders.get(shader)?.bindings.query(output))
    }

    fn set_uniform(&mut self, shader: ShaderId, index: usize, values: &[f32]) -> Result<(), ResourceError> {
        Ok(self.program_mut(shader)?.bindings.set_uniform(index, values)?)
    }

    fn set_texture(
        &mut self,
        shader: ShaderId,
        index: usize,
        textures: &[Option<TextureId>],
    ) -> Result<(), ResourceError> {
        Ok(self.program_mut(shader)?.bindings.set_texture(index, textures)?)
    }

    fn set_sampler(
        &mut self,
        shader: ShaderId,
        index: usize,
        samplers: &[TextureSampler],
    ) -> Result<(), ResourceError> {
        Ok(self.program_mut(shader)?.bindings.set_sampler(index, samplers)?)
    }

    fn destroy_shader(&mut self, shader: ShaderId) -> Result<(), ResourceError> {
        self.shaders.remove(shader)?;
        log::debug!("SoftwareDevice: destroyed shader {shader:?}");
        Ok(())
    }

    // --- Meshes ---

    fn create_mesh(&mut self) -> Result<MeshId, ResourceError> {
        Ok(self.meshes.insert(SoftwareMesh {
            vertex_format: None,
            vertex_data: Vec::new(),
            index_format: IndexFormat::Uint16,
            index_data: Vec::new(),
        }))
    }

    fn set_vertex_format(&mut self, mesh: MeshId, format: &VertexFormat) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        mesh.vertex_format = Some(format.clone());
        mesh.vertex_data.clear();
        Ok(())
    }

    fn set_vertex_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        let format = mesh
            .vertex_format
            .as_ref()
            .ok_or(ResourceError::MissingVertexFormat)?;
        format.vertex_count(data.len())?;
        mesh.vertex_data = data.to_vec();
        Ok(())
    }

    fn set_index_format(&mut self, mesh: MeshId, format: IndexFormat) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        mesh.index_format = format;
        mesh.index_data.clear();
        Ok(())
    }

    fn set_index_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        mesh.index_format.index_count(data.len())?;
        mesh.index_data = data.to_vec();
        Ok(())
    }

    fn destroy_mesh(&mut self, mesh: MeshId) -> Result<(), ResourceError> {
        self.meshes.remove(mesh)?;
        Ok(())
    }

    // --- Commands ---

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        let mut planes = self.take_planes(command.target)?;
        let result = self.execute_draw(command, &mut planes);
        self.restore_planes(planes);
        result?;
        self.stats.record_draw(command.index_count, command.instances());
        Ok(())
    }

    fn clear(&mut self, command: &ClearCommand) -> Result<(), RenderError> {
        let mut planes = self.take_planes(command.target)?;
        planes.clear(command);
        self.restore_planes(planes);
        self.stats.record_clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::renderer::{Color, VertexElement, VertexType};

    #[test]
    fn render_target_attachments_are_owned() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device
            .create_render_target(4, 4, &[TextureFormat::Rgba8, TextureFormat::Depth24Stencil8])
            .unwrap();
        let color = device.render_target_attachment(target, 0).unwrap();
        assert_eq!(device.destroy_texture(color), Err(ResourceError::AttachmentOwned));
        assert_eq!(
            device.render_target_attachment(target, 2),
            Err(ResourceError::OutOfBounds)
        );

        device.destroy_render_target(target).unwrap();
        assert_eq!(device.texture_info(color), Err(ResourceError::InvalidHandle));
    }

    #[test]
    fn invalid_attachment_lists_are_rejected() {
        let mut device = SoftwareDevice::new(4, 4);
        assert!(matches!(
            device.create_render_target(4, 4, &[]),
            Err(ResourceError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            device.create_render_target(
                4,
                4,
                &[TextureFormat::Depth24Stencil8, TextureFormat::Depth24Stencil8]
            ),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn new_vertex_format_discards_vertex_data() {
        let mut device = SoftwareDevice::new(1, 1);
        let mesh = device.create_mesh().unwrap();
        let format = VertexFormat::packed(vec![VertexElement::new(0, VertexType::Float2, false)]).unwrap();
        device.set_vertex_format(mesh, &format).unwrap();
        device.set_vertex_data(mesh, &[0; 24]).unwrap();
        device.set_vertex_format(mesh, &format).unwrap();
        assert!(device.meshes.get(mesh).unwrap().vertex_data.is_empty());
    }

    #[test]
    fn index_range_beyond_buffer_is_out_of_bounds() {
        let mesh = SoftwareMesh {
            vertex_format: None,
            vertex_data: Vec::new(),
            index_format: IndexFormat::Uint16,
            index_data: vec![0, 0, 1, 0, 2, 0],
        };
        let command = DrawCommand::new(MeshId(1), ShaderId(1), 3).with_range(1, 3);
        assert_eq!(resolve_indices(&mesh, &command, None), Err(ResourceError::OutOfBounds));
        let command = DrawCommand::new(MeshId(1), ShaderId(1), 3);
        assert_eq!(resolve_indices(&mesh, &command, Some(2)), Err(ResourceError::OutOfBounds));
        assert_eq!(resolve_indices(&mesh, &command, Some(3)), Ok(vec![0, 1, 2]));
    }

    #[test]
    fn clear_backbuffer_and_read_pixels() {
        let mut device = SoftwareDevice::new(2, 2);
        device.begin_frame().unwrap();
        device.clear(&ClearCommand::color(Color::GREEN)).unwrap();
        let stats = device.end_frame().unwrap();
        assert_eq!(stats.clear_calls, 1);
        assert!(device
            .backbuffer_pixels()
            .chunks_exact(4)
            .all(|p| p == Color::GREEN.to_bytes()));
    }
}
