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


use super::context::WgpuGraphicsContext;
use super::conversions::{device_type_from_wgpu, renderer_from_wgpu, IntoWgpu};
use super::pipeline::{
    check_vertex_inputs, create_blit_layout, create_blit_pipeline, create_clear_pipeline,
    create_draw_pipeline, ClearKey, ClearUniform, DrawPipelineDesc, PipelineKey,
};
use crate::graphics::shader::{compile_program, BindingKind, CompiledProgram, ShaderBindings};
use crate::graphics::validate_attachments;
use std::collections::HashMap;
use vesta_core::platform::VestaWindowHandle;
use vesta_core::renderer::{
    ClearCommand, ClearMask, DrawCommand, IndexFormat, MeshId, Rect, RenderDevice, RenderError,
    RenderStats, RenderTargetId, Renderer, RendererAdapterInfo, ResourceError, ResourceRegistry,
    ShaderData, ShaderId, TextureFormat, TextureId, TextureInfo, TextureSampler, UniformInfo,
    VertexFormat,
};
use wgpu::util::DeviceExt;

#[derive(Debug)]
struct WgpuTextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    info: TextureInfo,
    owner: Option<RenderTargetId>,
}

#[derive(Debug)]
struct WgpuRenderTargetEntry {
    attachments: Vec<TextureId>,
}

#[derive(Debug)]
struct WgpuMeshEntry {
    vertex_format: Option<VertexFormat>,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: usize,
    index_format: IndexFormat,
    index_buffer: Option<wgpu::Buffer>,
    /// CPU copy of the indices, for range checks.
    indices: Vec<u32>,
}

#[derive(Debug)]
struct WgpuShaderEntry {
    program: CompiledProgram,
    bindings: ShaderBindings,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    /// One per uniform buffer binding, indexed like the reflected bindings.
    uniform_buffers: Vec<Option<wgpu::Buffer>>,
    group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Debug)]
struct Backbuffer {
    width: u32,
    height: u32,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

/// Formats, bounds and attachment handles of a command's target.
struct TargetLayout {
    color_formats: Vec<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    bounds: Rect,
    attachments: Vec<TextureId>,
}

const BACKBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BACKBUFFER_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// A render device backed by `wgpu`.
///
/// Draws and clears go to an offscreen RGBA8 backbuffer with a depth-stencil
/// plane. `end_frame` copies the backbuffer to the window surface when there
/// is one. Every command is recorded and submitted before the call returns.
#[derive(Debug)]
pub struct WgpuDevice {
    context: WgpuGraphicsContext,
    textures: ResourceRegistry<TextureId, WgpuTextureEntry>,
    targets: ResourceRegistry<RenderTargetId, WgpuRenderTargetEntry>,
    meshes: ResourceRegistry<MeshId, WgpuMeshEntry>,
    shaders: ResourceRegistry<ShaderId, WgpuShaderEntry>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<TextureSampler, wgpu::Sampler>,
    clear_layout: wgpu::BindGroupLayout,
    clear_uniform: wgpu::Buffer,
    clear_bind_group: wgpu::BindGroup,
    clear_pipelines: HashMap<ClearKey, wgpu::RenderPipeline>,
    blit_layout: wgpu::BindGroupLayout,
    blit_pipeline: Option<(wgpu::TextureFormat, wgpu::RenderPipeline)>,
    backbuffer: Backbuffer,
    /// Bound in place of texture slots with no texture.
    fallback_view: wgpu::TextureView,
    vsync: bool,
    stats: RenderStats,
    frame_number: u64,
}

impl WgpuDevice {
    /// Creates a device for `renderer`, presenting to `window` if one is given.
    ///
    /// ## Errors
    /// `RenderError::InitializationFailed` if no adapter or device is available.
    pub fn new(
        renderer: Renderer,
        window: Option<VestaWindowHandle>,
        size: (u32, u32),
    ) -> Result<Self, RenderError> {
        let context = WgpuGraphicsContext::new(renderer, window, size)?;
        let device = &context.device;

        let clear_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Vesta Clear Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let clear_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vesta Clear Uniform"),
            size: std::mem::size_of::<ClearUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let clear_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Vesta Clear Bind Group"),
            layout: &clear_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: clear_uniform.as_entire_binding(),
            }],
        });
        let blit_layout = create_blit_layout(device);

        let fallback = device.create_texture_with_data(
            &context.queue,
            &wgpu::TextureDescriptor {
                label: Some("Vesta Fallback Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let fallback_view = fallback.create_view(&wgpu::TextureViewDescriptor::default());
        let backbuffer = create_backbuffer(device, size.0, size.1);

        log::info!(
            "WgpuDevice: Successfully created on \"{}\" ({})",
            context.adapter.get_info().name,
            context.backend_name()
        );

        Ok(Self {
            context,
            textures: ResourceRegistry::new(),
            targets: ResourceRegistry::new(),
            meshes: ResourceRegistry::new(),
            shaders: ResourceRegistry::new(),
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            clear_layout,
            clear_uniform,
            clear_bind_group,
            clear_pipelines: HashMap::new(),
            blit_layout,
            blit_pipeline: None,
            backbuffer,
            fallback_view,
            vsync: true,
            stats: RenderStats::default(),
            frame_number: 0,
        })
    }

    /// Reads the backbuffer's RGBA8 pixels, top row first.
    pub fn read_backbuffer(&self) -> Result<Vec<u8>, ResourceError> {
        let info = TextureInfo {
            width: self.backbuffer.width,
            height: self.backbuffer.height,
            format: TextureFormat::Rgba8,
        };
        self.read_texture(&self.backbuffer.color, info)
    }

    fn read_texture(&self, texture: &wgpu::Texture, info: TextureInfo) -> Result<Vec<u8>, ResourceError> {
        if info.format.is_depth_stencil() {
            return Err(ResourceError::BackendError(
                "depth-stencil textures cannot be read back".to_string(),
            ));
        }
        let unpadded = info.width * info.format.bytes_per_texel() as u32;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let device = &self.context.device;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vesta Readback Buffer"),
            size: padded as u64 * info.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Vesta Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(info.height),
                },
            },
            extent(info.width, info.height),
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.context.poll_device_blocking();
        receiver
            .recv()
            .map_err(|e| ResourceError::BackendError(format!("readback was dropped: {e}")))?
            .map_err(|e| ResourceError::BackendError(format!("WGPU map_async failed: {e:?}")))?;

        let mut pixels = Vec::with_capacity(info.data_size());
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    fn texture_entry(&self, id: TextureId) -> Result<&WgpuTextureEntry, ResourceError> {
        self.textures.get(id)
    }

    fn target_layout(&self, target: Option<RenderTargetId>) -> Result<TargetLayout, ResourceError> {
        let Some(target) = target else {
            return Ok(TargetLayout {
                color_formats: vec![BACKBUFFER_FORMAT],
                depth_format: Some(BACKBUFFER_DEPTH_FORMAT),
                bounds: Rect::from_size(self.backbuffer.width, self.backbuffer.height),
                attachments: Vec::new(),
            });
        };
        let attachments = self.targets.get(target)?.attachments.clone();
        let mut layout = TargetLayout {
            color_formats: Vec::new(),
            depth_format: None,
            bounds: Rect::default(),
            attachments,
        };
        for id in &layout.attachments {
            let info = self.texture_entry(*id)?.info;
            layout.bounds = info.bounds();
            if info.format.is_depth_stencil() {
                layout.depth_format = Some(info.format.into_wgpu());
            } else {
                layout.color_formats.push(info.format.into_wgpu());
            }
        }
        Ok(layout)
    }

    fn target_views(
        &self,
        target: Option<RenderTargetId>,
    ) -> Result<(Vec<&wgpu::TextureView>, Option<&wgpu::TextureView>), ResourceError> {
        let Some(target) = target else {
            return Ok((
                vec![&self.backbuffer.color_view],
                Some(&self.backbuffer.depth_view),
            ));
        };
        let mut colors = Vec::new();
        let mut depth = None;
        for id in &self.targets.get(target)?.attachments {
            let entry = self.texture_entry(*id)?;
            if entry.info.format.is_depth_stencil() {
                depth = Some(&entry.view);
            } else {
                colors.push(&entry.view);
            }
        }
        Ok((colors, depth))
    }

    /// Builds the bind groups of a shader from its current bindings.
    fn bind_groups(&self, shader: &WgpuShaderEntry) -> Result<Vec<wgpu::BindGroup>, ResourceError> {
        let reflection = shader.bindings.reflection();
        let mut groups = Vec::with_capacity(shader.group_layouts.len());
        for (group, layout) in shader.group_layouts.iter().enumerate() {
            let mut entries = Vec::new();
            for (i, binding) in reflection.bindings.iter().enumerate() {
                if binding.slot.group as usize != group {
                    continue;
                }
                let resource = match binding.kind {
                    BindingKind::UniformBuffer { .. } => match &shader.uniform_buffers[i] {
                        Some(buffer) => buffer.as_entire_binding(),
                        None => continue,
                    },
                    BindingKind::Texture => match shader.bindings.texture(i) {
                        Some(id) => {
                            let entry = self.texture_entry(id)?;
                            if entry.info.format.is_depth_stencil() {
                                return Err(ResourceError::BackendError(
                                    "depth-stencil textures cannot be sampled".to_string(),
                                ));
                            }
                            wgpu::BindingResource::TextureView(&entry.view)
                        }
                        None => wgpu::BindingResource::TextureView(&self.fallback_view),
                    },
                    BindingKind::Sampler => match self.samplers.get(&shader.bindings.sampler(i)) {
                        Some(sampler) => wgpu::BindingResource::Sampler(sampler),
                        None => continue,
                    },
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.slot.binding,
                    resource,
                });
            }
            groups.push(self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Vesta Shader Bind Group"),
                layout,
                entries: &entries,
            }));
        }
        Ok(groups)
    }

    /// Clears the whole target with load operations.
    fn clear_with_load_ops(&self, command: &ClearCommand) -> Result<(), ResourceError> {
        let (colors, depth) = self.target_views(command.target)?;
        let color_load = if command.mask.contains(ClearMask::COLOR) {
            wgpu::LoadOp::Clear(command.color.into_wgpu())
        } else {
            wgpu::LoadOp::Load
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = colors
            .into_iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();
        let depth_stencil_attachment = depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: if command.mask.contains(ClearMask::DEPTH) {
                    wgpu::LoadOp::Clear(command.depth.clamp(0.0, 1.0))
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: if command.mask.contains(ClearMask::STENCIL) {
                    wgpu::LoadOp::Clear(command.stencil as u32)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            }),
        });

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vesta Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vesta Clear Pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Clears a sub-rectangle by drawing the clear pipeline under a scissor.
    fn clear_with_pipeline(
        &mut self,
        command: &ClearCommand,
        layout: TargetLayout,
        clip: Rect,
    ) -> Result<(), ResourceError> {
        let key = ClearKey {
            color_formats: layout.color_formats,
            depth_format: layout.depth_format,
            mask: command.mask,
        };
        if !self.clear_pipelines.contains_key(&key) {
            let pipeline = create_clear_pipeline(&self.context.device, &key, &self.clear_layout);
            self.clear_pipelines.insert(key.clone(), pipeline);
        }
        let uniform = ClearUniform {
            color: command.color.to_f32_array(),
            depth: command.depth.clamp(0.0, 1.0),
            _padding: [0.0; 3],
        };
        self.context
            .queue
            .write_buffer(&self.clear_uniform, 0, bytemuck::bytes_of(&uniform));

        let pipeline = self
            .clear_pipelines
            .get(&key)
            .ok_or_else(|| ResourceError::BackendError("clear pipeline missing".to_string()))?;
        let (colors, depth) = self.target_views(command.target)?;
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vesta Clear Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vesta Clear Pass"),
                color_attachments: &load_color_attachments(&colors),
                depth_stencil_attachment: depth.map(load_depth_attachment),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.clear_bind_group, &[]);
            pass.set_scissor_rect(clip.x as u32, clip.y as u32, clip.w as u32, clip.h as u32);
            pass.set_stencil_reference(command.stencil as u32);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn execute_draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        let layout = self.target_layout(command.target)?;
        let clip = command.clip_rect(layout.bounds);
        let mut viewport = command.resolved_viewport(layout.bounds);
        if viewport.intersect(&layout.bounds) != viewport {
            log::debug!("WgpuDevice: viewport {viewport:?} clamped to the target bounds");
            viewport = viewport.intersect(&layout.bounds);
        }

        // --- Validation ---
        let mesh = self.meshes.get(command.mesh)?;
        let shader = self.shaders.get(command.shader)?;
        shader.bindings.check_feedback(&layout.attachments)?;
        check_vertex_inputs(&shader.program.vertex, mesh.vertex_format.as_ref())?;
        let end = command
            .index_start
            .checked_add(command.index_count)
            .ok_or(ResourceError::OutOfBounds)?;
        let indexed = mesh.index_buffer.is_some();
        if indexed {
            let range = mesh
                .indices
                .get(command.index_start as usize..end as usize)
                .ok_or(ResourceError::OutOfBounds)?;
            if mesh.vertex_format.is_some() && range.iter().any(|i| *i as usize >= mesh.vertex_count) {
                return Err(ResourceError::OutOfBounds.into());
            }
        } else if mesh.vertex_format.is_some() && end as usize > mesh.vertex_count {
            return Err(ResourceError::OutOfBounds.into());
        }
        if clip.is_empty() || viewport.is_empty() {
            return Ok(());
        }

        // --- Mutable preparation: uniforms, samplers, pipeline ---
        let key = PipelineKey {
            shader: command.shader,
            vertex_format: mesh.vertex_format.clone(),
            color_formats: layout.color_formats,
            depth_format: layout.depth_format,
            compare: command.compare,
            cull: command.cull,
            blend: command.blend,
        };
        let shader = self.shaders.get_mut(command.shader)?;
        for binding in shader.bindings.take_dirty() {
            if let Some(buffer) = &shader.uniform_buffers[binding] {
                self.context
                    .queue
                    .write_buffer(buffer, 0, shader.bindings.buffer(binding));
            }
        }
        for (i, binding) in shader.bindings.reflection().bindings.iter().enumerate() {
            if binding.kind == BindingKind::Sampler {
                let sampler = shader.bindings.sampler(i);
                self.samplers
                    .entry(sampler)
                    .or_insert_with(|| create_sampler(&self.context.device, sampler));
            }
        }
        if !self.pipelines.contains_key(&key) {
            let pipeline = create_draw_pipeline(
                &self.context.device,
                &DrawPipelineDesc {
                    key: &key,
                    layout: &shader.pipeline_layout,
                    vertex_module: &shader.vertex_module,
                    vertex_entry: shader.program.vertex.entry_name(),
                    fragment_module: &shader.fragment_module,
                    fragment_entry: shader.program.fragment.entry_name(),
                },
            );
            self.pipelines.insert(key.clone(), pipeline);
        }

        // --- Recording ---
        let shader = self.shaders.get(command.shader)?;
        let mesh = self.meshes.get(command.mesh)?;
        let bind_groups = self.bind_groups(shader)?;
        let pipeline = self
            .pipelines
            .get(&key)
            .ok_or_else(|| RenderError::Internal("render pipeline missing".to_string()))?;
        let (colors, depth) = self.target_views(command.target)?;

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vesta Draw Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vesta Draw Pass"),
                color_attachments: &load_color_attachments(&colors),
                depth_stencil_attachment: depth.map(load_depth_attachment),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            for (group, bind_group) in bind_groups.iter().enumerate() {
                pass.set_bind_group(group as u32, bind_group, &[]);
            }
            if let Some(buffer) = &mesh.vertex_buffer {
                pass.set_vertex_buffer(0, buffer.slice(..));
            }
            pass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.w as f32,
                viewport.h as f32,
                0.0,
                1.0,
            );
            pass.set_scissor_rect(clip.x as u32, clip.y as u32, clip.w as u32, clip.h as u32);
            pass.set_blend_constant(command.blend.constant.into_wgpu());

            let instances = 0..command.instances();
            match &mesh.index_buffer {
                Some(buffer) => {
                    pass.set_index_buffer(buffer.slice(..), mesh.index_format.into_wgpu());
                    pass.draw_indexed(command.index_start..end, 0, instances);
                }
                None => pass.draw(command.index_start..end, instances),
            }
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Copies the backbuffer to the window surface and presents it.
    fn present(&mut self) -> Result<(), RenderError> {
        let Some(present) = self.context.surface.as_ref() else {
            return Ok(());
        };
        let format = present.config.format;
        let frame = match present.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("WgpuDevice: Surface lost or outdated, reconfiguring");
                present.surface.configure(&self.context.device, &present.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::DeviceLost),
            Err(e) => {
                log::warn!("WgpuDevice: Skipping frame presentation: {e}");
                return Ok(());
            }
        };

        if self.blit_pipeline.as_ref().map(|(f, _)| *f) != Some(format) {
            let pipeline = create_blit_pipeline(&self.context.device, &self.blit_layout, format);
            self.blit_pipeline = Some((format, pipeline));
        }
        let Some((_, pipeline)) = self.blit_pipeline.as_ref() else {
            return Ok(());
        };
        let sampler = self
            .samplers
            .entry(TextureSampler::default())
            .or_insert_with(|| create_sampler(&self.context.device, TextureSampler::default()));
        let bind_group = self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Vesta Blit Bind Group"),
            layout: &self.blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.backbuffer.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vesta Present Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vesta Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Checks `info` against the descriptor rules and the device's 2D texture limit.
    fn check_texture(&self, info: &TextureInfo) -> Result<(), ResourceError> {
        info.validate()?;
        let max = self.context.device.limits().max_texture_dimension_2d;
        if info.width > max || info.height > max {
            return Err(ResourceError::AllocationFailed(format!(
                "{}x{} exceeds the device limit of {max} texels per side",
                info.width, info.height
            )));
        }
        Ok(())
    }

    fn create_texture_entry(&self, info: TextureInfo) -> WgpuTextureEntry {
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Vesta Texture"),
            size: extent(info.width, info.height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: info.format.into_wgpu(),
            usage: texture_usage(info.format),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        WgpuTextureEntry {
            texture,
            view,
            info,
            owner: None,
        }
    }

    fn write_texture_region(&self, entry: &WgpuTextureEntry, region: Rect, data: &[u8]) -> Result<(), ResourceError> {
        entry.info.validate_region(&region, data.len())?;
        if entry.info.format.is_depth_stencil() {
            return Err(ResourceError::BackendError(
                "depth-stencil textures cannot be uploaded to".to_string(),
            ));
        }
        let bpp = entry.info.format.bytes_per_texel() as u32;
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x as u32,
                    y: region.y as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.w as u32 * bpp),
                rows_per_image: Some(region.h as u32),
            },
            extent(region.w as u32, region.h as u32),
        );
        Ok(())
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn texture_usage(format: TextureFormat) -> wgpu::TextureUsages {
    if format.is_depth_stencil() {
        wgpu::TextureUsages::RENDER_ATTACHMENT
    } else {
        wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC
    }
}

fn create_backbuffer(device: &wgpu::Device, width: u32, height: u32) -> Backbuffer {
    let max = device.limits().max_texture_dimension_2d;
    let (width, height) = (width.clamp(1, max), height.clamp(1, max));
    let create = |label, format| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: texture_usage(if format == BACKBUFFER_DEPTH_FORMAT {
                TextureFormat::Depth24Stencil8
            } else {
                TextureFormat::Rgba8
            }),
            view_formats: &[],
        })
    };
    let color = create("Vesta Backbuffer", BACKBUFFER_FORMAT);
    let depth = create("Vesta Backbuffer Depth", BACKBUFFER_DEPTH_FORMAT);
    Backbuffer {
        width,
        height,
        color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
        depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        color,
    }
}

fn create_sampler(device: &wgpu::Device, sampler: TextureSampler) -> wgpu::Sampler {
    let filter = sampler.filter.into_wgpu();
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Vesta Sampler"),
        address_mode_u: sampler.wrap_x.into_wgpu(),
        address_mode_v: sampler.wrap_y.into_wgpu(),
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

fn load_color_attachments<'a>(
    views: &[&'a wgpu::TextureView],
) -> Vec<Option<wgpu::RenderPassColorAttachment<'a>>> {
    views
        .iter()
        .map(|view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        })
        .collect()
}

fn load_depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        }),
    }
}

impl RenderDevice for WgpuDevice {
    fn adapter_info(&self) -> RendererAdapterInfo {
        let info = self.context.adapter.get_info();
        RendererAdapterInfo {
            name: info.name,
            renderer: renderer_from_wgpu(info.backend),
            device_type: device_type_from_wgpu(info.device_type),
        }
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.frame_number += 1;
        self.stats.begin_frame(self.frame_number);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<RenderStats, RenderError> {
        self.present()?;
        Ok(self.stats)
    }

    fn last_frame_stats(&self) -> RenderStats {
        self.stats
    }

    fn resize_backbuffer(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("WgpuDevice: Ignoring backbuffer resize to {width}x{height}");
            return;
        }
        let max = self.context.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            log::error!(
                "WgpuDevice: Keeping the {}x{} backbuffer, {width}x{height} exceeds the device limit of {max}",
                self.backbuffer.width,
                self.backbuffer.height
            );
            return;
        }
        log::debug!("WgpuDevice: Resizing backbuffer to {width}x{height}");
        self.backbuffer = create_backbuffer(&self.context.device, width, height);
        self.context.resize(width, height);
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        (self.backbuffer.width, self.backbuffer.height)
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
        self.context.set_vsync(enabled);
    }

    fn shutdown(&mut self) {
        log::info!("WgpuDevice: Shutting down");
        self.context.poll_device_blocking();
        self.pipelines.clear();
        self.clear_pipelines.clear();
        self.samplers.clear();
        self.targets.drain().for_each(drop);
        self.textures.drain().for_each(|(_, entry)| entry.texture.destroy());
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
        self.check_texture(&info)
            .inspect_err(|e| log::error!("WgpuDevice: {e}"))?;
        log::debug!("WgpuDevice: Creating texture {width}x{height} {format:?}");
        let entry = self.create_texture_entry(info);
        Ok(self.textures.insert(entry))
    }

    fn texture_info(&self, texture: TextureId) -> Result<TextureInfo, ResourceError> {
        Ok(self.texture_entry(texture)?.info)
    }

    fn set_texture_data(&mut self, texture: TextureId, data: &[u8]) -> Result<(), ResourceError> {
        let entry = self.texture_entry(texture)?;
        self.write_texture_region(entry, entry.info.bounds(), data)
    }

    fn set_texture_sub_data(
        &mut self,
        texture: TextureId,
        region: Rect,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let entry = self.texture_entry(texture)?;
        self.write_texture_region(entry, region, data)
    }

    fn get_texture_data(&mut self, texture: TextureId, output: &mut [u8]) -> Result<(), ResourceError> {
        let entry = self.texture_entry(texture)?;
        if output.len() != entry.info.data_size() {
            return Err(ResourceError::DataSizeMismatch {
                expected: entry.info.data_size(),
                actual: output.len(),
            });
        }
        let pixels = self.read_texture(&entry.texture, entry.info)?;
        output.copy_from_slice(&pixels);
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), ResourceError> {
        if self.texture_entry(texture)?.owner.is_some() {
            return Err(ResourceError::AttachmentOwned);
        }
        let entry = self.textures.remove(texture)?;
        entry.texture.destroy();
        log::debug!("WgpuDevice: Destroyed texture {texture:?}");
        Ok(())
    }

    // --- Render targets ---

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureFormat],
    ) -> Result<RenderTargetId, ResourceError> {
        validate_attachments(attachments).inspect_err(|e| log::error!("WgpuDevice: {e}"))?;
        let infos: Vec<TextureInfo> = attachments
            .iter()
            .map(|format| TextureInfo {
                width,
                height,
                format: *format,
            })
            .collect();
        for info in &infos {
            self.check_texture(info)
                .inspect_err(|e| log::error!("WgpuDevice: {e}"))?;
        }

        let ids: Vec<TextureId> = infos
            .into_iter()
            .map(|info| {
                let entry = self.create_texture_entry(info);
                self.textures.insert(entry)
            })
            .collect();
        let target = self.targets.insert(WgpuRenderTargetEntry {
            attachments: ids.clone(),
        });
        for id in ids {
            if let Ok(entry) = self.textures.get_mut(id) {
                entry.owner = Some(target);
            }
        }
        log::debug!("WgpuDevice: Created render target {target:?} ({width}x{height})");
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
            if let Ok(entry) = self.textures.remove(id) {
                entry.texture.destroy();
            }
        }
        log::debug!("WgpuDevice: Destroyed render target {target:?}");
        Ok(())
    }

    // --- Shaders ---

    fn create_shader(&mut self, data: &ShaderData) -> Result<ShaderId, ResourceError> {
        let program = compile_program(data).inspect_err(|e| log::error!("WgpuDevice: {e}"))?;
        let device = &self.context.device;

        let module = |label, source: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.to_string().into()),
            })
        };
        let vertex_module = module("Vesta Vertex Shader", &data.vertex);
        let fragment_module = module("Vesta Fragment Shader", &data.fragment);

        let bindings = ShaderBindings::new(program.reflection.clone());
        let reflection = bindings.reflection();
        let group_count = reflection.max_group().map_or(0, |g| g as usize + 1);
        let group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = reflection
                    .bindings
                    .iter()
                    .filter(|b| b.slot.group as usize == group)
                    .map(|b| {
                        let mut visibility = wgpu::ShaderStages::empty();
                        if b.vertex {
                            visibility |= wgpu::ShaderStages::VERTEX;
                        }
                        if b.fragment {
                            visibility |= wgpu::ShaderStages::FRAGMENT;
                        }
                        let ty = match b.kind {
                            BindingKind::UniformBuffer { .. } => wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            BindingKind::Texture => wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            BindingKind::Sampler => {
                                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                            }
                        };
                        wgpu::BindGroupLayoutEntry {
                            binding: b.slot.binding,
                            visibility,
                            ty,
                            count: None,
                        }
                    })
                    .collect();
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Vesta Shader Bind Group Layout"),
                    entries: &entries,
                })
            })
            .collect();
        let layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Vesta Shader Pipeline Layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        let uniform_buffers = reflection
            .bindings
            .iter()
            .map(|b| match b.kind {
                BindingKind::UniformBuffer { size } => Some(device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Vesta Uniform Buffer"),
                    size: (size as u64).div_ceil(16).max(1) * 16,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })),
                _ => None,
            })
            .collect();

        let uniforms = bindings.uniforms().len();
        let id = self.shaders.insert(WgpuShaderEntry {
            program,
            bindings,
            vertex_module,
            fragment_module,
            uniform_buffers,
            group_layouts,
            pipeline_layout,
        });
        log::info!("WgpuDevice: Successfully created shader {id:?} with {uniforms} uniforms");
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
        Ok(self.shaders.get_mut(shader)?.bindings.set_uniform(index, values)?)
    }

    fn set_texture(
        &mut self,
        shader: ShaderId,
        index: usize,
        textures: &[Option<TextureId>],
    ) -> Result<(), ResourceError> {
        Ok(self.shaders.get_mut(shader)?.bindings.set_texture(index, textures)?)
    }

    fn set_sampler(
        &mut self,
        shader: ShaderId,
        index: usize,
        samplers: &[TextureSampler],
    ) -> Result<(), ResourceError> {
        Ok(self.shaders.get_mut(shader)?.bindings.set_sampler(index, samplers)?)
    }

    fn destroy_shader(&mut self, shader: ShaderId) -> Result<(), ResourceError> {
        self.shaders.remove(shader)?;
        self.pipelines.retain(|key, _| key.shader != shader);
        log::debug!("WgpuDevice: Destroyed shader {shader:?}");
        Ok(())
    }

    // --- Meshes ---

    fn create_mesh(&mut self) -> Result<MeshId, ResourceError> {
        Ok(self.meshes.insert(WgpuMeshEntry {
            vertex_format: None,
            vertex_buffer: None,
            vertex_count: 0,
            index_format: IndexFormat::Uint16,
            index_buffer: None,
            indices: Vec::new(),
        }))
    }

    fn set_vertex_format(&mut self, mesh: MeshId, format: &VertexFormat) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        mesh.vertex_format = Some(format.clone());
        mesh.vertex_buffer = None;
        mesh.vertex_count = 0;
        Ok(())
    }

    fn set_vertex_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError> {
        let entry = self.meshes.get_mut(mesh)?;
        let format = entry
            .vertex_format
            .as_ref()
            .ok_or(ResourceError::MissingVertexFormat)?;
        entry.vertex_count = format.vertex_count(data.len())?;
        entry.vertex_buffer = (!data.is_empty()).then(|| {
            self.context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Vesta Vertex Buffer"),
                    contents: data,
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        Ok(())
    }

    fn set_index_format(&mut self, mesh: MeshId, format: IndexFormat) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(mesh)?;
        mesh.index_format = format;
        mesh.index_buffer = None;
        mesh.indices.clear();
        Ok(())
    }

    fn set_index_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError> {
        let entry = self.meshes.get_mut(mesh)?;
        entry.index_format.index_count(data.len())?;
        entry.indices = entry.index_format.decode(data);
        entry.index_buffer = (!data.is_empty()).then(|| {
            self.context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Vesta Index Buffer"),
                    contents: data,
                    usage: wgpu::BufferUsages::INDEX,
                })
        });
        Ok(())
    }

    fn destroy_mesh(&mut self, mesh: MeshId) -> Result<(), ResourceError> {
        self.meshes.remove(mesh)?;
        Ok(())
    }

    // --- Commands ---

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        self.execute_draw(command)?;
        self.stats.record_draw(command.index_count, command.instances());
        Ok(())
    }

    fn clear(&mut self, command: &ClearCommand) -> Result<(), RenderError> {
        let layout = self.target_layout(command.target)?;
        let clip = command.clip_rect(layout.bounds);
        if !clip.is_empty() {
            if clip == layout.bounds {
                self.clear_with_load_ops(command)?;
            } else {
                self.clear_with_pipeline(command, layout, clip)?;
            }
        }
        self.stats.record_clear();
        Ok(())
    }
}
