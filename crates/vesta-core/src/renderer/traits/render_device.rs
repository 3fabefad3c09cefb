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

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use std::fmt::Debug;

/// The backend side of the rendering protocol.
///
/// A render device owns every resource it hands out a handle for. Commands are
/// executed synchronously: when `draw` or `clear` returns, the operation is
/// complete and later commands observe its results.
pub trait RenderDevice: Debug {
    /// Describes the adapter executing commands.
    fn adapter_info(&self) -> RendererAdapterInfo;

    // --- Frame lifecycle ---

    /// Prepares the backbuffer for a new frame and resets the frame statistics.
    /// ## Errors
    /// * `RenderError::SurfaceAcquisitionFailed` - If the presentable surface cannot be acquired.
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Presents the backbuffer.
    /// ## Returns
    /// The statistics accumulated since `begin_frame`.
    fn end_frame(&mut self) -> Result<RenderStats, RenderError>;

    /// Statistics of the last completed (or current) frame.
    fn last_frame_stats(&self) -> RenderStats;

    /// Resizes the backbuffer, in pixels.
    fn resize_backbuffer(&mut self, width: u32, height: u32);

    /// The backbuffer size, in pixels.
    fn backbuffer_size(&self) -> (u32, u32);

    /// Enables or disables waiting for vertical sync on present.
    fn set_vsync(&mut self, enabled: bool);

    /// Releases every resource still alive. Handles are invalid afterwards.
    fn shutdown(&mut self);

    // --- Textures ---

    /// Creates a texture with undefined contents.
    /// ## Arguments
    /// * `width`, `height` - Dimensions in texels; both must be non-zero.
    /// * `format` - The storage format, fixed for the texture's lifetime.
    /// ## Errors
    /// * `ResourceError::InvalidDescriptor` - If a dimension is zero.
    /// * `ResourceError::AllocationFailed` - If the backend cannot allocate the storage.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<TextureId, ResourceError>;

    /// Dimensions and format of a texture.
    fn texture_info(&self, texture: TextureId) -> Result<TextureInfo, ResourceError>;

    /// Replaces the whole image of a texture.
    /// ## Arguments
    /// * `data` - Tightly packed rows, top row first; must be exactly the texture's size.
    fn set_texture_data(&mut self, texture: TextureId, data: &[u8]) -> Result<(), ResourceError>;

    /// Replaces a rectangular region of a texture.
    /// ## Arguments
    /// * `region` - Must lie inside the texture.
    /// * `data` - Tightly packed rows of the region.
    fn set_texture_sub_data(
        &mut self,
        texture: TextureId,
        region: Rect,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Reads the whole image of a texture back into `output`.
    /// ## Errors
    /// * `ResourceError::DataSizeMismatch` - If `output` is not exactly the texture's size.
    fn get_texture_data(&mut self, texture: TextureId, output: &mut [u8]) -> Result<(), ResourceError>;

    /// Destroys a texture created with `create_texture`.
    /// ## Errors
    /// * `ResourceError::AttachmentOwned` - If the texture belongs to a render target.
    /// * `ResourceError::InvalidHandle` - If the texture was already destroyed.
    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), ResourceError>;

    // --- Render targets ---

    /// Creates a render target with one attachment per format, all `width` x `height`.
    /// At most one attachment may be a depth-stencil format.
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        attachments: &[TextureFormat],
    ) -> Result<RenderTargetId, ResourceError>;

    /// The texture behind attachment `index` of a render target.
    /// The texture stays owned by the target.
    fn render_target_attachment(
        &self,
        target: RenderTargetId,
        index: usize,
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a render target and all its attachments.
    fn destroy_render_target(&mut self, target: RenderTargetId) -> Result<(), ResourceError>;

    // --- Shaders ---

    /// Compiles a shader program.
    /// ## Errors
    /// * `ResourceError::Shader(ShaderError::CompilationError)` - With the compiler's diagnostic.
    fn create_shader(&mut self, data: &ShaderData) -> Result<ShaderId, ResourceError>;

    /// Writes up to `output.len()` uniform descriptions and returns the total count.
    fn shader_uniforms(
        &self,
        shader: ShaderId,
        output: &mut [UniformInfo],
    ) -> Result<usize, ResourceError>;

    /// Assigns float values to the uniform at `index`. Matrices are column-major.
    fn set_uniform(&mut self, shader: ShaderId, index: usize, values: &[f32])
        -> Result<(), ResourceError>;

    /// Binds textures to a `Texture2D` uniform; one entry per array element.
    /// `None` unbinds the slot.
    fn set_texture(
        &mut self,
        shader: ShaderId,
        index: usize,
        textures: &[Option<TextureId>],
    ) -> Result<(), ResourceError>;

    /// Configures a `Sampler2D` uniform; one entry per array element.
    fn set_sampler(
        &mut self,
        shader: ShaderId,
        index: usize,
        samplers: &[TextureSampler],
    ) -> Result<(), ResourceError>;

    fn destroy_shader(&mut self, shader: ShaderId) -> Result<(), ResourceError>;

    // --- Meshes ---

    /// Creates an empty mesh.
    fn create_mesh(&mut self) -> Result<MeshId, ResourceError>;

    /// Sets the layout of the mesh's vertices, discarding any existing vertex data.
    fn set_vertex_format(&mut self, mesh: MeshId, format: &VertexFormat)
        -> Result<(), ResourceError>;

    /// Replaces the mesh's vertex data.
    /// ## Errors
    /// * `ResourceError::MissingVertexFormat` - If no vertex format was set.
    /// * `ResourceError::DataSizeMismatch` - If the length is not a multiple of the stride.
    fn set_vertex_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError>;

    /// Sets the width of the mesh's indices, discarding any existing index data.
    fn set_index_format(&mut self, mesh: MeshId, format: IndexFormat) -> Result<(), ResourceError>;

    /// Replaces the mesh's index data. An empty slice removes the index buffer.
    fn set_index_data(&mut self, mesh: MeshId, data: &[u8]) -> Result<(), ResourceError>;

    fn destroy_mesh(&mut self, mesh: MeshId) -> Result<(), ResourceError>;

    // --- Commands ---

    /// Executes a draw command to completion.
    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError>;

    /// Executes a clear command to completion.
    fn clear(&mut self, command: &ClearCommand) -> Result<(), RenderError>;
}
