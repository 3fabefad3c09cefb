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


//! Draw and clear protocol scenarios against the CPU render device.

use vesta_core::renderer::{
    BlendMode, ClearCommand, ClearMask, Color, DepthCompare, DrawCommand, IndexFormat, MeshId,
    Rect, RenderDevice, RenderError, RenderTargetId, ResourceError, ShaderData, ShaderError,
    ShaderId, TextureFormat, TextureSampler, UniformInfo, VertexElement, VertexFormat, VertexType,
};
use vesta_infra::SoftwareDevice;

const SOLID: &str = r#"
    struct Globals {
        color: vec4<f32>,
    }
    @group(0) @binding(0) var<uniform> globals: Globals;

    @vertex
    fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
        return vec4<f32>(pos, 0.0, 1.0);
    }

    @fragment
    fn fs_main() -> @location(0) vec4<f32> {
        return globals.color;
    }
"#;

const TEXTURED: &str = r#"
    @group(0) @binding(0) var u_texture: texture_2d<f32>;
    @group(0) @binding(1) var u_sampler: sampler;

    struct VsOut {
        @builtin(position) position: vec4<f32>,
        @location(0) uv: vec2<f32>,
    }

    @vertex
    fn vs_main(@location(0) pos: vec2<f32>) -> VsOut {
        var out: VsOut;
        out.position = vec4<f32>(pos, 0.0, 1.0);
        out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
        return out;
    }

    @fragment
    fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
        return textureSample(u_texture, u_sampler, in.uv);
    }
"#;

/// Covers the whole target with a single triangle.
const FULLSCREEN: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

fn float2_format() -> VertexFormat {
    VertexFormat::packed(vec![VertexElement::new(0, VertexType::Float2, false)]).unwrap()
}

fn vertex_bytes(positions: &[[f32; 2]]) -> Vec<u8> {
    positions
        .iter()
        .flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes()))
        .collect()
}

fn mesh_with(device: &mut SoftwareDevice, positions: &[[f32; 2]]) -> MeshId {
    let mesh = device.create_mesh().unwrap();
    device.set_vertex_format(mesh, &float2_format()).unwrap();
    device.set_vertex_data(mesh, &vertex_bytes(positions)).unwrap();
    mesh
}

fn solid_shader(device: &mut SoftwareDevice, color: [f32; 4]) -> ShaderId {
    let shader = device.create_shader(&ShaderData::single(SOLID)).unwrap();
    device.set_uniform(shader, 0, &color).unwrap();
    shader
}

fn color_target(device: &mut SoftwareDevice, width: u32, height: u32) -> RenderTargetId {
    device
        .create_render_target(width, height, &[TextureFormat::Rgba8])
        .unwrap()
}

fn read_target(device: &mut SoftwareDevice, target: RenderTargetId) -> Vec<u8> {
    let texture = device.render_target_attachment(target, 0).unwrap();
    let info = device.texture_info(texture).unwrap();
    let mut pixels = vec![0; info.data_size()];
    device.get_texture_data(texture, &mut pixels).unwrap();
    pixels
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let at = ((y * width + x) * 4) as usize;
    [pixels[at], pixels[at + 1], pixels[at + 2], pixels[at + 3]]
}

fn lit_pixels(pixels: &[u8]) -> usize {
    pixels.chunks_exact(4).filter(|p| p[..3] != [0, 0, 0]).count()
}

#[test]
fn render_target_clears_to_red() {
    let mut device = SoftwareDevice::new(8, 8);
    let target = color_target(&mut device, 4, 4);

    device
        .clear(
            &ClearCommand::color(Color::RED)
                .with_target(target)
                .with_mask(ClearMask::COLOR),
        )
        .unwrap();

    let pixels = read_target(&mut device, target);
    assert_eq!(pixels.len(), 4 * 4 * 4);
    for texel in pixels.chunks_exact(4) {
        assert_eq!(texel, Color::RED.to_bytes());
    }
}

#[test]
fn triangle_covers_the_center_pixel() {
    let mut device = SoftwareDevice::new(8, 8);
    let mesh = mesh_with(&mut device, &[[-1.0, -1.0], [1.0, -1.0], [0.0, 1.0]]);
    let shader = solid_shader(&mut device, [0.0, 1.0, 0.0, 1.0]);

    device.clear(&ClearCommand::color(Color::BLACK)).unwrap();
    device.draw(&DrawCommand::new(mesh, shader, 3).with_instances(1)).unwrap();

    let pixels = device.backbuffer_pixels();
    assert_eq!(pixel(pixels, 8, 4, 4), [0, 255, 0, 255]);
    // The apex is narrow: the top corners stay clear.
    assert_eq!(pixel(pixels, 8, 0, 0), [0, 0, 0, 255]);
    assert_eq!(pixel(pixels, 8, 7, 0), [0, 0, 0, 255]);
}

#[test]
fn color_only_clear_leaves_depth_alone() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = device
        .create_render_target(4, 4, &[TextureFormat::Rgba8, TextureFormat::Depth24Stencil8])
        .unwrap();
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let shader = solid_shader(&mut device, [1.0, 1.0, 1.0, 1.0]);
    let draw = DrawCommand::new(mesh, shader, 3)
        .with_target(target)
        .with_depth(DepthCompare::Less);

    // Depth 0 rejects every fragment at z = 0 under `Less`.
    device
        .clear(&ClearCommand::all(Color::BLACK, 0.0, 0).with_target(target))
        .unwrap();
    device
        .clear(
            &ClearCommand::all(Color::BLACK, 1.0, 0)
                .with_target(target)
                .with_mask(ClearMask::COLOR),
        )
        .unwrap();
    device.draw(&draw).unwrap();
    assert_eq!(lit_pixels(&read_target(&mut device, target)), 0);

    device
        .clear(
            &ClearCommand::all(Color::BLACK, 1.0, 0)
                .with_target(target)
                .with_mask(ClearMask::DEPTH),
        )
        .unwrap();
    device.draw(&draw).unwrap();
    assert_eq!(lit_pixels(&read_target(&mut device, target)), 16);
}

#[test]
fn missing_viewport_means_the_full_target() {
    let mut device = SoftwareDevice::new(4, 4);
    let mesh = mesh_with(&mut device, &[[-1.0, -1.0], [0.5, -1.0], [-1.0, 0.5]]);
    let shader = solid_shader(&mut device, [1.0, 0.0, 1.0, 1.0]);
    let implicit = color_target(&mut device, 6, 6);
    let explicit = color_target(&mut device, 6, 6);

    device
        .draw(&DrawCommand::new(mesh, shader, 3).with_target(implicit))
        .unwrap();
    device
        .draw(
            &DrawCommand::new(mesh, shader, 3)
                .with_target(explicit)
                .with_viewport(Rect::new(0, 0, 6, 6)),
        )
        .unwrap();

    let implicit = read_target(&mut device, implicit);
    assert!(lit_pixels(&implicit) > 0);
    assert_eq!(implicit, read_target(&mut device, explicit));
}

#[test]
fn scissor_limits_the_written_pixels() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = color_target(&mut device, 4, 4);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let shader = solid_shader(&mut device, [1.0, 1.0, 0.0, 1.0]);

    device
        .draw(
            &DrawCommand::new(mesh, shader, 3)
                .with_target(target)
                .with_scissor(Rect::new(1, 1, 2, 2)),
        )
        .unwrap();

    let pixels = read_target(&mut device, target);
    assert_eq!(lit_pixels(&pixels), 4);
    assert_eq!(pixel(&pixels, 4, 1, 1), [255, 255, 0, 255]);
    assert_eq!(pixel(&pixels, 4, 0, 0), [0, 0, 0, 0]);
}

#[test]
fn instances_accumulate_with_additive_blending() {
    let mut device = SoftwareDevice::new(2, 2);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let shader = solid_shader(&mut device, [0.25, 0.0, 0.0, 1.0]);

    let red_after = |device: &mut SoftwareDevice, instances: u32| {
        let target = color_target(device, 2, 2);
        device
            .draw(
                &DrawCommand::new(mesh, shader, 3)
                    .with_target(target)
                    .with_instances(instances)
                    .with_blend(BlendMode::ADD),
            )
            .unwrap();
        pixel(&read_target(device, target), 2, 0, 0)[0]
    };

    device.begin_frame().unwrap();
    let none = red_after(&mut device, 0);
    let one = red_after(&mut device, 1);
    let three = red_after(&mut device, 3);
    let stats = device.end_frame().unwrap();

    assert_eq!(none, one);
    assert!(one.abs_diff(64) <= 1, "one instance gave {one}");
    assert!(three.abs_diff(192) <= 1, "three instances gave {three}");
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.instances_submitted, 1 + 1 + 3);
    assert_eq!(stats.vertices_submitted, 3 * 5);
    assert_eq!(stats.triangles_rendered, 5);
}

#[test]
fn indexed_quad_fills_the_target() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = color_target(&mut device, 4, 4);
    let mesh = mesh_with(
        &mut device,
        &[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]],
    );
    let indices: Vec<u8> = [0u16, 1, 2, 0, 2, 3]
        .iter()
        .flat_map(|i| i.to_le_bytes())
        .collect();
    device.set_index_format(mesh, IndexFormat::Uint16).unwrap();
    device.set_index_data(mesh, &indices).unwrap();
    let shader = solid_shader(&mut device, [0.0, 0.0, 1.0, 1.0]);

    device
        .draw(&DrawCommand::new(mesh, shader, 6).with_target(target))
        .unwrap();
    assert_eq!(lit_pixels(&read_target(&mut device, target)), 16);

    // Only the first triangle: half the pixels, split along the diagonal.
    let half = color_target(&mut device, 4, 4);
    device
        .draw(&DrawCommand::new(mesh, shader, 3).with_target(half))
        .unwrap();
    let lit = lit_pixels(&read_target(&mut device, half));
    assert!(lit > 0 && lit < 16);

    let past_end = DrawCommand::new(mesh, shader, 6).with_range(3, 6).with_target(target);
    assert_eq!(
        device.draw(&past_end),
        Err(RenderError::ResourceError(ResourceError::OutOfBounds))
    );
}

#[test]
fn index_referencing_a_missing_vertex_is_rejected() {
    let mut device = SoftwareDevice::new(4, 4);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let indices: Vec<u8> = [0u32, 1, 7].iter().flat_map(|i| i.to_le_bytes()).collect();
    device.set_index_format(mesh, IndexFormat::Uint32).unwrap();
    device.set_index_data(mesh, &indices).unwrap();
    let shader = solid_shader(&mut device, [1.0; 4]);

    assert_eq!(
        device.draw(&DrawCommand::new(mesh, shader, 3)),
        Err(RenderError::ResourceError(ResourceError::OutOfBounds))
    );
}

#[test]
fn vertex_data_must_be_whole_vertices() {
    let mut device = SoftwareDevice::new(4, 4);
    let mesh = device.create_mesh().unwrap();

    assert_eq!(
        device.set_vertex_data(mesh, &[0; 8]),
        Err(ResourceError::MissingVertexFormat)
    );
    device.set_vertex_format(mesh, &float2_format()).unwrap();
    assert_eq!(
        device.set_vertex_data(mesh, &[0; 20]),
        Err(ResourceError::DataSizeMismatch {
            expected: 24,
            actual: 20
        })
    );
    assert_eq!(device.set_vertex_data(mesh, &[0; 24]), Ok(()));
}

#[test]
fn destroyed_handles_are_invalid() {
    let mut device = SoftwareDevice::new(4, 4);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let shader = solid_shader(&mut device, [1.0; 4]);
    let texture = device.create_texture(2, 2, TextureFormat::Rgba8).unwrap();

    device.destroy_texture(texture).unwrap();
    assert_eq!(device.destroy_texture(texture), Err(ResourceError::InvalidHandle));
    assert_eq!(device.texture_info(texture), Err(ResourceError::InvalidHandle));

    device.destroy_mesh(mesh).unwrap();
    assert_eq!(
        device.draw(&DrawCommand::new(mesh, shader, 3)),
        Err(RenderError::ResourceError(ResourceError::InvalidHandle))
    );

    device.destroy_shader(shader).unwrap();
    assert_eq!(device.destroy_shader(shader), Err(ResourceError::InvalidHandle));
}

#[test]
fn attachments_belong_to_their_target() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = device
        .create_render_target(4, 4, &[TextureFormat::Rgba8, TextureFormat::Depth24Stencil8])
        .unwrap();
    let color = device.render_target_attachment(target, 0).unwrap();
    let depth = device.render_target_attachment(target, 1).unwrap();
    assert_eq!(
        device.render_target_attachment(target, 2),
        Err(ResourceError::OutOfBounds)
    );
    assert_eq!(device.texture_info(depth).unwrap().format, TextureFormat::Depth24Stencil8);

    assert_eq!(device.destroy_texture(color), Err(ResourceError::AttachmentOwned));
    device.destroy_render_target(target).unwrap();
    assert_eq!(device.texture_info(color), Err(ResourceError::InvalidHandle));
    assert_eq!(
        device.destroy_render_target(target),
        Err(ResourceError::InvalidHandle)
    );
}

#[test]
fn partial_upload_keeps_surrounding_texels() {
    let mut device = SoftwareDevice::new(4, 4);
    let texture = device.create_texture(4, 4, TextureFormat::Rgba8).unwrap();
    device.set_texture_data(texture, &[10; 64]).unwrap();
    device
        .set_texture_sub_data(texture, Rect::new(1, 1, 2, 2), &[200; 16])
        .unwrap();

    let mut pixels = vec![0; 64];
    device.get_texture_data(texture, &mut pixels).unwrap();
    assert_eq!(pixel(&pixels, 4, 0, 0), [10; 4]);
    assert_eq!(pixel(&pixels, 4, 1, 1), [200; 4]);
    assert_eq!(pixel(&pixels, 4, 2, 2), [200; 4]);
    assert_eq!(pixel(&pixels, 4, 3, 3), [10; 4]);

    assert_eq!(
        device.set_texture_sub_data(texture, Rect::new(3, 3, 2, 2), &[0; 16]),
        Err(ResourceError::OutOfBounds)
    );
    assert!(matches!(
        device.set_texture_data(texture, &[0; 10]),
        Err(ResourceError::DataSizeMismatch { .. })
    ));
}

fn uniform_index(device: &SoftwareDevice, shader: ShaderId, name: &str) -> usize {
    let mut uniforms = vec![UniformInfo::default(); 8];
    let count = device.shader_uniforms(shader, &mut uniforms).unwrap();
    uniforms[..count]
        .iter()
        .find(|u| u.name == name)
        .map(|u| u.index)
        .unwrap()
}

#[test]
fn textures_are_sampled_per_pixel() {
    let mut device = SoftwareDevice::new(2, 2);
    let texture = device.create_texture(2, 2, TextureFormat::Rgba8).unwrap();
    let texels: Vec<u8> = [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE]
        .iter()
        .flat_map(|c| c.to_bytes())
        .collect();
    device.set_texture_data(texture, &texels).unwrap();

    let shader = device.create_shader(&ShaderData::single(TEXTURED)).unwrap();
    let texture_slot = uniform_index(&device, shader, "u_texture");
    let sampler_slot = uniform_index(&device, shader, "u_sampler");
    device.set_texture(shader, texture_slot, &[Some(texture)]).unwrap();
    device
        .set_sampler(shader, sampler_slot, &[TextureSampler::default()])
        .unwrap();

    let target = color_target(&mut device, 2, 2);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    device
        .draw(&DrawCommand::new(mesh, shader, 3).with_target(target))
        .unwrap();

    assert_eq!(read_target(&mut device, target), texels);
}

#[test]
fn sampling_the_target_being_drawn_is_rejected() {
    let mut device = SoftwareDevice::new(2, 2);
    let target = color_target(&mut device, 2, 2);
    let attachment = device.render_target_attachment(target, 0).unwrap();
    let shader = device.create_shader(&ShaderData::single(TEXTURED)).unwrap();
    let texture_slot = uniform_index(&device, shader, "u_texture");
    device.set_texture(shader, texture_slot, &[Some(attachment)]).unwrap();
    let mesh = mesh_with(&mut device, &FULLSCREEN);

    let result = device.draw(&DrawCommand::new(mesh, shader, 3).with_target(target));
    assert!(matches!(
        result,
        Err(RenderError::ResourceError(ResourceError::InvalidDescriptor(_)))
    ));
    // Drawing the same texture into the backbuffer is fine.
    assert_eq!(device.draw(&DrawCommand::new(mesh, shader, 3)), Ok(()));
}

#[test]
fn uniform_query_truncates_but_reports_the_total() {
    let source = r#"
        struct Globals {
            matrix: mat4x4<f32>,
            tint: vec4<f32>,
        }
        @group(0) @binding(0) var<uniform> globals: Globals;
        @group(0) @binding(1) var u_texture: texture_2d<f32>;
        @group(0) @binding(2) var u_sampler: sampler;

        @vertex
        fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
            return globals.matrix * vec4<f32>(pos, 0.0, 1.0);
        }

        @fragment
        fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
            return textureSample(u_texture, u_sampler, frag.xy) * globals.tint;
        }
    "#;
    let mut device = SoftwareDevice::new(2, 2);
    let shader = device.create_shader(&ShaderData::single(source)).unwrap();

    let mut short = vec![UniformInfo::default(); 2];
    assert_eq!(device.shader_uniforms(shader, &mut short), Ok(4));
    assert_eq!(short[0].name, "matrix");
    assert_eq!(short[1].name, "tint");
    assert_eq!(short[1].index, 1);

    assert_eq!(
        device.set_uniform(shader, 1, &[1.0, 2.0]),
        Err(ResourceError::Shader(ShaderError::UniformValueMismatch {
            name: "tint".to_string(),
            expected: 4,
            actual: 2
        }))
    );
    assert_eq!(
        device.set_uniform(shader, 9, &[1.0]),
        Err(ResourceError::Shader(ShaderError::UniformNotFound { index: 9 }))
    );
}

#[test]
fn broken_source_fails_to_compile() {
    let mut device = SoftwareDevice::new(2, 2);
    let err = device
        .create_shader(&ShaderData::single("@vertex fn vs_main( -> {"))
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Shader(ShaderError::CompilationError { .. })
    ));
}

#[test]
fn clearing_absent_planes_is_a_no_op() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = color_target(&mut device, 4, 4);
    device
        .clear(&ClearCommand::color(Color::RED).with_target(target))
        .unwrap();

    let depth_and_stencil = ClearCommand::all(Color::BLUE, 0.5, 7)
        .with_target(target)
        .with_mask(ClearMask::DEPTH | ClearMask::STENCIL);
    assert_eq!(device.clear(&depth_and_stencil), Ok(()));
    assert_eq!(
        device.clear(&depth_and_stencil.with_clip(Rect::new(1, 1, 2, 2))),
        Ok(())
    );
    for texel in read_target(&mut device, target).chunks_exact(4) {
        assert_eq!(texel, Color::RED.to_bytes());
    }

    let depth_only = device
        .create_render_target(4, 4, &[TextureFormat::Depth24Stencil8])
        .unwrap();
    assert_eq!(
        device.clear(&ClearCommand::color(Color::GREEN).with_target(depth_only)),
        Ok(())
    );
}

#[test]
fn unaddressable_textures_fail_to_allocate() {
    let mut device = SoftwareDevice::new(4, 4);
    assert!(matches!(
        device.create_texture(u32::MAX, u32::MAX, TextureFormat::Rgba8),
        Err(ResourceError::AllocationFailed(_))
    ));
    assert!(matches!(
        device.create_texture(1 << 20, 1 << 20, TextureFormat::R8),
        Err(ResourceError::AllocationFailed(_))
    ));
    assert!(matches!(
        device.create_render_target(u32::MAX, 2, &[TextureFormat::Rgba8]),
        Err(ResourceError::AllocationFailed(_))
    ));

    // Nothing half-created is left behind.
    let texture = device.create_texture(2, 2, TextureFormat::Rgba8).unwrap();
    assert_eq!(device.texture_info(texture).unwrap().width, 2);
}

#[test]
fn unbounded_scissor_clips_at_the_target_edge() {
    let mut device = SoftwareDevice::new(4, 4);
    let target = color_target(&mut device, 4, 4);
    let mesh = mesh_with(&mut device, &FULLSCREEN);
    let shader = solid_shader(&mut device, [1.0, 1.0, 1.0, 1.0]);

    device
        .draw(
            &DrawCommand::new(mesh, shader, 3)
                .with_target(target)
                .with_scissor(Rect::new(1, 1, i32::MAX, i32::MAX)),
        )
        .unwrap();
    device
        .clear(
            &ClearCommand::color(Color::RED)
                .with_target(target)
                .with_clip(Rect::new(3, 3, i32::MAX, i32::MAX)),
        )
        .unwrap();

    let pixels = read_target(&mut device, target);
    assert_eq!(lit_pixels(&pixels), 9);
    assert_eq!(pixel(&pixels, 4, 0, 0), [0, 0, 0, 0]);
    assert_eq!(pixel(&pixels, 4, 1, 1), [255, 255, 255, 255]);
    assert_eq!(pixel(&pixels, 4, 3, 3), Color::RED.to_bytes());
}
