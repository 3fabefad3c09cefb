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


//! Protocol checks on a real GPU. Each test returns early when no adapter exists.

use vesta_core::renderer::{
    ClearCommand, ClearMask, Color, DrawCommand, Rect, RenderDevice, Renderer, ResourceError,
    ShaderData, TextureFormat, UniformInfo, VertexElement, VertexFormat, VertexType,
};
use vesta_infra::WgpuDevice;

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

fn gpu_device(width: u32, height: u32) -> Option<WgpuDevice> {
    match WgpuDevice::new(Renderer::Default, None, (width, height)) {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

#[test]
fn clear_and_read_back() {
    let Some(mut device) = gpu_device(4, 4) else {
        return;
    };
    let target = device
        .create_render_target(4, 4, &[TextureFormat::Rgba8])
        .unwrap();
    let texture = device.render_target_attachment(target, 0).unwrap();

    device
        .clear(&ClearCommand::color(Color::RED).with_target(target))
        .unwrap();
    device
        .clear(
            &ClearCommand::color(Color::GREEN)
                .with_target(target)
                .with_clip(Rect::new(2, 2, 2, 2))
                .with_mask(ClearMask::COLOR),
        )
        .unwrap();

    let mut pixels = vec![0; 64];
    device.get_texture_data(texture, &mut pixels).unwrap();
    assert_eq!(&pixels[0..4], &Color::RED.to_bytes());
    let last = (3 * 4 + 3) * 4;
    assert_eq!(&pixels[last..last + 4], &Color::GREEN.to_bytes());
}

#[test]
fn triangle_covers_the_center_pixel() {
    let Some(mut device) = gpu_device(8, 8) else {
        return;
    };
    let format =
        VertexFormat::packed(vec![VertexElement::new(0, VertexType::Float2, false)]).unwrap();
    let vertices: Vec<u8> = [[-1.0f32, -1.0], [1.0, -1.0], [0.0, 1.0]]
        .iter()
        .flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes()))
        .collect();
    let mesh = device.create_mesh().unwrap();
    device.set_vertex_format(mesh, &format).unwrap();
    device.set_vertex_data(mesh, &vertices).unwrap();

    let shader = device.create_shader(&ShaderData::single(SOLID)).unwrap();
    let mut uniforms = vec![UniformInfo::default(); 1];
    assert_eq!(device.shader_uniforms(shader, &mut uniforms), Ok(1));
    assert_eq!(uniforms[0].name, "color");
    device.set_uniform(shader, 0, &[0.0, 0.0, 1.0, 1.0]).unwrap();

    device.begin_frame().unwrap();
    device.clear(&ClearCommand::all(Color::BLACK, 1.0, 0)).unwrap();
    device.draw(&DrawCommand::new(mesh, shader, 3)).unwrap();
    let stats = device.end_frame().unwrap();
    assert_eq!(stats.draw_calls, 1);

    let pixels = device.read_backbuffer().unwrap();
    let center = (4 * 8 + 4) * 4;
    assert_eq!(&pixels[center..center + 4], &[0, 0, 255, 255]);
    assert_eq!(&pixels[0..4], &[0, 0, 0, 255]);
}

#[test]
fn depth_textures_are_not_readable() {
    let Some(mut device) = gpu_device(4, 4) else {
        return;
    };
    let depth = device
        .create_texture(4, 4, TextureFormat::Depth24Stencil8)
        .unwrap();
    let mut output = vec![0; 64];
    assert!(matches!(
        device.get_texture_data(depth, &mut output),
        Err(ResourceError::BackendError(_))
    ));
}

#[test]
fn clearing_absent_planes_is_a_no_op() {
    let Some(mut device) = gpu_device(4, 4) else {
        return;
    };
    let target = device
        .create_render_target(4, 4, &[TextureFormat::Rgba8])
        .unwrap();
    let texture = device.render_target_attachment(target, 0).unwrap();
    device
        .clear(&ClearCommand::color(Color::RED).with_target(target))
        .unwrap();

    let depth_and_stencil = ClearCommand::all(Color::BLUE, 0.5, 7)
        .with_target(target)
        .with_mask(ClearMask::DEPTH | ClearMask::STENCIL);
    assert_eq!(device.clear(&depth_and_stencil), Ok(()));
    // A clipped clear takes the pipeline path, built without a depth format.
    assert_eq!(
        device.clear(&depth_and_stencil.with_clip(Rect::new(1, 1, 2, 2))),
        Ok(())
    );

    let mut pixels = vec![0; 64];
    device.get_texture_data(texture, &mut pixels).unwrap();
    for texel in pixels.chunks_exact(4) {
        assert_eq!(texel, Color::RED.to_bytes());
    }
}

#[test]
fn textures_beyond_the_device_limit_fail_to_allocate() {
    let Some(mut device) = gpu_device(4, 4) else {
        return;
    };
    assert!(matches!(
        device.create_texture(u32::MAX, 1, TextureFormat::Rgba8),
        Err(ResourceError::AllocationFailed(_))
    ));
    assert!(matches!(
        device.create_render_target(1, u32::MAX, &[TextureFormat::Rgba8]),
        Err(ResourceError::AllocationFailed(_))
    ));
}
