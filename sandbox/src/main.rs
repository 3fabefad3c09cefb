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


//! Opens a window and spins a colored triangle.
//!
//! `sandbox --screenshot out.png` renders one frame headless with the
//! software renderer and writes it as PNG instead.

use anyhow::{Context, Result};
use std::time::Instant;
use vesta_core::renderer::{
    ClearCommand, Color, DrawCommand, MeshId, RenderDevice, Renderer, ShaderData, ShaderId,
    TextureFormat, VertexElement, VertexFormat, VertexType,
};
use vesta_core::{PlatformEvent, Session, StartupDescriptor};
use vesta_infra::platform::image;

const TRIANGLE_SHADER: &str = r#"
    struct Globals {
        angle: f32,
    }
    @group(0) @binding(0) var<uniform> globals: Globals;

    struct VsOut {
        @builtin(position) position: vec4<f32>,
        @location(0) color: vec4<f32>,
    }

    @vertex
    fn vs_main(@location(0) pos: vec2<f32>, @location(1) color: vec4<f32>) -> VsOut {
        let c = cos(globals.angle);
        let s = sin(globals.angle);
        var out: VsOut;
        out.position = vec4<f32>(pos.x * c - pos.y * s, pos.x * s + pos.y * c, 0.0, 1.0);
        out.color = color;
        return out;
    }

    @fragment
    fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
        return in.color;
    }
"#;

struct Triangle {
    mesh: MeshId,
    shader: ShaderId,
}

impl Triangle {
    fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let format = VertexFormat::packed(vec![
            VertexElement::new(0, VertexType::Float2, false),
            VertexElement::new(1, VertexType::UByte4, true),
        ])?;
        let vertices: [([f32; 2], Color); 3] = [
            ([0.0, 0.7], Color::RED),
            ([-0.6, -0.5], Color::GREEN),
            ([0.6, -0.5], Color::BLUE),
        ];
        let mut data = Vec::new();
        for (position, color) in vertices {
            data.extend(position.iter().flat_map(|c| c.to_le_bytes()));
            data.extend(color.to_bytes());
        }

        let mesh = device.create_mesh()?;
        device.set_vertex_format(mesh, &format)?;
        device.set_vertex_data(mesh, &data)?;
        let shader = device
            .create_shader(&ShaderData::single(TRIANGLE_SHADER))
            .context("Failed to compile the triangle shader")?;
        Ok(Self { mesh, shader })
    }

    fn draw(&self, session: &mut Session, angle: f32) -> Result<()> {
        session.device().set_uniform(self.shader, 0, &[angle])?;
        session.clear(&ClearCommand::all(Color::rgba(20, 20, 28, 255), 1.0, 0))?;
        session.draw(&DrawCommand::new(self.mesh, self.shader, 3))?;
        Ok(())
    }
}

fn run_window(descriptor: StartupDescriptor) -> Result<()> {
    let mut session = vesta_infra::startup(descriptor)?;
    let triangle = Triangle::new(session.device())?;
    let started = Instant::now();

    while session.is_running() {
        session.begin_frame()?;
        triangle.draw(&mut session, started.elapsed().as_secs_f32())?;
        session.poll_events(|event| match event {
            PlatformEvent::Key { key_code, pressed } => log::debug!("Key {key_code} pressed={pressed}"),
            PlatformEvent::ControllerConnected(info) => {
                log::info!("Controller connected: {} ({:?})", info.name, info.gamepad_kind());
            }
            _ => {}
        });
        let stats = session.end_frame()?;
        if stats.frame_number % 600 == 0 {
            log::info!("Frame {}: {} draws", stats.frame_number, stats.draw_calls);
        }
    }

    session.shutdown();
    Ok(())
}

fn screenshot(descriptor: StartupDescriptor, path: &str) -> Result<()> {
    let (width, height) = (descriptor.width, descriptor.height);
    let (mut session, _injector) = vesta_infra::startup_headless(StartupDescriptor {
        renderer: Renderer::Software,
        ..descriptor
    })?;
    let triangle = Triangle::new(session.device())?;

    let target = session
        .device()
        .create_render_target(width, height, &[TextureFormat::Rgba8])?;
    session.begin_frame()?;
    session.device().set_uniform(triangle.shader, 0, &[0.0])?;
    session.clear(&ClearCommand::color(Color::BLACK).with_target(target))?;
    session.draw(&DrawCommand::new(triangle.mesh, triangle.shader, 3).with_target(target))?;
    session.end_frame()?;

    let texture = session.device().render_target_attachment(target, 0)?;
    let mut pixels = vec![0; (width * height * 4) as usize];
    session.device().get_texture_data(texture, &mut pixels)?;

    let mut png = Vec::new();
    if !image::write(width, height, &pixels, |bytes| png.extend_from_slice(bytes)) {
        anyhow::bail!("Failed to encode the screenshot");
    }
    std::fs::write(path, png).with_context(|| format!("Failed to write {path}"))?;
    log::info!("Screenshot written to {path}");

    session.shutdown();
    Ok(())
}

fn main() -> Result<()> {
    let descriptor = StartupDescriptor::load_from_path("vesta.toml")?;
    let args: Vec<String> = std::env::args().collect();
    match args.iter().position(|a| a == "--screenshot") {
        Some(i) => {
            let path = args.get(i + 1).map_or("screenshot.png", String::as_str);
            screenshot(descriptor, path)
        }
        None => run_window(descriptor),
    }
}
