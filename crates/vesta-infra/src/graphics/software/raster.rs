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


//! Triangle rasterization, clears and vertex fetch for the software device.
//!
//! Conventions: clip space `x, y` in `[-1, 1]` with `+y` up, depth in
//! `[0, 1]`, pixel row 0 at the top and pixel centers at `+0.5`. Shared edges
//! follow a top-left rule so adjacent triangles never touch a pixel twice.

use super::interp::{FragmentInvocation, StageOutput};
use vesta_core::renderer::{
    pack_depth_stencil, unpack_depth_stencil, BlendMode, ClearCommand, ClearMask, Color,
    CullMode, DepthCompare, Rect, TextureFormat, TextureId, VertexFormat, VertexType,
};

/// One attachment's pixels, temporarily owned by a command.
#[derive(Debug)]
pub struct Plane {
    /// The texture the pixels came from, `None` for the backbuffer.
    pub texture: Option<TextureId>,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

/// All attachments of the target a command writes to.
#[derive(Debug)]
pub struct Planes {
    pub width: u32,
    pub height: u32,
    pub colors: Vec<Plane>,
    pub depth: Option<Plane>,
}

impl Planes {
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Clears the planes selected by the command's mask inside its clip rectangle.
    pub fn clear(&mut self, command: &ClearCommand) {
        let rect = command.clip_rect(self.bounds());
        if rect.is_empty() {
            return;
        }
        let width = self.width as usize;

        if command.mask.contains(ClearMask::COLOR) {
            for plane in &mut self.colors {
                let texel = match plane.format {
                    TextureFormat::Rgba8 => command.color.to_bytes().to_vec(),
                    TextureFormat::R8 => vec![command.color.r],
                    TextureFormat::Depth24Stencil8 => continue,
                };
                for_each_pixel(rect, |x, y| {
                    let at = (y * width + x) * texel.len();
                    plane.data[at..at + texel.len()].copy_from_slice(&texel);
                });
            }
        }

        let clear_depth = command.mask.contains(ClearMask::DEPTH);
        let clear_stencil = command.mask.contains(ClearMask::STENCIL);
        if let (Some(plane), true) = (self.depth.as_mut(), clear_depth || clear_stencil) {
            let depth_bits = pack_depth_stencil(command.depth, 0) & 0x00FF_FFFF;
            let stencil_bits = (command.stencil as u32) << 24;
            for_each_pixel(rect, |x, y| {
                let at = (y * width + x) * 4;
                let old = read_u32(&plane.data, at);
                let depth = if clear_depth { depth_bits } else { old & 0x00FF_FFFF };
                let stencil = if clear_stencil { stencil_bits } else { old & 0xFF00_0000 };
                plane.data[at..at + 4].copy_from_slice(&(depth | stencil).to_le_bytes());
            });
        }
    }
}

fn for_each_pixel(rect: Rect, mut f: impl FnMut(usize, usize)) {
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            f(x as usize, y as usize);
        }
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Fixed-function state of one draw, resolved against its target.
#[derive(Debug, Clone, Copy)]
pub struct DrawState {
    pub viewport: Rect,
    pub clip: Rect,
    pub compare: DepthCompare,
    pub cull: CullMode,
    pub blend: BlendMode,
}

/// A vertex after the vertex stage.
#[derive(Debug, Clone)]
pub struct ShadedVertex {
    pub position: [f32; 4],
    pub varyings: Vec<(u32, Vec<f32>)>,
}

fn edge(a: [f32; 3], b: [f32; 3], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn owns_edge(from: [f32; 3], to: [f32; 3]) -> bool {
    let (dx, dy) = (to[0] - from[0], to[1] - from[1]);
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

/// Rasterizes one triangle, calling `shade` for every covered pixel.
///
/// Triangles with a vertex behind the eye (`w <= 0`) are dropped rather
/// than clipped.
pub fn rasterize_triangle<F>(
    planes: &mut Planes,
    state: &DrawState,
    triangle: [&ShadedVertex; 3],
    mut shade: F,
) -> Result<(), String>
where
    F: FnMut(&FragmentInvocation) -> Result<Option<StageOutput>, String>,
{
    if triangle.iter().any(|v| v.position[3] <= 0.0) {
        return Ok(());
    }
    let ndc = triangle.map(|v| {
        let w = v.position[3];
        [v.position[0] / w, v.position[1] / w, v.position[2] / w]
    });

    let ndc_area = (ndc[1][0] - ndc[0][0]) * (ndc[2][1] - ndc[0][1])
        - (ndc[2][0] - ndc[0][0]) * (ndc[1][1] - ndc[0][1]);
    if ndc_area == 0.0 || !ndc_area.is_finite() {
        return Ok(());
    }
    let front_facing = ndc_area > 0.0;
    match state.cull {
        CullMode::Front if front_facing => return Ok(()),
        CullMode::Back if !front_facing => return Ok(()),
        _ => {}
    }

    let vp = state.viewport;
    let mut screen = ndc.map(|n| {
        [
            vp.x as f32 + (n[0] * 0.5 + 0.5) * vp.w as f32,
            vp.y as f32 + (0.5 - n[1] * 0.5) * vp.h as f32,
            n[2],
        ]
    });
    let mut vertices = triangle;
    let mut area = edge(screen[0], screen[1], [screen[2][0], screen[2][1]]);
    if area < 0.0 {
        screen.swap(1, 2);
        vertices.swap(1, 2);
        area = -area;
    }
    let inv_w = vertices.map(|v| 1.0 / v.position[3]);

    let clip = state.clip;
    let min_x = screen.iter().map(|v| v[0]).fold(f32::INFINITY, f32::min).floor().max(clip.x as f32) as i32;
    let max_x = screen.iter().map(|v| v[0]).fold(f32::NEG_INFINITY, f32::max).ceil().min(clip.right() as f32) as i32;
    let min_y = screen.iter().map(|v| v[1]).fold(f32::INFINITY, f32::min).floor().max(clip.y as f32) as i32;
    let max_y = screen.iter().map(|v| v[1]).fold(f32::NEG_INFINITY, f32::max).ceil().min(clip.bottom() as f32) as i32;

    let edges = [(screen[1], screen[2]), (screen[2], screen[0]), (screen[0], screen[1])];
    let owned = edges.map(|(from, to)| owns_edge(from, to));
    let width = planes.width as usize;

    for py in min_y..max_y {
        for px in min_x..max_x {
            let p = [px as f32 + 0.5, py as f32 + 0.5];
            let w = edges.map(|(from, to)| edge(from, to, p));
            let inside = w
                .iter()
                .zip(&owned)
                .all(|(w, owned)| *w > 0.0 || (*w == 0.0 && *owned));
            if !inside {
                continue;
            }

            let bary = w.map(|w| w / area);
            let z = bary[0] * screen[0][2] + bary[1] * screen[1][2] + bary[2] * screen[2][2];
            let one_over_w = bary[0] * inv_w[0] + bary[1] * inv_w[1] + bary[2] * inv_w[2];
            let weights = [0, 1, 2].map(|i| bary[i] * inv_w[i] / one_over_w);
            let varyings = interpolate(&vertices, weights);

            let invocation = FragmentInvocation {
                frag_coord: [p[0], p[1], z, one_over_w],
                front_facing,
                varyings: &varyings,
            };
            let Some(output) = shade(&invocation)? else {
                continue;
            };

            let depth = output.frag_depth.unwrap_or(z);
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }
            let index = py as usize * width + px as usize;
            if !depth_test(planes.depth.as_mut(), state.compare, index, depth) {
                continue;
            }
            write_colors(&mut planes.colors, &state.blend, index, &output);
        }
    }
    Ok(())
}

fn interpolate(vertices: &[&ShadedVertex; 3], weights: [f32; 3]) -> Vec<(u32, Vec<f32>)> {
    vertices[0]
        .varyings
        .iter()
        .map(|(location, first)| {
            let others = [1, 2].map(|i| {
                vertices[i]
                    .varyings
                    .iter()
                    .find(|(l, _)| l == location)
                    .map(|(_, v)| v.as_slice())
                    .unwrap_or(first.as_slice())
            });
            let values = (0..first.len())
                .map(|c| {
                    first[c] * weights[0]
                        + others[0].get(c).copied().unwrap_or(0.0) * weights[1]
                        + others[1].get(c).copied().unwrap_or(0.0) * weights[2]
                })
                .collect();
            (*location, values)
        })
        .collect()
}

/// Tests and writes depth. Targets without a depth plane always pass.
fn depth_test(plane: Option<&mut Plane>, compare: DepthCompare, index: usize, depth: f32) -> bool {
    let Some(plane) = plane else {
        return true;
    };
    if compare == DepthCompare::None {
        return true;
    }
    let at = index * 4;
    let (stored, stencil) = unpack_depth_stencil(read_u32(&plane.data, at));
    if !compare.passes(depth, stored) {
        return false;
    }
    if compare.writes_depth() {
        plane.data[at..at + 4].copy_from_slice(&pack_depth_stencil(depth, stencil).to_le_bytes());
    }
    true
}

/// Blends fragment outputs into color attachments; output location `i` feeds attachment `i`.
fn write_colors(colors: &mut [Plane], blend: &BlendMode, index: usize, output: &StageOutput) {
    for (location, plane) in colors.iter_mut().enumerate() {
        let Some((_, values)) = output.locations.iter().find(|(l, _)| *l as usize == location) else {
            continue;
        };
        let get = |i: usize, default: f32| values.get(i).copied().unwrap_or(default);
        let src = [get(0, 0.0), get(1, 0.0), get(2, 0.0), get(3, 1.0)];
        match plane.format {
            TextureFormat::Rgba8 => {
                let at = index * 4;
                let d = &plane.data[at..at + 4];
                let dst = Color::rgba(d[0], d[1], d[2], d[3]).to_f32_array();
                let out = Color::from_f32_array(blend.apply(src, dst)).to_bytes();
                plane.data[at..at + 4].copy_from_slice(&out);
            }
            TextureFormat::R8 => {
                let dst = [plane.data[index] as f32 / 255.0, 0.0, 0.0, 1.0];
                plane.data[index] = Color::from_f32_array(blend.apply(src, dst)).r;
            }
            TextureFormat::Depth24Stencil8 => {}
        }
    }
}

/// Decodes the attributes of vertex `vertex` into `(location, xyzw)` pairs,
/// padding missing components with `(0, 0, 0, 1)`.
pub fn fetch_attributes(format: &VertexFormat, data: &[u8], vertex: u32) -> Vec<(u32, [f32; 4])> {
    let base = vertex as usize * format.stride() as usize;
    format
        .offsets()
        .map(|(offset, element)| {
            let at = base + offset as usize;
            let bytes = data.get(at..at + element.ty.size_in_bytes() as usize).unwrap_or(&[]);
            let mut value = [0.0, 0.0, 0.0, 1.0];
            for (i, slot) in value.iter_mut().take(element.ty.components()).enumerate() {
                *slot = decode_component(element.ty, element.normalized, bytes, i);
            }
            (element.index, value)
        })
        .collect()
}

static ZEROS: [u8; 4] = [0; 4];

fn decode_component(ty: VertexType, normalized: bool, bytes: &[u8], i: usize) -> f32 {
    let raw = |size: usize| bytes.get(i * size..(i + 1) * size).unwrap_or(&ZEROS[..size]);
    match ty {
        VertexType::Float | VertexType::Float2 | VertexType::Float3 | VertexType::Float4 => {
            let b = raw(4);
            f32::from_le_bytes([b[0], b[1], b[2], b[3]])
        }
        VertexType::Byte4 => {
            let v = raw(1)[0] as i8 as f32;
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        VertexType::UByte4 => {
            let v = raw(1)[0] as f32;
            if normalized { v / 255.0 } else { v }
        }
        VertexType::Short2 | VertexType::Short4 => {
            let b = raw(2);
            let v = i16::from_le_bytes([b[0], b[1]]) as f32;
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        VertexType::UShort2 | VertexType::UShort4 => {
            let b = raw(2);
            let v = u16::from_le_bytes([b[0], b[1]]) as f32;
            if normalized { v / 65535.0 } else { v }
        }
    }
}
