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

//! CPU texture storage and sampling.

use vesta_core::renderer::{
    unpack_depth_stencil, Rect, ResourceError, TextureFilter, TextureFormat, TextureInfo,
    TextureSampler, TextureWrap,
};

/// Largest width or height the software device accepts.
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

/// A texture owned by the software device. Rows are tightly packed, top row first.
#[derive(Debug, Clone)]
pub struct SoftwareTexture {
    pub info: TextureInfo,
    pub data: Vec<u8>,
}

impl SoftwareTexture {
    /// Allocates a zeroed texture.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If a side exceeds [`MAX_TEXTURE_DIMENSION`]
    ///   or the storage cannot be reserved.
    pub fn new(info: TextureInfo) -> Result<Self, ResourceError> {
        if info.width > MAX_TEXTURE_DIMENSION || info.height > MAX_TEXTURE_DIMENSION {
            return Err(ResourceError::AllocationFailed(format!(
                "{}x{} exceeds the {MAX_TEXTURE_DIMENSION} texel limit per side",
                info.width, info.height
            )));
        }
        let size = info.format.checked_data_size(info.width, info.height).ok_or_else(|| {
            ResourceError::AllocationFailed(format!(
                "a {}x{} {:?} texture exceeds the address space",
                info.width, info.height, info.format
            ))
        })?;
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|e| {
            ResourceError::AllocationFailed(format!("cannot reserve {size} bytes: {e}"))
        })?;
        data.resize(size, 0);
        Ok(Self { info, data })
    }

    /// Copies tightly packed texels into `rect`. The region must already be validated.
    pub fn write_region(&mut self, rect: &Rect, data: &[u8]) {
        let bpp = self.info.format.bytes_per_texel();
        let row_len = rect.w as usize * bpp;
        let pitch = self.info.width as usize * bpp;
        for (row, src) in data.chunks_exact(row_len).enumerate() {
            let start = (rect.y as usize + row) * pitch + rect.x as usize * bpp;
            self.data[start..start + row_len].copy_from_slice(src);
        }
    }

    pub fn view(&self) -> BoundTexture<'_> {
        BoundTexture {
            width: self.info.width,
            height: self.info.height,
            format: self.info.format,
            data: &self.data,
        }
    }
}

/// A borrowed view of a texture bound to a shader for one draw.
#[derive(Debug, Clone, Copy)]
pub struct BoundTexture<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: &'a [u8],
}

impl BoundTexture<'_> {
    /// Reads one texel as normalized RGBA.
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let bpp = self.format.bytes_per_texel();
        let at = (y as usize * self.width as usize + x as usize) * bpp;
        let Some(bytes) = self.data.get(at..at + bpp) else {
            return [0.0, 0.0, 0.0, 1.0];
        };
        match self.format {
            TextureFormat::Rgba8 => [
                bytes[0] as f32 / 255.0,
                bytes[1] as f32 / 255.0,
                bytes[2] as f32 / 255.0,
                bytes[3] as f32 / 255.0,
            ],
            TextureFormat::R8 => [bytes[0] as f32 / 255.0, 0.0, 0.0, 1.0],
            TextureFormat::Depth24Stencil8 => {
                let (depth, _) =
                    unpack_depth_stencil(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
                [depth, 0.0, 0.0, 1.0]
            }
        }
    }
}

fn wrap(coord: i64, size: u32, mode: TextureWrap) -> u32 {
    let size = size as i64;
    let wrapped = match mode {
        TextureWrap::Repeat => coord.rem_euclid(size),
        TextureWrap::ClampToEdge => coord.clamp(0, size - 1),
        TextureWrap::MirroredRepeat => {
            let m = coord.rem_euclid(size * 2);
            if m < size {
                m
            } else {
                size * 2 - 1 - m
            }
        }
    };
    wrapped as u32
}

/// Samples `texture` at normalized coordinates `uv`.
pub fn sample_texture(texture: &BoundTexture, sampler: &TextureSampler, uv: [f32; 2]) -> [f32; 4] {
    let x = uv[0] * texture.width as f32;
    let y = uv[1] * texture.height as f32;

    match sampler.filter {
        TextureFilter::Nearest => texture.texel(
            wrap(x.floor() as i64, texture.width, sampler.wrap_x),
            wrap(y.floor() as i64, texture.height, sampler.wrap_y),
        ),
        TextureFilter::Linear => {
            let (x, y) = (x - 0.5, y - 0.5);
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let xs = [
                wrap(x0 as i64, texture.width, sampler.wrap_x),
                wrap(x0 as i64 + 1, texture.width, sampler.wrap_x),
            ];
            let ys = [
                wrap(y0 as i64, texture.height, sampler.wrap_y),
                wrap(y0 as i64 + 1, texture.height, sampler.wrap_y),
            ];
            let (a, b) = (texture.texel(xs[0], ys[0]), texture.texel(xs[1], ys[0]));
            let (c, d) = (texture.texel(xs[0], ys[1]), texture.texel(xs[1], ys[1]));
            let mut out = [0.0; 4];
            for i in 0..4 {
                let top = a[i] + (b[i] - a[i]) * fx;
                let bottom = c[i] + (d[i] - c[i]) * fx;
                out[i] = top + (bottom - top) * fy;
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn checker() -> SoftwareTexture {
        let mut texture = SoftwareTexture::new(TextureInfo {
            width: 2,
            height: 2,
            format: TextureFormat::Rgba8,
        })
        .unwrap();
        texture.write_region(
            &Rect::new(0, 0, 2, 2),
            &[
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
        );
        texture
    }

    #[test]
    fn nearest_picks_the_covering_texel() {
        let texture = checker();
        let sampler = TextureSampler::default();
        assert_eq!(sample_texture(&texture.view(), &sampler, [0.25, 0.25]), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(sample_texture(&texture.view(), &sampler, [0.75, 0.75]), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn wrap_modes() {
        assert_eq!(wrap(-1, 4, TextureWrap::Repeat), 3);
        assert_eq!(wrap(5, 4, TextureWrap::Repeat), 1);
        assert_eq!(wrap(-1, 4, TextureWrap::ClampToEdge), 0);
        assert_eq!(wrap(9, 4, TextureWrap::ClampToEdge), 3);
        assert_eq!(wrap(4, 4, TextureWrap::MirroredRepeat), 3);
        assert_eq!(wrap(-1, 4, TextureWrap::MirroredRepeat), 0);
    }

    #[test]
    fn linear_blends_neighbours() {
        let texture = checker();
        let sampler = TextureSampler::new(
            TextureFilter::Linear,
            TextureWrap::ClampToEdge,
            TextureWrap::ClampToEdge,
        );
        // Halfway between the red and green texels of the top row.
        let texel = sample_texture(&texture.view(), &sampler, [0.5, 0.25]);
        assert_relative_eq!(texel[0], 0.5);
        assert_relative_eq!(texel[1], 0.5);
        assert_relative_eq!(texel[2], 0.0);
    }

    #[test]
    fn oversized_textures_are_not_allocated() {
        let too_wide = TextureInfo {
            width: MAX_TEXTURE_DIMENSION + 1,
            height: 1,
            format: TextureFormat::R8,
        };
        assert!(matches!(
            SoftwareTexture::new(too_wide),
            Err(ResourceError::AllocationFailed(_))
        ));
        let unaddressable = TextureInfo {
            width: u32::MAX,
            height: u32::MAX,
            format: TextureFormat::Rgba8,
        };
        assert!(matches!(
            SoftwareTexture::new(unaddressable),
            Err(ResourceError::AllocationFailed(_))
        ));
    }

    #[test]
    fn partial_writes_keep_other_texels() {
        let mut texture = checker();
        texture.write_region(&Rect::new(1, 1, 1, 1), &[9, 9, 9, 9]);
        assert_eq!(&texture.data[12..16], &[9, 9, 9, 9]);
        assert_eq!(&texture.data[0..4], &[255, 0, 0, 255]);
    }
}
