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

//! Texture formats, samplers and texel packing rules.

use crate::renderer::api::common::Rect;
use crate::renderer::error::ResourceError;

/// Storage format of a texture. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, 4 bytes per texel.
    Rgba8,
    /// A single 8-bit channel.
    R8,
    /// Packed depth/stencil: a little-endian `u32` holding unorm24 depth in the
    /// low 24 bits and the stencil value in the high 8 bits.
    Depth24Stencil8,
}

impl TextureFormat {
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::R8 => 1,
            TextureFormat::Depth24Stencil8 => 4,
        }
    }

    pub const fn is_depth_stencil(self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }

    /// Size in bytes of a tightly packed `width` x `height` image, or `None`
    /// if it does not fit in `usize`.
    pub const fn checked_data_size(self, width: u32, height: u32) -> Option<usize> {
        match (width as usize).checked_mul(height as usize) {
            Some(texels) => texels.checked_mul(self.bytes_per_texel()),
            None => None,
        }
    }

    /// Size in bytes of a tightly packed `width` x `height` image. Saturates
    /// at `usize::MAX` for sizes no texture can have.
    pub const fn data_size(self, width: u32, height: u32) -> usize {
        match self.checked_data_size(width, height) {
            Some(size) => size,
            None => usize::MAX,
        }
    }
}

/// Filtering used when sampling a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

/// Addressing mode for coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// How a shader's sampler slot reads its texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureSampler {
    pub filter: TextureFilter,
    pub wrap_x: TextureWrap,
    pub wrap_y: TextureWrap,
}

impl TextureSampler {
    pub const fn new(filter: TextureFilter, wrap_x: TextureWrap, wrap_y: TextureWrap) -> Self {
        Self {
            filter,
            wrap_x,
            wrap_y,
        }
    }
}

/// Dimensions and format of a live texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureInfo {
    /// Checks that a texture of these dimensions can exist.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.format.checked_data_size(self.width, self.height).is_none() {
            return Err(ResourceError::AllocationFailed(format!(
                "a {}x{} {:?} texture exceeds the address space",
                self.width, self.height, self.format
            )));
        }
        Ok(())
    }

    /// Byte size of the full texture image.
    pub fn data_size(&self) -> usize {
        self.format.data_size(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Checks that `rect` lies inside the texture and `data` holds exactly its texels.
    pub fn validate_region(&self, rect: &Rect, data_len: usize) -> Result<(), ResourceError> {
        if rect.is_empty() || rect.intersect(&self.bounds()) != *rect {
            return Err(ResourceError::OutOfBounds);
        }
        let expected = self.format.data_size(rect.w as u32, rect.h as u32);
        if data_len != expected {
            return Err(ResourceError::DataSizeMismatch {
                expected,
                actual: data_len,
            });
        }
        Ok(())
    }
}

/// Packs a depth in `[0, 1]` and a stencil value into the `Depth24Stencil8` texel layout.
pub fn pack_depth_stencil(depth: f32, stencil: u8) -> u32 {
    let d = (depth.clamp(0.0, 1.0) * 0x00FF_FFFF as f32).round() as u32;
    (d & 0x00FF_FFFF) | ((stencil as u32) << 24)
}

/// Splits a `Depth24Stencil8` texel into depth in `[0, 1]` and stencil.
pub fn unpack_depth_stencil(texel: u32) -> (f32, u8) {
    let depth = (texel & 0x00FF_FFFF) as f32 / 0x00FF_FFFF as f32;
    (depth, (texel >> 24) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn data_size_per_format() {
        assert_eq!(TextureFormat::Rgba8.data_size(4, 4), 64);
        assert_eq!(TextureFormat::R8.data_size(4, 4), 16);
        assert_eq!(TextureFormat::Depth24Stencil8.data_size(2, 3), 24);
    }

    #[test]
    fn zero_sized_texture_is_rejected() {
        let info = TextureInfo {
            width: 0,
            height: 4,
            format: TextureFormat::Rgba8,
        };
        assert!(matches!(info.validate(), Err(ResourceError::InvalidDescriptor(_))));
    }

    #[test]
    fn unaddressable_texture_is_an_allocation_failure() {
        assert_eq!(TextureFormat::Rgba8.checked_data_size(u32::MAX, u32::MAX), None);
        assert_eq!(TextureFormat::Rgba8.data_size(u32::MAX, u32::MAX), usize::MAX);
        let info = TextureInfo {
            width: u32::MAX,
            height: u32::MAX,
            format: TextureFormat::Rgba8,
        };
        assert!(matches!(info.validate(), Err(ResourceError::AllocationFailed(_))));
    }

    #[test]
    fn region_must_fit_and_match_data() {
        let info = TextureInfo {
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8,
        };
        assert_eq!(info.validate_region(&Rect::new(1, 1, 2, 2), 16), Ok(()));
        assert_eq!(
            info.validate_region(&Rect::new(3, 3, 2, 2), 16),
            Err(ResourceError::OutOfBounds)
        );
        assert_eq!(
            info.validate_region(&Rect::new(0, 0, 2, 2), 15),
            Err(ResourceError::DataSizeMismatch {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn depth_stencil_packing() {
        let texel = pack_depth_stencil(1.0, 0xAB);
        assert_eq!(texel, 0xABFF_FFFF);
        let (depth, stencil) = unpack_depth_stencil(pack_depth_stencil(0.5, 3));
        assert_relative_eq!(depth, 0.5, epsilon = 1e-6);
        assert_eq!(stencil, 3);
    }
}
