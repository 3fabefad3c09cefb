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


//! Image decoding and PNG encoding for textures and screenshots.

use ::image::codecs::png::PngEncoder;
use ::image::{ExtendedColorType, ImageEncoder};
use vesta_core::platform::PlatformError;

/// Decoded RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decodes an encoded image into RGBA8.
///
/// ## Errors
/// `PlatformError::ImageDecode` if the bytes are not a supported image.
pub fn load(bytes: &[u8]) -> Result<Image, PlatformError> {
    let decoded = ::image::load_from_memory(bytes)
        .map_err(|e| PlatformError::ImageDecode(e.to_string()))
        .inspect_err(|e| log::error!("{e}"))?;
    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Image {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Encodes RGBA8 pixels as PNG and hands the bytes to `sink`.
///
/// Returns `false`, without calling `sink`, if `rgba` does not hold exactly
/// `width * height` pixels or encoding fails.
pub fn write<F: FnMut(&[u8])>(width: u32, height: u32, rgba: &[u8], mut sink: F) -> bool {
    match encode_png(width, height, rgba) {
        Ok(bytes) => {
            sink(&bytes);
            true
        }
        Err(e) => {
            log::error!("{e}");
            false
        }
    }
}

fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, PlatformError> {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || rgba.len() != expected {
        return Err(PlatformError::ImageEncode(format!(
            "expected {expected} bytes for a {width}x{height} RGBA image, got {}",
            rgba.len()
        )));
    }
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| PlatformError::ImageEncode(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip() {
        let pixels: Vec<u8> = (0..2 * 3 * 4).map(|i| (i * 10) as u8).collect();
        let mut encoded = Vec::new();
        assert!(write(2, 3, &pixels, |bytes| encoded.extend_from_slice(bytes)));
        assert!(encoded.starts_with(&[0x89, b'P', b'N', b'G']));

        let image = load(&encoded).unwrap();
        assert_eq!((image.width, image.height), (2, 3));
        assert_eq!(image.pixels, pixels);
    }

    #[test]
    fn wrong_pixel_count_is_rejected() {
        let mut called = false;
        assert!(!write(2, 2, &[0; 15], |_| called = true));
        assert!(!called);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(matches!(load(b"not an image"), Err(PlatformError::ImageDecode(_))));
    }
}
