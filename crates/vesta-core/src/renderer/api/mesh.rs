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

//! Vertex and index layout descriptors for meshes.

use crate::renderer::error::ResourceError;

/// The data type of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexType {
    Float,
    Float2,
    Float3,
    Float4,
    /// Four signed bytes.
    Byte4,
    /// Four unsigned bytes.
    UByte4,
    Short2,
    UShort2,
    Short4,
    UShort4,
}

impl VertexType {
    /// Size of the attribute in bytes.
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            VertexType::Float => 4,
            VertexType::Float2 => 8,
            VertexType::Float3 => 12,
            VertexType::Float4 => 16,
            VertexType::Byte4 | VertexType::UByte4 => 4,
            VertexType::Short2 | VertexType::UShort2 => 4,
            VertexType::Short4 | VertexType::UShort4 => 8,
        }
    }

    /// Number of scalar components.
    pub const fn components(self) -> usize {
        match self {
            VertexType::Float => 1,
            VertexType::Float2 | VertexType::Short2 | VertexType::UShort2 => 2,
            VertexType::Float3 => 3,
            VertexType::Float4
            | VertexType::Byte4
            | VertexType::UByte4
            | VertexType::Short4
            | VertexType::UShort4 => 4,
        }
    }
}

/// One attribute of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// The shader input location this attribute feeds.
    pub index: u32,
    pub ty: VertexType,
    /// Maps integer types to `[0, 1]` (unsigned) or `[-1, 1]` (signed).
    pub normalized: bool,
}

impl VertexElement {
    pub const fn new(index: u32, ty: VertexType, normalized: bool) -> Self {
        Self {
            index,
            ty,
            normalized,
        }
    }
}

/// The layout of one vertex in a mesh's vertex buffer.
///
/// Elements are packed in declaration order; each element's offset is the sum
/// of the sizes of the elements before it. The stride may add trailing padding
/// but can never be smaller than that sum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    stride: u32,
}

impl VertexFormat {
    /// Creates a format with an explicit stride.
    ///
    /// ## Errors
    /// Returns [`ResourceError::InvalidDescriptor`] if there are no elements,
    /// if two elements share a location, or if `stride` is smaller than the
    /// packed size of the elements.
    pub fn new(elements: Vec<VertexElement>, stride: u32) -> Result<Self, ResourceError> {
        if elements.is_empty() {
            return Err(ResourceError::InvalidDescriptor(
                "vertex format needs at least one element".to_string(),
            ));
        }
        for (i, element) in elements.iter().enumerate() {
            if elements[..i].iter().any(|e| e.index == element.index) {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "vertex location {} is declared twice",
                    element.index
                )));
            }
        }
        let packed: u32 = elements.iter().map(|e| e.ty.size_in_bytes()).sum();
        if stride < packed {
            return Err(ResourceError::InvalidDescriptor(format!(
                "vertex stride {stride} is smaller than the packed element size {packed}"
            )));
        }
        Ok(Self { elements, stride })
    }

    /// Creates a format whose stride is exactly the packed size of its elements.
    pub fn packed(elements: Vec<VertexElement>) -> Result<Self, ResourceError> {
        let stride = elements.iter().map(|e| e.ty.size_in_bytes()).sum();
        Self::new(elements, stride)
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Each element paired with its byte offset inside the vertex.
    pub fn offsets(&self) -> impl Iterator<Item = (u32, &VertexElement)> {
        self.elements.iter().scan(0u32, |offset, element| {
            let current = *offset;
            *offset += element.ty.size_in_bytes();
            Some((current, element))
        })
    }

    /// Number of whole vertices in `byte_len` bytes of vertex data.
    ///
    /// ## Errors
    /// Returns [`ResourceError::DataSizeMismatch`] when the length is not a
    /// multiple of the stride. Data is never silently truncated.
    pub fn vertex_count(&self, byte_len: usize) -> Result<usize, ResourceError> {
        let stride = self.stride as usize;
        if byte_len % stride != 0 {
            return Err(ResourceError::DataSizeMismatch {
                expected: (byte_len / stride + 1) * stride,
                actual: byte_len,
            });
        }
        Ok(byte_len / stride)
    }
}

/// The width of each index in a mesh's index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size_in_bytes(self) -> usize {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }

    /// Number of indices in `byte_len` bytes.
    pub fn index_count(self, byte_len: usize) -> Result<usize, ResourceError> {
        let size = self.size_in_bytes();
        if byte_len % size != 0 {
            return Err(ResourceError::DataSizeMismatch {
                expected: (byte_len / size + 1) * size,
                actual: byte_len,
            });
        }
        Ok(byte_len / size)
    }

    /// Decodes little-endian index data.
    pub fn decode(self, data: &[u8]) -> Vec<u32> {
        match self {
            IndexFormat::Uint16 => data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::Uint32 => data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite_elements() -> Vec<VertexElement> {
        vec![
            VertexElement::new(0, VertexType::Float2, false),
            VertexElement::new(1, VertexType::Float2, false),
            VertexElement::new(2, VertexType::UByte4, true),
        ]
    }

    #[test]
    fn offsets_are_running_sums() {
        let format = VertexFormat::packed(sprite_elements()).unwrap();
        let offsets: Vec<u32> = format.offsets().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(format.stride(), 20);
    }

    #[test]
    fn padded_stride_is_accepted() {
        let format = VertexFormat::new(sprite_elements(), 32).unwrap();
        let last = format.offsets().last().map(|(o, e)| o + e.ty.size_in_bytes());
        assert!(last.unwrap() <= format.stride());
    }

    #[test]
    fn stride_smaller_than_elements_is_rejected() {
        let result = VertexFormat::new(sprite_elements(), 16);
        assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let elements = vec![
            VertexElement::new(0, VertexType::Float2, false),
            VertexElement::new(0, VertexType::Float4, false),
        ];
        assert!(VertexFormat::packed(elements).is_err());
    }

    #[test]
    fn vertex_count_requires_whole_vertices() {
        let format =
            VertexFormat::packed(vec![VertexElement::new(0, VertexType::Float2, false)]).unwrap();
        assert_eq!(format.vertex_count(24), Ok(3));
        assert_eq!(
            format.vertex_count(20),
            Err(ResourceError::DataSizeMismatch {
                expected: 24,
                actual: 20
            })
        );
    }

    #[test]
    fn index_decoding() {
        let data: Vec<u8> = [0u16, 1, 65535].iter().flat_map(|i| i.to_le_bytes()).collect();
        assert_eq!(IndexFormat::Uint16.index_count(data.len()), Ok(3));
        assert_eq!(IndexFormat::Uint16.decode(&data), vec![0, 1, 65535]);
        assert!(IndexFormat::Uint32.index_count(6).is_err());
    }
}
