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


//! Render device implementations.

pub mod shader;
pub mod software;
pub mod wgpu;

use vesta_core::renderer::{ResourceError, TextureFormat};

/// Checks a render target's attachment list.
pub(crate) fn validate_attachments(attachments: &[TextureFormat]) -> Result<(), ResourceError> {
    if attachments.is_empty() {
        return Err(ResourceError::InvalidDescriptor(
            "a render target needs at least one attachment".to_string(),
        ));
    }
    if attachments.iter().filter(|f| f.is_depth_stencil()).count() > 1 {
        return Err(ResourceError::InvalidDescriptor(
            "a render target can have at most one depth-stencil attachment".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_lists() {
        assert!(validate_attachments(&[TextureFormat::Rgba8]).is_ok());
        assert!(validate_attachments(&[TextureFormat::Depth24Stencil8]).is_ok());
        assert!(validate_attachments(&[
            TextureFormat::Rgba8,
            TextureFormat::R8,
            TextureFormat::Depth24Stencil8
        ])
        .is_ok());
        assert!(matches!(
            validate_attachments(&[]),
            Err(ResourceError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            validate_attachments(&[TextureFormat::Depth24Stencil8, TextureFormat::Depth24Stencil8]),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }
}
