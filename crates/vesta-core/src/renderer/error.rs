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

//! Defines the hierarchy of error types for the rendering protocol.

use crate::renderer::api::shader::UniformType;
use std::fmt;

/// An error related to compiling a shader or addressing its uniforms.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// The shader source failed to parse, validate, or compile.
    CompilationError {
        /// The stage that failed (`"vertex"` or `"fragment"`), or the whole program.
        stage: String,
        /// Diagnostic text reported by the shader compiler.
        details: String,
    },
    /// No uniform exists at the given index.
    UniformNotFound {
        /// The index that was requested.
        index: usize,
    },
    /// The number of values supplied does not match the uniform's size.
    UniformValueMismatch {
        /// The uniform's name.
        name: String,
        /// The number of values the uniform holds.
        expected: usize,
        /// The number of values that were supplied.
        actual: usize,
    },
    /// A value was assigned through the wrong setter for the uniform's type.
    UniformTypeMismatch {
        /// The uniform's name.
        name: String,
        /// The uniform's declared type.
        declared: UniformType,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { stage, details } => {
                write!(f, "Shader compilation failed for {stage} stage: {details}")
            }
            ShaderError::UniformNotFound { index } => {
                write!(f, "No uniform at index {index}")
            }
            ShaderError::UniformValueMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Uniform '{name}' expects {expected} values but {actual} were supplied"
            ),
            ShaderError::UniformTypeMismatch { name, declared } => write!(
                f,
                "Uniform '{name}' is declared as {declared:?} and cannot take this kind of value"
            ),
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to creating, updating, or addressing a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The backend could not allocate the resource. No handle was produced.
    AllocationFailed(String),
    /// A shader-related error occurred.
    Shader(ShaderError),
    /// The handle does not refer to a live resource (never created, or already destroyed).
    InvalidHandle,
    /// A descriptor describes something the protocol cannot represent.
    InvalidDescriptor(String),
    /// An upload or read-back buffer has the wrong size.
    DataSizeMismatch {
        /// The size the operation requires, in bytes.
        expected: usize,
        /// The size that was supplied, in bytes.
        actual: usize,
    },
    /// Vertex data was uploaded to a mesh that has no vertex format.
    MissingVertexFormat,
    /// The texture belongs to a render target and is destroyed with it.
    AttachmentOwned,
    /// A backend-specific error occurred.
    BackendError(String),
    /// An index or range was outside the bounds of a resource.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AllocationFailed(msg) => write!(f, "Resource allocation failed: {msg}"),
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::InvalidHandle => write!(f, "Invalid or destroyed resource handle"),
            ResourceError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {msg}"),
            ResourceError::DataSizeMismatch { expected, actual } => write!(
                f,
                "Data size mismatch: expected {expected} bytes, got {actual}"
            ),
            ResourceError::MissingVertexFormat => {
                write!(f, "Vertex data uploaded before a vertex format was set")
            }
            ResourceError::AttachmentOwned => write!(
                f,
                "Texture is a render target attachment and is destroyed with its target"
            ),
            ResourceError::BackendError(msg) => write!(f, "Backend-specific resource error: {msg}"),
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error from the frame lifecycle or command submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The backend could not be brought up.
    InitializationFailed(String),
    /// The operation is not allowed in the session's current state.
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// A description of the state it was attempted in.
        state: String,
    },
    /// A command targeted the backbuffer but no backbuffer is available.
    NoBackbuffer,
    /// The next presentable surface could not be acquired.
    SurfaceAcquisitionFailed(String),
    /// A command referenced a resource that could not be used.
    ResourceError(ResourceError),
    /// The graphics device was lost and must be recreated.
    DeviceLost,
    /// An unexpected internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Renderer initialization failed: {msg}")
            }
            RenderError::InvalidState { operation, state } => {
                write!(f, "Cannot {operation} while {state}")
            }
            RenderError::NoBackbuffer => write!(f, "No backbuffer is available for this command"),
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::ResourceError(err) => write!(f, "Resource error: {err}"),
            RenderError::DeviceLost => write!(f, "Graphics device lost"),
            RenderError::Internal(msg) => write!(f, "Internal renderer error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn compilation_error_display_carries_diagnostic() {
        let err = ShaderError::CompilationError {
            stage: "fragment".to_string(),
            details: "expected ';'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shader compilation failed for fragment stage: expected ';'"
        );
    }

    #[test]
    fn resource_error_wraps_shader_error_as_source() {
        let err = ResourceError::from(ShaderError::UniformNotFound { index: 7 });
        assert_eq!(err.to_string(), "Shader resource error: No uniform at index 7");
        assert!(err.source().is_some());
    }

    #[test]
    fn render_error_chains_to_resource_error() {
        let err: RenderError = ResourceError::InvalidHandle.into();
        assert_eq!(
            err.to_string(),
            "Resource error: Invalid or destroyed resource handle"
        );
        let source = err.source().expect("resource error should be the source");
        assert_eq!(source.to_string(), "Invalid or destroyed resource handle");
    }

    #[test]
    fn shader_error_converts_straight_to_render_error() {
        let err: RenderError = ShaderError::UniformValueMismatch {
            name: "u_matrix".to_string(),
            expected: 16,
            actual: 4,
        }
        .into();
        assert!(matches!(
            err,
            RenderError::ResourceError(ResourceError::Shader(ShaderError::UniformValueMismatch { .. }))
        ));
    }

    #[test]
    fn invalid_state_display() {
        let err = RenderError::InvalidState {
            operation: "end the frame",
            state: "no frame is in progress".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot end the frame while no frame is in progress");
    }
}
