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

//! Shader sources and the uniform metadata a compiled shader exposes.

use crate::renderer::error::ShaderError;

/// The WGSL sources of a shader program.
///
/// Each source must declare exactly one entry point of its stage. The two
/// sources may be the same text when a single module holds both entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderData {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderData {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// A program whose stages both live in one WGSL module.
    pub fn single(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            vertex: source.clone(),
            fragment: source,
        }
    }
}

/// The type of a shader uniform as seen across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UniformType {
    #[default]
    None,
    Float,
    Float2,
    Float3,
    Float4,
    /// A 3-column, 2-row matrix (a 2D affine transform).
    Mat3x2,
    Mat4x4,
    Texture2D,
    Sampler2D,
}

impl UniformType {
    /// Number of floats one element of this type holds.
    pub const fn float_count(self) -> usize {
        match self {
            UniformType::None => 0,
            UniformType::Float => 1,
            UniformType::Float2 => 2,
            UniformType::Float3 => 3,
            UniformType::Float4 => 4,
            UniformType::Mat3x2 => 6,
            UniformType::Mat4x4 => 16,
            UniformType::Texture2D | UniformType::Sampler2D => 0,
        }
    }

    /// `true` for types set through float values rather than bindings.
    pub const fn is_value(self) -> bool {
        self.float_count() > 0
    }
}

/// Metadata of one uniform of a compiled shader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformInfo {
    /// Position in the shader's uniform list; stable for the shader's lifetime.
    pub index: usize,
    pub name: String,
    pub ty: UniformType,
    /// 1 for a single value, N for an array of N.
    pub array_elements: usize,
}

impl UniformInfo {
    /// Number of floats a full assignment of this uniform takes.
    pub fn value_count(&self) -> usize {
        self.ty.float_count() * self.array_elements
    }

    /// Checks a float assignment against this uniform.
    pub fn check_values(&self, values: &[f32]) -> Result<(), ShaderError> {
        if !self.ty.is_value() {
            return Err(ShaderError::UniformTypeMismatch {
                name: self.name.clone(),
                declared: self.ty,
            });
        }
        if values.len() != self.value_count() {
            return Err(ShaderError::UniformValueMismatch {
                name: self.name.clone(),
                expected: self.value_count(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// Checks a binding assignment (textures or samplers) of `count` entries.
    pub fn check_binding(&self, expected: UniformType, count: usize) -> Result<(), ShaderError> {
        if self.ty != expected {
            return Err(ShaderError::UniformTypeMismatch {
                name: self.name.clone(),
                declared: self.ty,
            });
        }
        if count != self.array_elements {
            return Err(ShaderError::UniformValueMismatch {
                name: self.name.clone(),
                expected: self.array_elements,
                actual: count,
            });
        }
        Ok(())
    }
}

/// Copies as many entries of `uniforms` as fit into `output`, returning the
/// total number of uniforms. Backends answer uniform queries through this.
pub fn fill_uniform_query(uniforms: &[UniformInfo], output: &mut [UniformInfo]) -> usize {
    for (slot, info) in output.iter_mut().zip(uniforms) {
        *slot = info.clone();
    }
    uniforms.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(index: usize, name: &str, ty: UniformType, array_elements: usize) -> UniformInfo {
        UniformInfo {
            index,
            name: name.to_string(),
            ty,
            array_elements,
        }
    }

    #[test]
    fn value_count_accounts_for_arrays() {
        assert_eq!(uniform(0, "m", UniformType::Mat3x2, 1).value_count(), 6);
        assert_eq!(uniform(0, "lights", UniformType::Float4, 8).value_count(), 32);
        assert_eq!(uniform(0, "tex", UniformType::Texture2D, 1).value_count(), 0);
    }

    #[test]
    fn float_values_are_checked() {
        let info = uniform(0, "u_matrix", UniformType::Mat4x4, 1);
        assert!(info.check_values(&[0.0; 16]).is_ok());
        assert_eq!(
            info.check_values(&[0.0; 4]),
            Err(ShaderError::UniformValueMismatch {
                name: "u_matrix".to_string(),
                expected: 16,
                actual: 4
            })
        );
    }

    #[test]
    fn values_cannot_target_a_texture_slot() {
        let info = uniform(1, "u_texture", UniformType::Texture2D, 1);
        assert!(matches!(
            info.check_values(&[]),
            Err(ShaderError::UniformTypeMismatch { .. })
        ));
        assert!(info.check_binding(UniformType::Texture2D, 1).is_ok());
        assert!(info.check_binding(UniformType::Sampler2D, 1).is_err());
    }

    #[test]
    fn query_truncates_to_buffer_and_reports_total() {
        let uniforms = vec![
            uniform(0, "a", UniformType::Float, 1),
            uniform(1, "b", UniformType::Float2, 1),
            uniform(2, "c", UniformType::Float4, 1),
        ];
        let mut output = vec![UniformInfo::default(); 2];
        let count = fill_uniform_query(&uniforms, &mut output);
        assert_eq!(count, 3);
        assert_eq!(output[0].name, "a");
        assert_eq!(output[1].name, "b");

        let count = fill_uniform_query(&uniforms, &mut []);
        assert_eq!(count, 3);
    }
}
