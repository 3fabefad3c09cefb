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


use super::reflect::{write_uniform_values, BindingKind, ShaderReflection, UniformSlot};
use vesta_core::renderer::{
    fill_uniform_query, ResourceError, ShaderError, TextureId, TextureSampler, UniformInfo, UniformType,
};

/// CPU-side state of a shader's resource interface.
///
/// Holds one byte buffer per uniform buffer binding, plus the texture and
/// sampler assigned to each texture/sampler binding. Backends read this at
/// draw time.
#[derive(Debug)]
pub struct ShaderBindings {
    reflection: ShaderReflection,
    infos: Vec<UniformInfo>,
    buffers: Vec<Vec<u8>>,
    dirty: Vec<bool>,
    textures: Vec<Option<TextureId>>,
    samplers: Vec<TextureSampler>,
}

impl ShaderBindings {
    /// Zero-initialized bindings for a reflected program.
    pub fn new(reflection: ShaderReflection) -> Self {
        let count = reflection.bindings.len();
        let buffers = reflection
            .bindings
            .iter()
            .map(|b| match b.kind {
                BindingKind::UniformBuffer { size } => vec![0; size as usize],
                _ => Vec::new(),
            })
            .collect();
        Self {
            infos: reflection.uniform_infos(),
            reflection,
            buffers,
            dirty: vec![true; count],
            textures: vec![None; count],
            samplers: vec![TextureSampler::default(); count],
        }
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.infos
    }

    /// Answers a uniform query into a caller-provided buffer.
    pub fn query(&self, output: &mut [UniformInfo]) -> usize {
        fill_uniform_query(&self.infos, output)
    }

    pub fn set_uniform(&mut self, index: usize, values: &[f32]) -> Result<(), ShaderError> {
        let uniform = self.reflection.uniform(index)?;
        uniform.info.check_values(values)?;
        let UniformSlot::Value {
            binding,
            offset,
            stride,
        } = uniform.slot
        else {
            return Err(ShaderError::UniformTypeMismatch {
                name: uniform.info.name.clone(),
                declared: uniform.info.ty,
            });
        };
        write_uniform_values(&mut self.buffers[binding], offset, stride, uniform.info.ty, values);
        self.dirty[binding] = true;
        Ok(())
    }

    pub fn set_texture(&mut self, index: usize, textures: &[Option<TextureId>]) -> Result<(), ShaderError> {
        let uniform = self.reflection.uniform(index)?;
        uniform.info.check_binding(UniformType::Texture2D, textures.len())?;
        if let UniformSlot::Texture { binding } = uniform.slot {
            self.textures[binding] = textures[0];
        }
        Ok(())
    }

    pub fn set_sampler(&mut self, index: usize, samplers: &[TextureSampler]) -> Result<(), ShaderError> {
        let uniform = self.reflection.uniform(index)?;
        uniform.info.check_binding(UniformType::Sampler2D, samplers.len())?;
        if let UniformSlot::Sampler { binding } = uniform.slot {
            self.samplers[binding] = samplers[0];
        }
        Ok(())
    }

    /// Bytes of the uniform buffer at `binding`; empty for other binding kinds.
    pub fn buffer(&self, binding: usize) -> &[u8] {
        &self.buffers[binding]
    }

    pub fn texture(&self, binding: usize) -> Option<TextureId> {
        self.textures[binding]
    }

    pub fn sampler(&self, binding: usize) -> TextureSampler {
        self.samplers[binding]
    }

    /// Every texture currently assigned to a texture binding.
    pub fn bound_textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().flatten().copied()
    }

    /// Fails if a texture the program samples is also being rendered to.
    pub fn check_feedback(&self, attachments: &[TextureId]) -> Result<(), ResourceError> {
        match self.bound_textures().find(|t| attachments.contains(t)) {
            Some(texture) => Err(ResourceError::InvalidDescriptor(format!(
                "{texture:?} is sampled while being rendered to"
            ))),
            None => Ok(()),
        }
    }

    /// Uniform buffer bindings written since the last call, clearing the marks.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        let dirty = self
            .dirty
            .iter()
            .enumerate()
            .filter(|(_, d)| **d)
            .map(|(i, _)| i)
            .filter(|i| !self.buffers[*i].is_empty())
            .collect();
        self.dirty.iter_mut().for_each(|d| *d = false);
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::shader::compile_program;
    use vesta_core::renderer::ShaderData;

    const SOURCE: &str = r#"
        struct Globals { offset: vec2<f32>, scale: f32 }
        @group(0) @binding(0) var<uniform> globals: Globals;
        @group(0) @binding(1) var tex: texture_2d<f32>;
        @group(0) @binding(2) var samp: sampler;

        @vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(p * globals.scale + globals.offset, 0.0, 1.0);
        }
        @fragment fn fs_main() -> @location(0) vec4<f32> {
            return textureSample(tex, samp, vec2<f32>(0.5));
        }
    "#;

    fn bindings() -> ShaderBindings {
        let program = compile_program(&ShaderData::single(SOURCE)).unwrap();
        ShaderBindings::new(program.reflection)
    }

    #[test]
    fn values_land_at_member_offsets() {
        let mut bindings = bindings();
        bindings.set_uniform(0, &[1.0, 2.0]).unwrap();
        bindings.set_uniform(1, &[3.0]).unwrap();
        let buffer = bindings.buffer(0);
        assert_eq!(&buffer[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&buffer[4..8], &2.0f32.to_le_bytes());
        assert_eq!(&buffer[8..12], &3.0f32.to_le_bytes());
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let mut bindings = bindings();
        let err = bindings.set_uniform(0, &[1.0]).unwrap_err();
        assert_eq!(
            err,
            ShaderError::UniformValueMismatch {
                name: "offset".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn setters_check_the_slot_type() {
        let mut bindings = bindings();
        assert!(matches!(
            bindings.set_uniform(2, &[]),
            Err(ShaderError::UniformTypeMismatch { .. })
        ));
        assert!(matches!(
            bindings.set_texture(0, &[None]),
            Err(ShaderError::UniformTypeMismatch { .. })
        ));
        assert_eq!(
            bindings.set_sampler(9, &[TextureSampler::default()]),
            Err(ShaderError::UniformNotFound { index: 9 })
        );
    }

    #[test]
    fn texture_and_sampler_assignments_are_kept() {
        let mut bindings = bindings();
        bindings.set_texture(2, &[Some(TextureId(7))]).unwrap();
        let sampler = TextureSampler {
            filter: vesta_core::renderer::TextureFilter::Linear,
            ..TextureSampler::default()
        };
        bindings.set_sampler(3, &[sampler]).unwrap();
        assert_eq!(bindings.texture(1), Some(TextureId(7)));
        assert_eq!(bindings.sampler(2), sampler);
    }

    #[test]
    fn dirty_buffers_are_reported_once() {
        let mut bindings = bindings();
        assert_eq!(bindings.take_dirty(), vec![0]);
        assert!(bindings.take_dirty().is_empty());
        bindings.set_uniform(1, &[2.0]).unwrap();
        assert_eq!(bindings.take_dirty(), vec![0]);
    }
}
