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

//! WGSL front end and uniform reflection shared by every backend.
//!
//! Both stages are parsed and validated with naga. The resources each entry
//! point actually uses become the shader's bindings; value uniforms are
//! flattened so that each member of a uniform struct is addressable by index.

use naga::{AddressSpace, ImageClass, ImageDimension, ScalarKind, ShaderStage, TypeInner, VectorSize};
use vesta_core::renderer::{ShaderError, UniformInfo, UniformType};

/// A parsed and validated WGSL module with its selected entry point.
#[derive(Debug)]
pub struct StageModule {
    pub stage: ShaderStage,
    pub module: naga::Module,
    pub info: naga::valid::ModuleInfo,
    /// Index into `module.entry_points`.
    pub entry: usize,
}

impl StageModule {
    pub fn entry_point(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry]
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_point().name
    }
}

pub(crate) fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        _ => "compute",
    }
}

/// Parses and validates one stage, selecting its first entry point of `stage`.
pub fn compile_stage(source: &str, stage: ShaderStage) -> Result<StageModule, ShaderError> {
    let error = |details: String| ShaderError::CompilationError {
        stage: stage_name(stage).to_string(),
        details,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| error(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| error(e.emit_to_string(source)))?;

    let entry = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == stage)
        .ok_or_else(|| error(format!("no @{} entry point found", stage_name(stage))))?;

    Ok(StageModule {
        stage,
        module,
        info,
        entry,
    })
}

/// A resource binding location in WGSL (`@group(g) @binding(b)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSlot {
    pub group: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// A uniform buffer of `size` bytes.
    UniformBuffer { size: u32 },
    Texture,
    Sampler,
}

/// One resource binding used by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub slot: BindingSlot,
    pub kind: BindingKind,
    pub vertex: bool,
    pub fragment: bool,
}

/// Where the data of a uniform lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformSlot {
    /// Float data at `offset` inside the uniform buffer `binding`; array
    /// elements are `stride` bytes apart.
    Value {
        binding: usize,
        offset: u32,
        stride: u32,
    },
    Texture { binding: usize },
    Sampler { binding: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedUniform {
    pub info: UniformInfo,
    pub slot: UniformSlot,
}

/// The resource interface of a compiled program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Uniforms in query order: vertex-stage resources first, in declaration order.
    pub uniforms: Vec<ReflectedUniform>,
    /// Bindings, in first-use order. Indexed by [`UniformSlot`].
    pub bindings: Vec<BindingInfo>,
}

impl ShaderReflection {
    /// The public uniform descriptions, in index order.
    pub fn uniform_infos(&self) -> Vec<UniformInfo> {
        self.uniforms.iter().map(|u| u.info.clone()).collect()
    }

    pub fn uniform(&self, index: usize) -> Result<&ReflectedUniform, ShaderError> {
        self.uniforms
            .get(index)
            .ok_or(ShaderError::UniformNotFound { index })
    }

    /// Highest bind group index used, if any binding exists.
    pub fn max_group(&self) -> Option<u32> {
        self.bindings.iter().map(|b| b.slot.group).max()
    }

    fn find(&self, slot: BindingSlot) -> Option<usize> {
        self.bindings.iter().position(|b| b.slot == slot)
    }
}

/// Builds the program's resource interface from both stages.
pub fn reflect(vertex: &StageModule, fragment: &StageModule) -> Result<ShaderReflection, ShaderError> {
    let mut reflection = ShaderReflection::default();
    for stage in [vertex, fragment] {
        reflect_stage(stage, &mut reflection)?;
    }
    Ok(reflection)
}

fn reflect_stage(stage: &StageModule, out: &mut ShaderReflection) -> Result<(), ShaderError> {
    let module = &stage.module;
    let usage = stage.info.get_entry_point(stage.entry);
    let error = |details: String| ShaderError::CompilationError {
        stage: stage_name(stage.stage).to_string(),
        details,
    };

    for (handle, var) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let Some(binding) = &var.binding else {
            continue;
        };
        let slot = BindingSlot {
            group: binding.group,
            binding: binding.binding,
        };
        let name = var.name.clone().unwrap_or_default();

        let kind = match var.space {
            AddressSpace::Uniform => BindingKind::UniformBuffer {
                size: uniform_buffer_size(module, var.ty).map_err(&error)?,
            },
            AddressSpace::Handle => match &module.types[var.ty].inner {
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class:
                        ImageClass::Sampled {
                            kind: ScalarKind::Float,
                            multi: false,
                        },
                } => BindingKind::Texture,
                TypeInner::Sampler { comparison: false } => BindingKind::Sampler,
                _ => {
                    return Err(error(format!(
                        "resource '{name}' must be a texture_2d<f32> or a sampler"
                    )))
                }
            },
            _ => {
                return Err(error(format!(
                    "resource '{name}' uses an address space that is not supported; \
                     only uniform buffers, textures and samplers are"
                )))
            }
        };

        if let Some(existing) = out.find(slot) {
            let info = &mut out.bindings[existing];
            if info.kind != kind {
                return Err(error(format!(
                    "binding @group({}) @binding({}) is declared differently in the two stages",
                    slot.group, slot.binding
                )));
            }
            mark_stage(info, stage.stage);
            continue;
        }

        let mut info = BindingInfo {
            slot,
            kind,
            vertex: false,
            fragment: false,
        };
        mark_stage(&mut info, stage.stage);
        out.bindings.push(info);
        let binding_index = out.bindings.len() - 1;

        match kind {
            BindingKind::Texture => push_uniform(
                out,
                name,
                UniformType::Texture2D,
                1,
                UniformSlot::Texture {
                    binding: binding_index,
                },
            ),
            BindingKind::Sampler => push_uniform(
                out,
                name,
                UniformType::Sampler2D,
                1,
                UniformSlot::Sampler {
                    binding: binding_index,
                },
            ),
            BindingKind::UniformBuffer { .. } => match &module.types[var.ty].inner {
                TypeInner::Struct { members, .. } => {
                    for member in members {
                        let member_name = member.name.clone().unwrap_or_default();
                        let (ty, count, stride) =
                            classify_value(module, member.ty, &member_name).map_err(&error)?;
                        push_uniform(
                            out,
                            member_name,
                            ty,
                            count,
                            UniformSlot::Value {
                                binding: binding_index,
                                offset: member.offset,
                                stride,
                            },
                        );
                    }
                }
                _ => {
                    let (ty, count, stride) = classify_value(module, var.ty, &name).map_err(&error)?;
                    push_uniform(
                        out,
                        name,
                        ty,
                        count,
                        UniformSlot::Value {
                            binding: binding_index,
                            offset: 0,
                            stride,
                        },
                    );
                }
            },
        }
    }
    Ok(())
}

fn mark_stage(info: &mut BindingInfo, stage: ShaderStage) {
    match stage {
        ShaderStage::Vertex => info.vertex = true,
        _ => info.fragment = true,
    }
}

fn push_uniform(
    out: &mut ShaderReflection,
    name: String,
    ty: UniformType,
    array_elements: usize,
    slot: UniformSlot,
) {
    let index = out.uniforms.len();
    out.uniforms.push(ReflectedUniform {
        info: UniformInfo {
            index,
            name,
            ty,
            array_elements,
        },
        slot,
    });
}

/// Maps a WGSL type to a uniform type, its element count and array stride.
fn classify_value(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    name: &str,
) -> Result<(UniformType, usize, u32), String> {
    match &module.types[ty].inner {
        TypeInner::Array {
            base,
            size: naga::ArraySize::Constant(count),
            stride,
        } => {
            let element = classify_element(&module.types[*base].inner)
                .ok_or_else(|| unsupported(name))?;
            Ok((element, count.get() as usize, *stride))
        }
        inner => {
            let element = classify_element(inner).ok_or_else(|| unsupported(name))?;
            Ok((element, 1, element_size(element)))
        }
    }
}

fn classify_element(inner: &TypeInner) -> Option<UniformType> {
    match *inner {
        TypeInner::Scalar(naga::Scalar::F32) => Some(UniformType::Float),
        TypeInner::Vector {
            size,
            scalar: naga::Scalar::F32,
        } => Some(match size {
            VectorSize::Bi => UniformType::Float2,
            VectorSize::Tri => UniformType::Float3,
            VectorSize::Quad => UniformType::Float4,
        }),
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Bi,
            scalar: naga::Scalar::F32,
        } => Some(UniformType::Mat3x2),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar: naga::Scalar::F32,
        } => Some(UniformType::Mat4x4),
        _ => None,
    }
}

fn unsupported(name: &str) -> String {
    format!(
        "uniform '{name}' must be f32, vec2/3/4<f32>, mat3x2<f32>, mat4x4<f32> \
         or a fixed-size array of those"
    )
}

/// Byte size of one element in uniform address space.
pub fn element_size(ty: UniformType) -> u32 {
    ty.float_count() as u32 * 4
}

fn uniform_buffer_size(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Result<u32, String> {
    let size = match &module.types[ty].inner {
        TypeInner::Struct { span, .. } => *span,
        _ => {
            let (element, count, stride) = classify_value(module, ty, "uniform")?;
            if count > 1 {
                stride * count as u32
            } else {
                element_size(element)
            }
        }
    };
    // Uniform buffer bindings are sized in 16-byte units.
    Ok(size.div_ceil(16) * 16)
}

/// Writes float values for one uniform into its buffer's bytes.
///
/// All supported element types are tightly packed within an element
/// (`mat3x2` columns are 8 bytes apart, `mat4x4` columns 16), so each element
/// is `float_count` consecutive floats starting at its offset.
pub fn write_uniform_values(buffer: &mut [u8], offset: u32, stride: u32, ty: UniformType, values: &[f32]) {
    let per_element = ty.float_count();
    if per_element == 0 {
        return;
    }
    for (element, chunk) in values.chunks(per_element).enumerate() {
        let base = offset as usize + element * stride as usize;
        for (i, value) in chunk.iter().enumerate() {
            let at = base + i * 4;
            if let Some(dst) = buffer.get_mut(at..at + 4) {
                dst.copy_from_slice(&value.to_le_bytes());
            }
        }
    }
}
