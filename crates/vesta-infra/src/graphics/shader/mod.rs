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


//! Shader compilation shared by every backend.

pub mod bindings;
pub mod reflect;

pub use self::bindings::ShaderBindings;
pub use self::reflect::{
    compile_stage, reflect, BindingInfo, BindingKind, BindingSlot, ShaderReflection, StageModule,
    UniformSlot,
};

use naga::ShaderStage;
use vesta_core::renderer::{ShaderData, ShaderError};

/// Both validated stages of a program and their combined resource interface.
#[derive(Debug)]
pub struct CompiledProgram {
    pub vertex: StageModule,
    pub fragment: StageModule,
    pub reflection: ShaderReflection,
}

/// Parses, validates and reflects a vertex/fragment source pair.
pub fn compile_program(data: &ShaderData) -> Result<CompiledProgram, ShaderError> {
    let vertex = compile_stage(&data.vertex, ShaderStage::Vertex)?;
    let fragment = compile_stage(&data.fragment, ShaderStage::Fragment)?;
    let reflection = reflect(&vertex, &fragment)?;
    Ok(CompiledProgram {
        vertex,
        fragment,
        reflection,
    })
}
