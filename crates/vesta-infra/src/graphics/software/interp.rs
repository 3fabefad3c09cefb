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

//! A CPU evaluator for validated naga IR.
//!
//! Runs one vertex or fragment entry point at a time. All numeric values are
//! carried as `f32`; integer-typed divisions and conversions truncate. The
//! supported subset is checked once per stage by [`check_supported`], so the
//! evaluator itself only reports errors for malformed runtime states.

use super::texture::{sample_texture, BoundTexture};
use crate::graphics::shader::reflect::{BindingSlot, StageModule};
use naga::{
    AddressSpace, BinaryOperator, Binding, BuiltIn, Expression, Function, Handle, Literal,
    MathFunction, ScalarKind, Statement, SwitchValue, TypeInner, UnaryOperator,
};
use naga::valid::FunctionInfo;
use std::collections::HashMap;
use vesta_core::renderer::TextureSampler;

const MAX_LOOP_ITERATIONS: usize = 1 << 16;
const MAX_CALL_DEPTH: usize = 32;

/// Resources bound to a program for one draw.
#[derive(Debug, Default)]
pub struct ShaderResources<'a> {
    pub uniform_buffers: HashMap<BindingSlot, &'a [u8]>,
    pub textures: HashMap<BindingSlot, BoundTexture<'a>>,
    pub samplers: HashMap<BindingSlot, TextureSampler>,
}

/// Inputs of one vertex shader invocation.
#[derive(Debug)]
pub struct VertexInvocation<'i> {
    /// Attribute values by shader location, padded to `(0, 0, 0, 1)`.
    pub attributes: &'i [(u32, [f32; 4])],
    pub vertex_index: u32,
    pub instance_index: u32,
}

/// Inputs of one fragment shader invocation.
#[derive(Debug)]
pub struct FragmentInvocation<'i> {
    pub frag_coord: [f32; 4],
    pub front_facing: bool,
    /// Interpolated vertex outputs by location.
    pub varyings: &'i [(u32, Vec<f32>)],
}

/// Values written by an entry point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub position: Option<[f32; 4]>,
    pub locations: Vec<(u32, Vec<f32>)>,
    pub frag_depth: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Scalar(f32),
    Bool(bool),
    Vector(Vec<f32>),
    /// Column-major.
    Matrix {
        columns: usize,
        rows: usize,
        data: Vec<f32>,
    },
    Composite(Vec<Value>),
    Pointer(Pointer),
    Texture(BindingSlot),
    Sampler(BindingSlot),
}

#[derive(Debug, Clone, PartialEq)]
struct Pointer {
    root: PointerRoot,
    path: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerRoot {
    Local(Handle<naga::LocalVariable>),
    Global(Handle<naga::GlobalVariable>),
}

impl Value {
    fn as_f32(&self) -> Result<f32, String> {
        match self {
            Value::Scalar(v) => Ok(*v),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(format!("expected a scalar, found {other:?}")),
        }
    }

    fn as_bool(&self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Scalar(v) => Ok(*v != 0.0),
            other => Err(format!("expected a boolean, found {other:?}")),
        }
    }

    fn as_index(&self) -> Result<usize, String> {
        Ok(self.as_f32()?.max(0.0) as usize)
    }

    fn components(&self) -> Result<Vec<f32>, String> {
        match self {
            Value::Scalar(v) => Ok(vec![*v]),
            Value::Bool(b) => Ok(vec![if *b { 1.0 } else { 0.0 }]),
            Value::Vector(v) => Ok(v.clone()),
            Value::Matrix { data, .. } => Ok(data.clone()),
            other => Err(format!("expected a numeric value, found {other:?}")),
        }
    }

    fn to_vec4(&self) -> Result<[f32; 4], String> {
        let c = self.components()?;
        let get = |i: usize, default: f32| c.get(i).copied().unwrap_or(default);
        Ok([get(0, 0.0), get(1, 0.0), get(2, 0.0), get(3, 1.0)])
    }

    /// Rebuilds a value with the same shape as `self` from new components.
    fn with_components(&self, components: Vec<f32>) -> Value {
        match self {
            Value::Matrix { columns, rows, .. } => Value::Matrix {
                columns: *columns,
                rows: *rows,
                data: components,
            },
            _ if components.len() == 1 => Value::Scalar(components[0]),
            _ => Value::Vector(components),
        }
    }
}

fn index_value(value: &Value, index: usize) -> Result<Value, String> {
    match value {
        Value::Vector(v) if !v.is_empty() => Ok(Value::Scalar(v[index.min(v.len() - 1)])),
        Value::Matrix {
            columns,
            rows,
            data,
        } if *columns > 0 => {
            let c = index.min(columns - 1);
            Ok(Value::Vector(data[c * rows..(c + 1) * rows].to_vec()))
        }
        Value::Composite(items) if !items.is_empty() => Ok(items[index.min(items.len() - 1)].clone()),
        other => Err(format!("cannot index into {other:?}")),
    }
}

fn value_at(value: &Value, path: &[usize]) -> Result<Value, String> {
    match path.split_first() {
        None => Ok(value.clone()),
        Some((index, rest)) => match value {
            Value::Composite(items) if !items.is_empty() => {
                value_at(&items[(*index).min(items.len() - 1)], rest)
            }
            _ => value_at(&index_value(value, *index)?, rest),
        },
    }
}

fn store_at(target: &mut Value, path: &[usize], new: Value) -> Result<(), String> {
    let Some((index, rest)) = path.split_first() else {
        *target = new;
        return Ok(());
    };
    match target {
        Value::Composite(items) if !items.is_empty() => {
            let i = (*index).min(items.len() - 1);
            store_at(&mut items[i], rest, new)
        }
        Value::Vector(v) if rest.is_empty() && !v.is_empty() => {
            let i = (*index).min(v.len() - 1);
            v[i] = new.as_f32()?;
            Ok(())
        }
        Value::Matrix {
            columns,
            rows,
            data,
        } if *columns > 0 => {
            let c = (*index).min(*columns - 1);
            match rest {
                [] => {
                    let column = new.components()?;
                    for (r, value) in column.into_iter().take(*rows).enumerate() {
                        data[c * *rows + r] = value;
                    }
                    Ok(())
                }
                [r] => {
                    let r = (*r).min(*rows - 1);
                    data[c * *rows + r] = new.as_f32()?;
                    Ok(())
                }
                _ => Err("matrix store path is too deep".to_string()),
            }
        }
        other => Err(format!("cannot store into {other:?}")),
    }
}

/// Rejects constructs the evaluator cannot run, with a readable reason.
pub fn check_supported(stage: &StageModule) -> Result<(), String> {
    let module = &stage.module;
    let entry = stage.entry_point();

    for argument in &entry.function.arguments {
        check_io(module, argument.ty, argument.binding.as_ref(), true)?;
    }
    if let Some(result) = &entry.function.result {
        check_io(module, result.ty, result.binding.as_ref(), false)?;
    }

    check_function(&entry.function)?;
    for (_, function) in module.functions.iter() {
        check_function(function)?;
    }
    Ok(())
}

fn check_io(
    module: &naga::Module,
    ty: Handle<naga::Type>,
    binding: Option<&Binding>,
    input: bool,
) -> Result<(), String> {
    match binding {
        Some(Binding::Location { .. }) => match &module.types[ty].inner {
            TypeInner::Scalar(_) | TypeInner::Vector { .. } => Ok(()),
            other => Err(format!("stage location of type {other:?}")),
        },
        Some(Binding::BuiltIn(builtin)) => {
            let supported = if input {
                matches!(
                    builtin,
                    BuiltIn::Position { .. }
                        | BuiltIn::VertexIndex
                        | BuiltIn::InstanceIndex
                        | BuiltIn::FrontFacing
                )
            } else {
                matches!(builtin, BuiltIn::Position { .. } | BuiltIn::FragDepth)
            };
            if supported {
                Ok(())
            } else {
                Err(format!("the {builtin:?} built-in"))
            }
        }
        None => match &module.types[ty].inner {
            TypeInner::Struct { members, .. } => {
                for member in members {
                    check_io(module, member.ty, member.binding.as_ref(), input)?;
                }
                Ok(())
            }
            other => Err(format!("entry point value of type {other:?} without a binding")),
        },
    }
}

fn check_function(function: &Function) -> Result<(), String> {
    for (_, expression) in function.expressions.iter() {
        let supported = match expression {
            Expression::Literal(_)
            | Expression::Constant(_)
            | Expression::ZeroValue(_)
            | Expression::Compose { .. }
            | Expression::Access { .. }
            | Expression::AccessIndex { .. }
            | Expression::Splat { .. }
            | Expression::Swizzle { .. }
            | Expression::FunctionArgument(_)
            | Expression::GlobalVariable(_)
            | Expression::LocalVariable(_)
            | Expression::Load { .. }
            | Expression::Unary { .. }
            | Expression::Binary { .. }
            | Expression::Select { .. }
            | Expression::CallResult(_) => true,
            Expression::ImageSample {
                gather, depth_ref, ..
            } => gather.is_none() && depth_ref.is_none(),
            Expression::Math { fun, .. } => math_supported(*fun),
            Expression::As { convert, .. } => convert.is_some(),
            _ => false,
        };
        if !supported {
            return Err(format!("the expression {expression:?}"));
        }
    }
    check_block(&function.body)
}

fn check_block(block: &naga::Block) -> Result<(), String> {
    for statement in block.iter() {
        match statement {
            Statement::Emit(_)
            | Statement::Break
            | Statement::Continue
            | Statement::Return { .. }
            | Statement::Kill
            | Statement::Store { .. }
            | Statement::Call { .. } => {}
            Statement::Block(inner) => check_block(inner)?,
            Statement::If { accept, reject, .. } => {
                check_block(accept)?;
                check_block(reject)?;
            }
            Statement::Switch { cases, .. } => {
                for case in cases {
                    check_block(&case.body)?;
                }
            }
            Statement::Loop {
                body, continuing, ..
            } => {
                check_block(body)?;
                check_block(continuing)?;
            }
            other => return Err(format!("the statement {other:?}")),
        }
    }
    Ok(())
}

fn math_supported(fun: MathFunction) -> bool {
    use MathFunction as M;
    matches!(
        fun,
        M::Abs
            | M::Min
            | M::Max
            | M::Clamp
            | M::Saturate
            | M::Cos
            | M::Sin
            | M::Tan
            | M::Acos
            | M::Asin
            | M::Atan
            | M::Atan2
            | M::Radians
            | M::Degrees
            | M::Ceil
            | M::Floor
            | M::Round
            | M::Fract
            | M::Trunc
            | M::Exp
            | M::Exp2
            | M::Log
            | M::Log2
            | M::Pow
            | M::Dot
            | M::Cross
            | M::Distance
            | M::Length
            | M::Normalize
            | M::Reflect
            | M::Sign
            | M::Fma
            | M::Mix
            | M::Step
            | M::SmoothStep
            | M::Sqrt
            | M::InverseSqrt
            | M::Transpose
    )
}

/// Runs a vertex entry point.
pub fn run_vertex(
    stage: &StageModule,
    resources: &ShaderResources,
    input: &VertexInvocation,
) -> Result<StageOutput, String> {
    let source = |binding: &Binding, inner: &TypeInner| -> Result<Value, String> {
        match binding {
            Binding::Location { location, .. } => {
                let attribute = input
                    .attributes
                    .iter()
                    .find(|(l, _)| l == location)
                    .map(|(_, v)| *v)
                    .unwrap_or([0.0, 0.0, 0.0, 1.0]);
                Ok(shape_location(inner, &attribute))
            }
            Binding::BuiltIn(BuiltIn::VertexIndex) => Ok(Value::Scalar(input.vertex_index as f32)),
            Binding::BuiltIn(BuiltIn::InstanceIndex) => {
                Ok(Value::Scalar(input.instance_index as f32))
            }
            Binding::BuiltIn(other) => Err(format!("{other:?} is not a vertex input")),
        }
    };
    run_entry(stage, resources, &source)?.ok_or_else(|| "vertex shader discarded".to_string())
}

/// Runs a fragment entry point. Returns `None` when the fragment is discarded.
pub fn run_fragment(
    stage: &StageModule,
    resources: &ShaderResources,
    input: &FragmentInvocation,
) -> Result<Option<StageOutput>, String> {
    let source = |binding: &Binding, inner: &TypeInner| -> Result<Value, String> {
        match binding {
            Binding::Location { location, .. } => {
                let varying = input
                    .varyings
                    .iter()
                    .find(|(l, _)| l == location)
                    .map(|(_, v)| v.as_slice())
                    .unwrap_or(&[]);
                Ok(shape_location(inner, varying))
            }
            Binding::BuiltIn(BuiltIn::Position { .. }) => Ok(Value::Vector(input.frag_coord.to_vec())),
            Binding::BuiltIn(BuiltIn::FrontFacing) => Ok(Value::Bool(input.front_facing)),
            Binding::BuiltIn(other) => Err(format!("{other:?} is not a fragment input")),
        }
    };
    run_entry(stage, resources, &source)
}

fn shape_location(inner: &TypeInner, components: &[f32]) -> Value {
    let get = |i: usize| components.get(i).copied().unwrap_or(0.0);
    match inner {
        TypeInner::Vector { size, .. } => Value::Vector((0..*size as usize).map(get).collect()),
        _ => Value::Scalar(get(0)),
    }
}

type InputSource<'s> = dyn Fn(&Binding, &TypeInner) -> Result<Value, String> + 's;

fn run_entry(
    stage: &StageModule,
    resources: &ShaderResources,
    source: &InputSource,
) -> Result<Option<StageOutput>, String> {
    let module = &stage.module;
    let entry = stage.entry_point();

    let mut args = Vec::with_capacity(entry.function.arguments.len());
    for argument in &entry.function.arguments {
        args.push(build_argument(module, argument.ty, argument.binding.as_ref(), source)?);
    }

    let mut invocation = Invocation {
        module,
        module_info: &stage.info,
        resources,
        depth: 0,
    };
    let info = stage.info.get_entry_point(stage.entry);
    match invocation.call(&entry.function, info, args)? {
        Outcome::Killed => Ok(None),
        Outcome::Returned(value) => {
            let mut output = StageOutput::default();
            if let (Some(result), Some(value)) = (&entry.function.result, value) {
                collect_output(module, result.ty, result.binding.as_ref(), value, &mut output)?;
            }
            Ok(Some(output))
        }
    }
}

fn build_argument(
    module: &naga::Module,
    ty: Handle<naga::Type>,
    binding: Option<&Binding>,
    source: &InputSource,
) -> Result<Value, String> {
    match binding {
        Some(binding) => source(binding, &module.types[ty].inner),
        None => match &module.types[ty].inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| build_argument(module, m.ty, m.binding.as_ref(), source))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Composite),
            _ => Err("entry point argument without a binding".to_string()),
        },
    }
}

fn collect_output(
    module: &naga::Module,
    ty: Handle<naga::Type>,
    binding: Option<&Binding>,
    value: Value,
    output: &mut StageOutput,
) -> Result<(), String> {
    match binding {
        Some(Binding::BuiltIn(BuiltIn::Position { .. })) => output.position = Some(value.to_vec4()?),
        Some(Binding::BuiltIn(BuiltIn::FragDepth)) => output.frag_depth = Some(value.as_f32()?),
        Some(Binding::BuiltIn(_)) => {}
        Some(Binding::Location { location, .. }) => {
            output.locations.push((*location, value.components()?));
        }
        None => {
            let TypeInner::Struct { members, .. } = &module.types[ty].inner else {
                return Err("entry point result without a binding".to_string());
            };
            let Value::Composite(items) = value else {
                return Err("entry point result is not a struct value".to_string());
            };
            for (member, item) in members.iter().zip(items) {
                collect_output(module, member.ty, member.binding.as_ref(), item, output)?;
            }
        }
    }
    Ok(())
}

enum Outcome {
    Returned(Option<Value>),
    Killed,
}

enum Flow {
    Next,
    Break,
    Continue,
    Return(Option<Value>),
    Kill,
}

struct Frame<'f> {
    function: &'f Function,
    info: &'f FunctionInfo,
    args: Vec<Value>,
    locals: Vec<Value>,
    cache: Vec<Option<Value>>,
}

struct Invocation<'a> {
    module: &'a naga::Module,
    module_info: &'a naga::valid::ModuleInfo,
    resources: &'a ShaderResources<'a>,
    depth: usize,
}

impl<'a> Invocation<'a> {
    fn call(&mut self, function: &'a Function, info: &'a FunctionInfo, args: Vec<Value>) -> Result<Outcome, String> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err("call depth exceeded".to_string());
        }
        self.depth += 1;

        let mut frame = Frame {
            function,
            info,
            args,
            locals: Vec::with_capacity(function.local_variables.len()),
            cache: vec![None; function.expressions.len()],
        };
        for (_, local) in function.local_variables.iter() {
            let initial = match local.init {
                Some(init) => self.eval(&mut frame, init)?,
                None => self.zero_value(local.ty)?,
            };
            frame.locals.push(initial);
        }

        let flow = self.block(&mut frame, &function.body);
        self.depth -= 1;
        Ok(match flow? {
            Flow::Return(value) => Outcome::Returned(value),
            Flow::Kill => Outcome::Killed,
            _ => Outcome::Returned(None),
        })
    }

    fn block(&mut self, frame: &mut Frame<'a>, block: &'a naga::Block) -> Result<Flow, String> {
        for statement in block.iter() {
            let flow = self.statement(frame, statement)?;
            if !matches!(flow, Flow::Next) {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn statement(&mut self, frame: &mut Frame<'a>, statement: &'a Statement) -> Result<Flow, String> {
        match statement {
            Statement::Emit(range) => {
                for handle in range.clone() {
                    let value = self.eval_uncached(frame, handle)?;
                    frame.cache[handle.index()] = Some(value);
                }
                Ok(Flow::Next)
            }
            Statement::Block(block) => self.block(frame, block),
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                if self.eval(frame, *condition)?.as_bool()? {
                    self.block(frame, accept)
                } else {
                    self.block(frame, reject)
                }
            }
            Statement::Switch { selector, cases } => {
                let selector = self.eval(frame, *selector)?.as_f32()? as i64;
                let start = cases
                    .iter()
                    .position(|case| match case.value {
                        SwitchValue::I32(v) => v as i64 == selector,
                        SwitchValue::U32(v) => v as i64 == selector,
                        SwitchValue::Default => false,
                    })
                    .or_else(|| cases.iter().position(|c| c.value == SwitchValue::Default));
                if let Some(start) = start {
                    for case in &cases[start..] {
                        match self.block(frame, &case.body)? {
                            Flow::Next if case.fall_through => continue,
                            Flow::Next | Flow::Break => break,
                            other => return Ok(other),
                        }
                    }
                }
                Ok(Flow::Next)
            }
            Statement::Loop {
                body,
                continuing,
                break_if,
            } => {
                for _ in 0..MAX_LOOP_ITERATIONS {
                    match self.block(frame, body)? {
                        Flow::Next | Flow::Continue => {}
                        Flow::Break => return Ok(Flow::Next),
                        other => return Ok(other),
                    }
                    match self.block(frame, continuing)? {
                        Flow::Next => {}
                        other => return Ok(other),
                    }
                    if let Some(condition) = break_if {
                        if self.eval(frame, *condition)?.as_bool()? {
                            return Ok(Flow::Next);
                        }
                    }
                }
                Err("loop iteration limit exceeded".to_string())
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Return { value } => {
                let value = match value {
                    Some(handle) => Some(self.eval(frame, *handle)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            Statement::Kill => Ok(Flow::Kill),
            Statement::Store { pointer, value } => {
                let Value::Pointer(pointer) = self.eval(frame, *pointer)? else {
                    return Err("store target is not a pointer".to_string());
                };
                let value = self.eval(frame, *value)?;
                match pointer.root {
                    PointerRoot::Local(local) => {
                        store_at(&mut frame.locals[local.index()], &pointer.path, value)
                    }
                    PointerRoot::Global(_) => Err("stores to global variables".to_string()),
                }?;
                Ok(Flow::Next)
            }
            Statement::Call {
                function,
                arguments,
                result,
            } => {
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.eval(frame, *argument)?);
                }
                let (module, module_info) = (self.module, self.module_info);
                let callee = &module.functions[*function];
                let callee_info = &module_info[*function];
                match self.call(callee, callee_info, args)? {
                    Outcome::Killed => Ok(Flow::Kill),
                    Outcome::Returned(value) => {
                        if let (Some(result), Some(value)) = (result, value) {
                            frame.cache[result.index()] = Some(value);
                        }
                        Ok(Flow::Next)
                    }
                }
            }
            other => Err(format!("unsupported statement {other:?}")),
        }
    }

    fn eval(&mut self, frame: &mut Frame<'a>, handle: Handle<Expression>) -> Result<Value, String> {
        if let Some(value) = &frame.cache[handle.index()] {
            return Ok(value.clone());
        }
        let value = self.eval_uncached(frame, handle)?;
        frame.cache[handle.index()] = Some(value.clone());
        Ok(value)
    }

    fn is_integer(&self, frame: &Frame<'a>, handle: Handle<Expression>) -> bool {
        matches!(
            frame.info[handle].ty.inner_with(&self.module.types).scalar_kind(),
            Some(ScalarKind::Sint | ScalarKind::Uint)
        )
    }

    fn eval_uncached(&mut self, frame: &mut Frame<'a>, handle: Handle<Expression>) -> Result<Value, String> {
        let function = frame.function;
        match &function.expressions[handle] {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Constant(constant) => {
                let init = self.module.constants[*constant].init;
                self.eval_global_expression(init)
            }
            Expression::ZeroValue(ty) => self.zero_value(*ty),
            Expression::Compose { ty, components } => {
                let mut values = Vec::with_capacity(components.len());
                for component in components {
                    values.push(self.eval(frame, *component)?);
                }
                self.compose(*ty, values)
            }
            Expression::Access { base, index } => {
                let index = self.eval(frame, *index)?.as_index()?;
                let base = self.eval(frame, *base)?;
                access(base, index)
            }
            Expression::AccessIndex { base, index } => {
                let base = self.eval(frame, *base)?;
                access(base, *index as usize)
            }
            Expression::Splat { size, value } => {
                let value = self.eval(frame, *value)?.as_f32()?;
                Ok(Value::Vector(vec![value; *size as usize]))
            }
            Expression::Swizzle {
                size,
                vector,
                pattern,
            } => {
                let components = self.eval(frame, *vector)?.components()?;
                let swizzled = pattern[..*size as usize]
                    .iter()
                    .map(|c| components.get(*c as usize).copied().unwrap_or(0.0))
                    .collect();
                Ok(Value::Vector(swizzled))
            }
            Expression::FunctionArgument(index) => frame
                .args
                .get(*index as usize)
                .cloned()
                .ok_or_else(|| format!("missing argument {index}")),
            Expression::GlobalVariable(global) => {
                let var = &self.module.global_variables[*global];
                match var.space {
                    AddressSpace::Handle => {
                        let slot = var
                            .binding
                            .as_ref()
                            .map(|b| BindingSlot {
                                group: b.group,
                                binding: b.binding,
                            })
                            .ok_or("resource without a binding")?;
                        match self.module.types[var.ty].inner {
                            TypeInner::Sampler { .. } => Ok(Value::Sampler(slot)),
                            _ => Ok(Value::Texture(slot)),
                        }
                    }
                    _ => Ok(Value::Pointer(Pointer {
                        root: PointerRoot::Global(*global),
                        path: Vec::new(),
                    })),
                }
            }
            Expression::LocalVariable(local) => Ok(Value::Pointer(Pointer {
                root: PointerRoot::Local(*local),
                path: Vec::new(),
            })),
            Expression::Load { pointer } => {
                let Value::Pointer(pointer) = self.eval(frame, *pointer)? else {
                    return Err("load from a non-pointer".to_string());
                };
                match pointer.root {
                    PointerRoot::Local(local) => value_at(&frame.locals[local.index()], &pointer.path),
                    PointerRoot::Global(global) => value_at(&self.global_value(global)?, &pointer.path),
                }
            }
            Expression::ImageSample {
                image,
                sampler,
                coordinate,
                ..
            } => {
                let Value::Texture(texture_slot) = self.eval(frame, *image)? else {
                    return Err("textureSample on a non-texture".to_string());
                };
                let Value::Sampler(sampler_slot) = self.eval(frame, *sampler)? else {
                    return Err("textureSample with a non-sampler".to_string());
                };
                let uv = self.eval(frame, *coordinate)?.components()?;
                let uv = [
                    uv.first().copied().unwrap_or(0.0),
                    uv.get(1).copied().unwrap_or(0.0),
                ];
                let sampler = self
                    .resources
                    .samplers
                    .get(&sampler_slot)
                    .copied()
                    .unwrap_or_default();
                let texel = match self.resources.textures.get(&texture_slot) {
                    Some(texture) => sample_texture(texture, &sampler, uv),
                    None => [1.0, 1.0, 1.0, 1.0],
                };
                Ok(Value::Vector(texel.to_vec()))
            }
            Expression::Unary { op, expr } => {
                let value = self.eval(frame, *expr)?;
                match op {
                    UnaryOperator::Negate => {
                        let negated = value.components()?.into_iter().map(|v| -v).collect();
                        Ok(value.with_components(negated))
                    }
                    UnaryOperator::LogicalNot => Ok(Value::Bool(!value.as_bool()?)),
                    UnaryOperator::BitwiseNot => {
                        let flipped = value
                            .components()?
                            .into_iter()
                            .map(|v| !(v as i64) as f32)
                            .collect();
                        Ok(value.with_components(flipped))
                    }
                }
            }
            Expression::Binary { op, left, right } => {
                let integer = self.is_integer(frame, handle);
                let l = self.eval(frame, *left)?;
                let r = self.eval(frame, *right)?;
                binary(*op, l, r, integer)
            }
            Expression::Select {
                condition,
                accept,
                reject,
            } => {
                if self.eval(frame, *condition)?.as_bool()? {
                    self.eval(frame, *accept)
                } else {
                    self.eval(frame, *reject)
                }
            }
            Expression::Math {
                fun,
                arg,
                arg1,
                arg2,
                ..
            } => {
                let a = self.eval(frame, *arg)?;
                let b = match arg1 {
                    Some(h) => Some(self.eval(frame, *h)?),
                    None => None,
                };
                let c = match arg2 {
                    Some(h) => Some(self.eval(frame, *h)?),
                    None => None,
                };
                math(*fun, a, b, c)
            }
            Expression::As { expr, kind, .. } => {
                let value = self.eval(frame, *expr)?;
                convert(value, *kind)
            }
            Expression::CallResult(_) => Err("call result read before the call".to_string()),
            other => Err(format!("unsupported expression {other:?}")),
        }
    }

    /// Evaluates a constant expression from the module's global arena.
    fn eval_global_expression(&self, handle: Handle<Expression>) -> Result<Value, String> {
        match &self.module.global_expressions[handle] {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Constant(constant) => {
                self.eval_global_expression(self.module.constants[*constant].init)
            }
            Expression::ZeroValue(ty) => self.zero_value(*ty),
            Expression::Compose { ty, components } => {
                let values = components
                    .iter()
                    .map(|c| self.eval_global_expression(*c))
                    .collect::<Result<Vec<_>, _>>()?;
                self.compose(*ty, values)
            }
            Expression::Splat { size, value } => {
                let value = self.eval_global_expression(*value)?.as_f32()?;
                Ok(Value::Vector(vec![value; *size as usize]))
            }
            other => Err(format!("unsupported constant expression {other:?}")),
        }
    }

    fn global_value(&self, global: Handle<naga::GlobalVariable>) -> Result<Value, String> {
        let var = &self.module.global_variables[global];
        match var.space {
            AddressSpace::Uniform => {
                let slot = var
                    .binding
                    .as_ref()
                    .map(|b| BindingSlot {
                        group: b.group,
                        binding: b.binding,
                    })
                    .ok_or("uniform without a binding")?;
                let bytes = self.resources.uniform_buffers.get(&slot).copied().unwrap_or(&[]);
                self.decode(var.ty, bytes, 0)
            }
            AddressSpace::Private => match var.init {
                Some(init) => self.eval_global_expression(init),
                None => self.zero_value(var.ty),
            },
            other => Err(format!("reads from the {other:?} address space")),
        }
    }

    /// Decodes a value of type `ty` from uniform buffer bytes.
    fn decode(&self, ty: Handle<naga::Type>, bytes: &[u8], offset: usize) -> Result<Value, String> {
        let read = |at: usize, kind: ScalarKind| -> f32 {
            let raw = bytes
                .get(at..at + 4)
                .map(|b| [b[0], b[1], b[2], b[3]])
                .unwrap_or([0; 4]);
            match kind {
                ScalarKind::Sint => i32::from_le_bytes(raw) as f32,
                ScalarKind::Uint | ScalarKind::Bool => u32::from_le_bytes(raw) as f32,
                _ => f32::from_le_bytes(raw),
            }
        };
        match &self.module.types[ty].inner {
            TypeInner::Scalar(scalar) => Ok(Value::Scalar(read(offset, scalar.kind))),
            TypeInner::Vector { size, scalar } => Ok(Value::Vector(
                (0..*size as usize)
                    .map(|i| read(offset + i * 4, scalar.kind))
                    .collect(),
            )),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let (columns, rows) = (*columns as usize, *rows as usize);
                let column_stride = if rows == 2 { 8 } else { 16 };
                let mut data = Vec::with_capacity(columns * rows);
                for c in 0..columns {
                    for r in 0..rows {
                        data.push(read(offset + c * column_stride + r * 4, scalar.kind));
                    }
                }
                Ok(Value::Matrix {
                    columns,
                    rows,
                    data,
                })
            }
            TypeInner::Array {
                base,
                size: naga::ArraySize::Constant(count),
                stride,
            } => (0..count.get() as usize)
                .map(|i| self.decode(*base, bytes, offset + i * *stride as usize))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Composite),
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| self.decode(m.ty, bytes, offset + m.offset as usize))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Composite),
            other => Err(format!("uniform of type {other:?}")),
        }
    }

    fn zero_value(&self, ty: Handle<naga::Type>) -> Result<Value, String> {
        match &self.module.types[ty].inner {
            TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Bool => Ok(Value::Bool(false)),
            TypeInner::Scalar(_) => Ok(Value::Scalar(0.0)),
            TypeInner::Vector { size, .. } => Ok(Value::Vector(vec![0.0; *size as usize])),
            TypeInner::Matrix { columns, rows, .. } => Ok(Value::Matrix {
                columns: *columns as usize,
                rows: *rows as usize,
                data: vec![0.0; *columns as usize * *rows as usize],
            }),
            TypeInner::Array {
                base,
                size: naga::ArraySize::Constant(count),
                ..
            } => {
                let element = self.zero_value(*base)?;
                Ok(Value::Composite(vec![element; count.get() as usize]))
            }
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| self.zero_value(m.ty))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Composite),
            other => Err(format!("values of type {other:?}")),
        }
    }

    fn compose(&self, ty: Handle<naga::Type>, values: Vec<Value>) -> Result<Value, String> {
        match &self.module.types[ty].inner {
            TypeInner::Vector { .. } => {
                let mut components = Vec::with_capacity(4);
                for value in &values {
                    components.extend(value.components()?);
                }
                Ok(Value::Vector(components))
            }
            TypeInner::Matrix { columns, rows, .. } => {
                let mut data = Vec::with_capacity(*columns as usize * *rows as usize);
                for value in &values {
                    data.extend(value.components()?);
                }
                Ok(Value::Matrix {
                    columns: *columns as usize,
                    rows: *rows as usize,
                    data,
                })
            }
            _ => Ok(Value::Composite(values)),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match *literal {
        Literal::F16(v) => Value::Scalar(v.to_f32()),
        Literal::F32(v) => Value::Scalar(v),
        Literal::F64(v) => Value::Scalar(v as f32),
        Literal::U32(v) => Value::Scalar(v as f32),
        Literal::I32(v) => Value::Scalar(v as f32),
        Literal::U64(v) => Value::Scalar(v as f32),
        Literal::I64(v) => Value::Scalar(v as f32),
        Literal::Bool(v) => Value::Bool(v),
        Literal::AbstractInt(v) => Value::Scalar(v as f32),
        Literal::AbstractFloat(v) => Value::Scalar(v as f32),
    }
}

fn access(base: Value, index: usize) -> Result<Value, String> {
    match base {
        Value::Pointer(mut pointer) => {
            pointer.path.push(index);
            Ok(Value::Pointer(pointer))
        }
        other => index_value(&other, index),
    }
}

fn convert(value: Value, kind: ScalarKind) -> Result<Value, String> {
    match kind {
        ScalarKind::Bool => Ok(Value::Bool(value.as_f32()? != 0.0)),
        ScalarKind::Sint => {
            let c = value.components()?.into_iter().map(f32::trunc).collect();
            Ok(value.with_components(c))
        }
        ScalarKind::Uint => {
            let c = value
                .components()?
                .into_iter()
                .map(|v| v.trunc().max(0.0))
                .collect();
            Ok(value.with_components(c))
        }
        _ => {
            let c = value.components()?;
            Ok(value.with_components(c))
        }
    }
}

fn binary(op: BinaryOperator, l: Value, r: Value, integer: bool) -> Result<Value, String> {
    use BinaryOperator as B;
    match op {
        B::Equal | B::NotEqual | B::Less | B::LessEqual | B::Greater | B::GreaterEqual => {
            let (a, b) = (l.as_f32()?, r.as_f32()?);
            Ok(Value::Bool(match op {
                B::Equal => a == b,
                B::NotEqual => a != b,
                B::Less => a < b,
                B::LessEqual => a <= b,
                B::Greater => a > b,
                _ => a >= b,
            }))
        }
        B::LogicalAnd => Ok(Value::Bool(l.as_bool()? && r.as_bool()?)),
        B::LogicalOr => Ok(Value::Bool(l.as_bool()? || r.as_bool()?)),
        B::And | B::InclusiveOr if matches!(l, Value::Bool(_)) => {
            let (a, b) = (l.as_bool()?, r.as_bool()?);
            Ok(Value::Bool(if op == B::And { a & b } else { a | b }))
        }
        B::Multiply => multiply(l, r),
        _ => {
            let f: fn(f32, f32) -> f32 = match op {
                B::Add => |a, b| a + b,
                B::Subtract => |a, b| a - b,
                B::Divide if integer => |a, b| if b == 0.0 { a } else { (a / b).trunc() },
                B::Divide => |a, b| a / b,
                B::Modulo if integer => |a, b| if b == 0.0 { 0.0 } else { a % b },
                B::Modulo => |a, b| a % b,
                B::And => |a, b| (a as i64 & b as i64) as f32,
                B::InclusiveOr => |a, b| (a as i64 | b as i64) as f32,
                B::ExclusiveOr => |a, b| (a as i64 ^ b as i64) as f32,
                B::ShiftLeft => |a, b| ((a as i64) << (b as u32 & 31)) as u32 as f32,
                B::ShiftRight => |a, b| ((a as i64) >> (b as u32 & 31)) as f32,
                _ => return Err(format!("binary operator {op:?}")),
            };
            zip_map(&l, &r, f)
        }
    }
}

/// Applies `f` componentwise, broadcasting scalars.
fn zip_map(l: &Value, r: &Value, f: impl Fn(f32, f32) -> f32) -> Result<Value, String> {
    let (a, b) = (l.components()?, r.components()?);
    let shape = if a.len() >= b.len() { l } else { r };
    let len = a.len().max(b.len());
    let get = |v: &[f32], i: usize| if v.len() == 1 { v[0] } else { v.get(i).copied().unwrap_or(0.0) };
    let out = (0..len).map(|i| f(get(&a, i), get(&b, i))).collect();
    Ok(shape.with_components(out))
}

fn multiply(l: Value, r: Value) -> Result<Value, String> {
    match (&l, &r) {
        (
            Value::Matrix {
                columns,
                rows,
                data,
            },
            Value::Vector(v),
        ) => {
            let mut out = vec![0.0; *rows];
            for (c, scale) in v.iter().take(*columns).enumerate() {
                for (r, value) in out.iter_mut().enumerate() {
                    *value += data[c * rows + r] * scale;
                }
            }
            Ok(Value::Vector(out))
        }
        (
            Value::Vector(v),
            Value::Matrix {
                columns,
                rows,
                data,
            },
        ) => {
            let out = (0..*columns)
                .map(|c| (0..*rows).map(|r| v.get(r).copied().unwrap_or(0.0) * data[c * rows + r]).sum())
                .collect();
            Ok(Value::Vector(out))
        }
        (
            Value::Matrix {
                rows: a_rows,
                data: a,
                columns: a_columns,
            },
            Value::Matrix {
                columns: b_columns,
                data: b,
                ..
            },
        ) => {
            let mut data = vec![0.0; b_columns * a_rows];
            for c in 0..*b_columns {
                for r in 0..*a_rows {
                    data[c * a_rows + r] = (0..*a_columns)
                        .map(|k| a[k * a_rows + r] * b[c * a_columns + k])
                        .sum();
                }
            }
            Ok(Value::Matrix {
                columns: *b_columns,
                rows: *a_rows,
                data,
            })
        }
        _ => zip_map(&l, &r, |a, b| a * b),
    }
}

fn math(fun: MathFunction, a: Value, b: Option<Value>, c: Option<Value>) -> Result<Value, String> {
    use MathFunction as M;
    let b_value = || b.clone().ok_or_else(|| format!("{fun:?} needs a second argument"));
    let c_value = || c.clone().ok_or_else(|| format!("{fun:?} needs a third argument"));
    let unary = |f: fn(f32) -> f32| -> Result<Value, String> {
        let out = a.components()?.into_iter().map(f).collect();
        Ok(a.with_components(out))
    };

    match fun {
        M::Abs => unary(f32::abs),
        M::Saturate => unary(|v| v.clamp(0.0, 1.0)),
        M::Cos => unary(f32::cos),
        M::Sin => unary(f32::sin),
        M::Tan => unary(f32::tan),
        M::Acos => unary(f32::acos),
        M::Asin => unary(f32::asin),
        M::Atan => unary(f32::atan),
        M::Radians => unary(f32::to_radians),
        M::Degrees => unary(f32::to_degrees),
        M::Ceil => unary(f32::ceil),
        M::Floor => unary(f32::floor),
        M::Round => unary(f32::round_ties_even),
        M::Fract => unary(|v| v - v.floor()),
        M::Trunc => unary(f32::trunc),
        M::Exp => unary(f32::exp),
        M::Exp2 => unary(f32::exp2),
        M::Log => unary(f32::ln),
        M::Log2 => unary(f32::log2),
        M::Sqrt => unary(f32::sqrt),
        M::InverseSqrt => unary(|v| 1.0 / v.sqrt()),
        M::Sign => unary(|v| if v > 0.0 { 1.0 } else if v < 0.0 { -1.0 } else { 0.0 }),
        M::Min => zip_map(&a, &b_value()?, f32::min),
        M::Max => zip_map(&a, &b_value()?, f32::max),
        M::Atan2 => zip_map(&a, &b_value()?, f32::atan2),
        M::Pow => zip_map(&a, &b_value()?, f32::powf),
        M::Step => zip_map(&a, &b_value()?, |edge, x| if x >= edge { 1.0 } else { 0.0 }),
        M::Clamp => {
            let low = zip_map(&a, &b_value()?, f32::max)?;
            zip_map(&low, &c_value()?, f32::min)
        }
        M::Mix => {
            let (x, y, t) = (a.components()?, b_value()?.components()?, c_value()?.components()?);
            let t_at = |i: usize| if t.len() == 1 { t[0] } else { t.get(i).copied().unwrap_or(0.0) };
            let out = x
                .iter()
                .zip(&y)
                .enumerate()
                .map(|(i, (x, y))| x * (1.0 - t_at(i)) + y * t_at(i))
                .collect();
            Ok(a.with_components(out))
        }
        M::SmoothStep => {
            let (e0, e1, x) = (a.components()?, b_value()?.components()?, c_value()?);
            let xs = x.components()?;
            let at = |v: &[f32], i: usize| if v.len() == 1 { v[0] } else { v.get(i).copied().unwrap_or(0.0) };
            let out = xs
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let t = ((v - at(&e0, i)) / (at(&e1, i) - at(&e0, i))).clamp(0.0, 1.0);
                    t * t * (3.0 - 2.0 * t)
                })
                .collect();
            Ok(x.with_components(out))
        }
        M::Fma => {
            let product = zip_map(&a, &b_value()?, |x, y| x * y)?;
            zip_map(&product, &c_value()?, |x, y| x + y)
        }
        M::Dot => {
            let (x, y) = (a.components()?, b_value()?.components()?);
            Ok(Value::Scalar(x.iter().zip(&y).map(|(x, y)| x * y).sum()))
        }
        M::Cross => {
            let (x, y) = (a.components()?, b_value()?.components()?);
            if x.len() < 3 || y.len() < 3 {
                return Err("cross needs 3-component vectors".to_string());
            }
            Ok(Value::Vector(vec![
                x[1] * y[2] - x[2] * y[1],
                x[2] * y[0] - x[0] * y[2],
                x[0] * y[1] - x[1] * y[0],
            ]))
        }
        M::Length => Ok(Value::Scalar(length(&a.components()?))),
        M::Distance => {
            let difference = zip_map(&a, &b_value()?, |x, y| x - y)?;
            Ok(Value::Scalar(length(&difference.components()?)))
        }
        M::Normalize => {
            let components = a.components()?;
            let len = length(&components);
            let out = components
                .into_iter()
                .map(|v| if len > 0.0 { v / len } else { 0.0 })
                .collect();
            Ok(a.with_components(out))
        }
        M::Reflect => {
            let (i, n) = (a.components()?, b_value()?.components()?);
            let d: f32 = i.iter().zip(&n).map(|(x, y)| x * y).sum();
            let out = i.iter().zip(&n).map(|(i, n)| i - 2.0 * d * n).collect();
            Ok(a.with_components(out))
        }
        M::Transpose => match a {
            Value::Matrix {
                columns,
                rows,
                data,
            } => {
                let mut out = vec![0.0; columns * rows];
                for c in 0..columns {
                    for r in 0..rows {
                        out[r * columns + c] = data[c * rows + r];
                    }
                }
                Ok(Value::Matrix {
                    columns: rows,
                    rows: columns,
                    data: out,
                })
            }
            other => Err(format!("transpose of {other:?}")),
        },
        other => Err(format!("math function {other:?}")),
    }
}

fn length(components: &[f32]) -> f32 {
    components.iter().map(|v| v * v).sum::<f32>().sqrt()
}
