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

//! Fixed-function state carried by each draw command.
//!
//! Nothing here persists between commands: every draw states its own depth,
//! cull and blend configuration.

use crate::renderer::api::common::Color;
use crate::vesta_bitflags;

/// Depth test applied to incoming fragments.
///
/// `None` disables both the depth test and depth writes. Every other value
/// tests incoming depth against the stored depth and writes on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthCompare {
    #[default]
    None,
    Always,
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
}

impl DepthCompare {
    /// `true` if the comparison writes depth (every mode except `None`).
    pub const fn writes_depth(self) -> bool {
        !matches!(self, DepthCompare::None)
    }

    /// Evaluates the comparison for an incoming depth against the stored one.
    pub fn passes(self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthCompare::None | DepthCompare::Always => true,
            DepthCompare::Never => false,
            DepthCompare::Less => incoming < stored,
            DepthCompare::Equal => incoming == stored,
            DepthCompare::LessOrEqual => incoming <= stored,
            DepthCompare::Greater => incoming > stored,
            DepthCompare::NotEqual => incoming != stored,
            DepthCompare::GreaterOrEqual => incoming >= stored,
        }
    }
}

/// Which triangle faces are discarded. Counter-clockwise triangles are front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// How the source and destination terms of a blend are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// A multiplier applied to the source or destination of a blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

vesta_bitflags! {
    /// Color channels a draw is allowed to write.
    pub struct BlendMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const RGB = (1 << 0) | (1 << 1) | (1 << 2);
        const RGBA = (1 << 0) | (1 << 1) | (1 << 2) | (1 << 3);
    }
}

/// Blend equation for color writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode {
    pub color_op: BlendOp,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub alpha_op: BlendOp,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    pub mask: BlendMask,
    /// Used by the `ConstantColor` factors.
    pub constant: Color,
}

impl BlendMode {
    /// Builds a mode using the same operation and factors for color and alpha.
    pub const fn uniform(op: BlendOp, src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            color_op: op,
            color_src: src,
            color_dst: dst,
            alpha_op: op,
            alpha_src: src,
            alpha_dst: dst,
            mask: BlendMask::RGBA,
            constant: Color::WHITE,
        }
    }

    /// Source colors are already multiplied by their alpha.
    pub const PREMULTIPLY: BlendMode =
        BlendMode::uniform(BlendOp::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
    /// Classic alpha blending.
    pub const NON_PREMULTIPLY: BlendMode = BlendMode::uniform(
        BlendOp::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
    );
    pub const ADD: BlendMode = BlendMode::uniform(BlendOp::Add, BlendFactor::One, BlendFactor::One);
    pub const SUBTRACT: BlendMode =
        BlendMode::uniform(BlendOp::ReverseSubtract, BlendFactor::One, BlendFactor::One);
    pub const MULTIPLY: BlendMode = BlendMode::uniform(
        BlendOp::Add,
        BlendFactor::DstColor,
        BlendFactor::OneMinusSrcAlpha,
    );
    pub const SCREEN: BlendMode =
        BlendMode::uniform(BlendOp::Add, BlendFactor::One, BlendFactor::OneMinusSrcColor);
    /// Overwrites the destination.
    pub const OPAQUE: BlendMode = BlendMode::uniform(BlendOp::Add, BlendFactor::One, BlendFactor::Zero);

    /// Blends one normalized source color over a destination color.
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let constant = self.constant.to_f32_array();
        let mut out = [0.0; 4];
        for (channel, value) in out.iter_mut().enumerate() {
            let (op, sf, df) = if channel < 3 {
                (self.color_op, self.color_src, self.color_dst)
            } else {
                (self.alpha_op, self.alpha_src, self.alpha_dst)
            };
            let s = src[channel] * factor(sf, channel, src, dst, constant);
            let d = dst[channel] * factor(df, channel, src, dst, constant);
            let blended = match op {
                BlendOp::Add => s + d,
                BlendOp::Subtract => s - d,
                BlendOp::ReverseSubtract => d - s,
                BlendOp::Min => src[channel].min(dst[channel]),
                BlendOp::Max => src[channel].max(dst[channel]),
            };
            *value = blended.clamp(0.0, 1.0);
        }
        let channels = [BlendMask::RED, BlendMask::GREEN, BlendMask::BLUE, BlendMask::ALPHA];
        for (channel, flag) in channels.iter().enumerate() {
            if !self.mask.contains(*flag) {
                out[channel] = dst[channel];
            }
        }
        out
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::PREMULTIPLY
    }
}

fn factor(f: BlendFactor, channel: usize, src: [f32; 4], dst: [f32; 4], constant: [f32; 4]) -> f32 {
    match f {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcColor => src[channel],
        BlendFactor::OneMinusSrcColor => 1.0 - src[channel],
        BlendFactor::DstColor => dst[channel],
        BlendFactor::OneMinusDstColor => 1.0 - dst[channel],
        BlendFactor::SrcAlpha => src[3],
        BlendFactor::OneMinusSrcAlpha => 1.0 - src[3],
        BlendFactor::DstAlpha => dst[3],
        BlendFactor::OneMinusDstAlpha => 1.0 - dst[3],
        BlendFactor::ConstantColor => constant[channel],
        BlendFactor::OneMinusConstantColor => 1.0 - constant[channel],
        BlendFactor::SrcAlphaSaturate => {
            if channel == 3 {
                1.0
            } else {
                src[3].min(1.0 - dst[3])
            }
        }
    }
}

vesta_bitflags! {
    /// Planes affected by a clear.
    pub struct ClearMask: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}
