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

//! The two commands of the submission protocol.
//!
//! Each command is a self-contained description of one GPU operation. They
//! are executed synchronously and in submission order.

use super::common::{Color, Rect};
use super::handle::{MeshId, RenderTargetId, ShaderId};
use super::state::{BlendMode, ClearMask, CullMode, DepthCompare};

/// Draws a range of a mesh with a shader into a target.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// The render target, or `None` for the window's backbuffer.
    pub target: Option<RenderTargetId>,
    pub mesh: MeshId,
    pub shader: ShaderId,
    /// Viewport in target pixels. `None` covers the whole target.
    pub viewport: Option<Rect>,
    /// Scissor in target pixels. `None` disables scissoring.
    pub scissor: Option<Rect>,
    /// First index (or vertex, for meshes without an index buffer) to draw.
    pub index_start: u32,
    /// Number of indices (or vertices) to draw.
    pub index_count: u32,
    /// 0 or 1 draws once; k > 1 draws k instances.
    pub instance_count: u32,
    pub compare: DepthCompare,
    pub cull: CullMode,
    pub blend: BlendMode,
}

impl DrawCommand {
    /// A draw of `index_count` indices from the start of the mesh into the backbuffer.
    pub fn new(mesh: MeshId, shader: ShaderId, index_count: u32) -> Self {
        Self {
            target: None,
            mesh,
            shader,
            viewport: None,
            scissor: None,
            index_start: 0,
            index_count,
            instance_count: 0,
            compare: DepthCompare::None,
            cull: CullMode::None,
            blend: BlendMode::default(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: RenderTargetId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    #[must_use]
    pub fn with_scissor(mut self, scissor: Rect) -> Self {
        self.scissor = Some(scissor);
        self
    }

    #[must_use]
    pub fn with_range(mut self, index_start: u32, index_count: u32) -> Self {
        self.index_start = index_start;
        self.index_count = index_count;
        self
    }

    #[must_use]
    pub fn with_instances(mut self, instance_count: u32) -> Self {
        self.instance_count = instance_count;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, compare: DepthCompare) -> Self {
        self.compare = compare;
        self
    }

    #[must_use]
    pub fn with_cull(mut self, cull: CullMode) -> Self {
        self.cull = cull;
        self
    }

    #[must_use]
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// The number of instances actually issued.
    pub fn instances(&self) -> u32 {
        self.instance_count.max(1)
    }

    /// Resolves the viewport against the target's bounds.
    pub fn resolved_viewport(&self, target_bounds: Rect) -> Rect {
        self.viewport.unwrap_or(target_bounds)
    }

    /// The pixels this draw may touch: target bounds, viewport and scissor intersected.
    pub fn clip_rect(&self, target_bounds: Rect) -> Rect {
        let mut rect = target_bounds.intersect(&self.resolved_viewport(target_bounds));
        if let Some(scissor) = &self.scissor {
            rect = rect.intersect(scissor);
        }
        rect
    }
}

/// Clears planes of a target to fixed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearCommand {
    /// The render target, or `None` for the window's backbuffer.
    pub target: Option<RenderTargetId>,
    /// Region to clear. `None` clears the whole target.
    pub clip: Option<Rect>,
    pub color: Color,
    /// Depth value in `[0, 1]`.
    pub depth: f32,
    pub stencil: u8,
    /// Planes to clear. Planes the target lacks are ignored.
    pub mask: ClearMask,
}

impl ClearCommand {
    /// Clears the backbuffer's color to `color`.
    pub fn color(color: Color) -> Self {
        Self {
            target: None,
            clip: None,
            color,
            depth: 1.0,
            stencil: 0,
            mask: ClearMask::COLOR,
        }
    }

    /// Clears every plane of the backbuffer.
    pub fn all(color: Color, depth: f32, stencil: u8) -> Self {
        Self {
            target: None,
            clip: None,
            color,
            depth,
            stencil,
            mask: ClearMask::all(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: RenderTargetId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_clip(mut self, clip: Rect) -> Self {
        self.clip = Some(clip);
        self
    }

    #[must_use]
    pub fn with_mask(mut self, mask: ClearMask) -> Self {
        self.mask = mask;
        self
    }

    /// The pixels cleared within a target of the given bounds.
    pub fn clip_rect(&self, target_bounds: Rect) -> Rect {
        match &self.clip {
            Some(clip) => target_bounds.intersect(clip),
            None => target_bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_count_zero_and_one_draw_once() {
        let draw = DrawCommand::new(MeshId(1), ShaderId(1), 3);
        assert_eq!(draw.instances(), 1);
        assert_eq!(draw.clone().with_instances(1).instances(), 1);
        assert_eq!(draw.with_instances(4).instances(), 4);
    }

    #[test]
    fn missing_viewport_is_the_full_target() {
        let bounds = Rect::from_size(8, 8);
        let implicit = DrawCommand::new(MeshId(1), ShaderId(1), 3);
        let explicit = implicit.clone().with_viewport(bounds);
        assert_eq!(implicit.resolved_viewport(bounds), explicit.resolved_viewport(bounds));
        assert_eq!(implicit.clip_rect(bounds), bounds);
    }

    #[test]
    fn scissor_narrows_the_clip_rect() {
        let bounds = Rect::from_size(8, 8);
        let draw = DrawCommand::new(MeshId(1), ShaderId(1), 3).with_scissor(Rect::new(6, 6, 10, 10));
        assert_eq!(draw.clip_rect(bounds), Rect::new(6, 6, 2, 2));
    }

    #[test]
    fn unbounded_scissor_and_clip_keep_their_origin() {
        let bounds = Rect::from_size(4, 4);
        let unbounded = Rect::new(1, 1, i32::MAX, i32::MAX);
        let draw = DrawCommand::new(MeshId(1), ShaderId(1), 3).with_scissor(unbounded);
        assert_eq!(draw.clip_rect(bounds), Rect::new(1, 1, 3, 3));
        let draw = DrawCommand::new(MeshId(1), ShaderId(1), 3).with_viewport(unbounded);
        assert_eq!(draw.clip_rect(bounds), Rect::new(1, 1, 3, 3));
        let clear = ClearCommand::color(Color::RED).with_clip(unbounded);
        assert_eq!(clear.clip_rect(bounds), Rect::new(1, 1, 3, 3));
    }

    #[test]
    fn clear_clip_is_bounded_by_target() {
        let clear = ClearCommand::color(Color::RED).with_clip(Rect::new(-2, -2, 4, 4));
        assert_eq!(clear.clip_rect(Rect::from_size(4, 4)), Rect::new(0, 0, 2, 2));
        assert_eq!(ClearCommand::color(Color::RED).clip_rect(Rect::from_size(4, 4)), Rect::from_size(4, 4));
    }
}
