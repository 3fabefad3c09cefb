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

//! Small value types shared by descriptors and commands.

use bytemuck::{Pod, Zeroable};

/// An integer rectangle in pixels, with the origin at the top-left of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// A rectangle covering a whole `width` x `height` surface. Sizes beyond
    /// `i32::MAX` are clamped.
    pub fn from_size(width: u32, height: u32) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self::new(0, 0, clamp(width), clamp(height))
    }

    /// One past the last column, saturating at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// One past the last row, saturating at `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// `true` if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// The overlapping area of two rectangles, possibly empty.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(
            x,
            y,
            right.saturating_sub(x).max(0),
            bottom.saturating_sub(y).max(0),
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }
}

/// An 8-bit-per-channel RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as normalized floats in `[0, 1]`.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Builds a color from normalized floats, clamping and rounding each channel.
    pub fn from_f32_array(c: [f32; 4]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        Self::rgba(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_overlapping_rects() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
    }

    #[test]
    fn intersect_disjoint_rects_is_empty() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(8, 8, 4, 4);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn edges_saturate_instead_of_overflowing() {
        let unbounded = Rect::new(1, 1, i32::MAX, i32::MAX);
        assert_eq!(unbounded.right(), i32::MAX);
        assert_eq!(unbounded.bottom(), i32::MAX);
        assert_eq!(unbounded.intersect(&Rect::from_size(4, 4)), Rect::new(1, 1, 3, 3));

        let huge = Rect::from_size(u32::MAX, 8);
        assert_eq!(huge, Rect::new(0, 0, i32::MAX, 8));
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::from_size(4, 4);
        assert!(r.contains(0, 0));
        assert!(r.contains(3, 3));
        assert!(!r.contains(4, 0));
    }

    #[test]
    fn color_float_conversion_round_trips_extremes() {
        assert_eq!(Color::from_f32_array(Color::RED.to_f32_array()), Color::RED);
        assert_eq!(Color::from_f32_array([2.0, -1.0, 0.5, 1.0]), Color::rgba(255, 0, 128, 255));
    }
}
