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


//! Per-frame statistics reported by render devices.

/// Counters accumulated over a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// The number of draw commands executed in the frame.
    pub draw_calls: u32,
    /// The number of clear commands executed in the frame.
    pub clear_calls: u32,
    /// Vertices fed to the vertex stage, summed over all instances.
    pub vertices_submitted: u64,
    /// Instances issued, summed over all draws.
    pub instances_submitted: u64,
    /// Triangles assembled, summed over all instances.
    pub triangles_rendered: u64,
}

impl RenderStats {
    /// Records one draw of `vertices` vertices repeated `instances` times.
    pub fn record_draw(&mut self, vertices: u32, instances: u32) {
        self.draw_calls += 1;
        self.instances_submitted += instances as u64;
        self.vertices_submitted += vertices as u64 * instances as u64;
        self.triangles_rendered += (vertices / 3) as u64 * instances as u64;
    }

    pub fn record_clear(&mut self) {
        self.clear_calls += 1;
    }

    /// Resets the counters for a new frame.
    pub fn begin_frame(&mut self, frame_number: u64) {
        *self = RenderStats {
            frame_number,
            ..RenderStats::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_accumulate_per_instance() {
        let mut stats = RenderStats::default();
        stats.record_draw(6, 1);
        stats.record_draw(3, 4);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.instances_submitted, 5);
        assert_eq!(stats.vertices_submitted, 18);
        assert_eq!(stats.triangles_rendered, 6);
    }

    #[test]
    fn begin_frame_resets_counters() {
        let mut stats = RenderStats::default();
        stats.record_clear();
        stats.begin_frame(7);
        assert_eq!(stats, RenderStats { frame_number: 7, ..Default::default() });
    }
}
