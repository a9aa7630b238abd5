// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

/// Triangle produced by simplex reduction.
///
/// This must be kept in sync with the reduce, binning and fine kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct Triangle {
    /// Vertices as `[x, y, depth]` in normalized device coordinates.
    pub points: [[f32; 3]; 3],
    /// Packed RGBA8 vertex colors.
    pub colors: [u32; 3],
    /// Depth ordering key: the best vertex depth under the active comparison.
    pub key: f32,
    pub flags: u32,
}

impl Triangle {
    /// At least one vertex was behind the eye or otherwise not finite.
    pub const FLAG_CULLED: u32 = 1;
    /// Reduced from a point or a line. Thin triangles have no area and are
    /// rasterized as a segment from the first to the last vertex.
    pub const FLAG_THIN: u32 = 2;

    pub fn is_culled(&self) -> bool {
        self.flags & Self::FLAG_CULLED != 0
    }

    pub fn is_thin(&self) -> bool {
        self.flags & Self::FLAG_THIN != 0
    }

    pub fn depths(&self) -> [f32; 3] {
        [self.points[0][2], self.points[1][2], self.points[2][2]]
    }
}
