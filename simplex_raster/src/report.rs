// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use simplex_raster_encoding::{BinStatus, FrameCounters};

/// What the host learns about a finished frame.
///
/// Bin overflow is not an error: the frame completes, bins that overflowed
/// are missing some triangles, and the report says which bins and how large
/// their queues would have had to be.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub counters: FrameCounters,
    /// Status of every bin, row-major.
    pub bins: Vec<BinStatus>,
    pub width_in_bins: u32,
    pub n_primitives: u32,
    pub n_triangles: u32,
    /// Queue capacity the frame was rendered with.
    pub bin_queue_size: u32,
}

impl FrameReport {
    /// True if every triangle was recorded in every bin it overlaps.
    pub fn is_complete(&self) -> bool {
        self.counters.failed == 0
    }

    /// Bins whose queue overflowed, as `(bin_x, bin_y, required queue size)`.
    pub fn overflowed_bins(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let width = self.width_in_bins.max(1);
        self.bins
            .iter()
            .enumerate()
            .filter_map(move |(ix, status)| match status {
                BinStatus::Overflowed { required } => {
                    let ix = ix as u32;
                    Some((ix % width, ix / width, *required))
                }
                BinStatus::Ok => None,
            })
    }

    /// Smallest queue size that would have held every bin's triangles.
    pub fn required_queue_size(&self) -> u32 {
        self.counters.max_bin_count
    }
}
