// Copyright 2026 the Simplex Raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use rayon::prelude::*;
use simplex_raster_encoding::{ConfigUniform, FrameCounters, WorkgroupSize, BIN_OK, CLEAR_WG};

use super::CpuBinding;

/// Resets the framebuffer and all per-frame binning state.
pub fn clear_main(
    n_wg: WorkgroupSize,
    config: &ConfigUniform,
    color: &mut [u32],
    depth: &mut [f32],
    bin_cursors: &mut [u32],
    bin_status: &mut [u32],
    counters: &mut FrameCounters,
) {
    let n_items = (n_wg.0 * CLEAR_WG) as usize;
    let n_pixels = (config.n_pixels() as usize).min(n_items);
    let n_bins = (config.n_bins() as usize).min(n_items);
    let clear_depth = config.clear_depth;
    color[..n_pixels]
        .par_iter_mut()
        .zip(depth[..n_pixels].par_iter_mut())
        .for_each(|(c, d)| {
            *c = config.clear_color;
            *d = clear_depth;
        });
    bin_cursors[..n_bins].fill(0);
    bin_status[..n_bins].fill(BIN_OK);
    *counters = FrameCounters::default();
}

pub fn clear(n_wg: WorkgroupSize, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let mut color = resources[1].as_slice_mut();
    let mut depth = resources[2].as_slice_mut();
    let mut bin_cursors = resources[3].as_slice_mut();
    let mut bin_status = resources[4].as_slice_mut();
    let mut counters = resources[5].as_typed_mut();
    clear_main(
        n_wg,
        &config,
        &mut color,
        &mut depth,
        &mut bin_cursors,
        &mut bin_status,
        &mut counters,
    );
}
